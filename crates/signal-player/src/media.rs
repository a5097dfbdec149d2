//! A media element driven by an explicit clock.

use signal_common::{Error, Result};

use crate::handler::MediaElement;

/// Headless [`MediaElement`] whose position only moves when
/// [`advance`](Self::advance) is called.
#[derive(Debug, Clone)]
pub struct SimulatedElement {
    position: f64,
    playing: bool,
    muted: bool,
    volume: f64,
    autoplay_allowed: bool,
    gesture: bool,
}

impl Default for SimulatedElement {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SimulatedElement {
    pub fn new(autoplay_allowed: bool) -> Self {
        Self {
            position: 0.0,
            playing: false,
            muted: false,
            volume: 1.0,
            autoplay_allowed,
            gesture: false,
        }
    }

    /// Record a user gesture; playback is allowed from now on.
    pub fn grant_gesture(&mut self) {
        self.gesture = true;
    }

    /// Move the clock forward. Returns the new position.
    pub fn advance(&mut self, seconds: f64) -> f64 {
        if self.playing {
            self.position += seconds;
        }
        self.position
    }

    /// Move the position without going through the guard, as a scrub bar
    /// would.
    pub fn scrub(&mut self, seconds: f64) {
        self.position = seconds.max(0.0);
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }
}

impl MediaElement for SimulatedElement {
    fn position(&self) -> f64 {
        self.position
    }

    fn set_position(&mut self, seconds: f64) {
        self.position = seconds;
    }

    fn play(&mut self) -> Result<()> {
        if !self.autoplay_allowed && !self.gesture {
            return Err(Error::PlaybackAutoplayBlocked(
                "play() requires a user gesture".to_string(),
            ));
        }
        self.playing = true;
        Ok(())
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }
}
