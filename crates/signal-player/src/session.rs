//! Observable playback state.

use std::fmt;

/// Prompt shown when the environment refused to autoplay.
pub const AUTOPLAY_PROMPT: &str = "Click to start broadcast";

/// Where the guard is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Waiting for the first manifest.
    Loading,
    /// Manifest parsed; playing or waiting for a user gesture.
    Live,
    /// A fatal failure ended the session.
    Error,
}

impl fmt::Display for GuardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Loading => "loading",
            Self::Live => "live",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Snapshot of one viewer's playback.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    /// Current playback position, in seconds.
    pub position: f64,
    /// Last known live-sync position.
    pub live_sync: Option<f64>,
    pub muted: bool,
    /// Volume in `0.0..=1.0`.
    pub volume: f64,
    pub state: GuardState,
    /// Non-fatal notice for the viewer, e.g. the autoplay prompt.
    pub prompt: Option<String>,
    /// Why the session failed.
    pub error: Option<String>,
}

impl Default for PlaybackSession {
    /// Sessions start muted so unattended playback is allowed to begin.
    fn default() -> Self {
        Self {
            position: 0.0,
            live_sync: None,
            muted: true,
            volume: 1.0,
            state: GuardState::Loading,
            prompt: None,
            error: None,
        }
    }
}

impl PlaybackSession {
    pub fn is_live(&self) -> bool {
        self.state == GuardState::Live
    }
}
