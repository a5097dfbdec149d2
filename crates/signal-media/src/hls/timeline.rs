//! Absolute stream timeline reconstructed from successive manifest polls.
//!
//! A live manifest only describes its current window. To report a stable
//! playback position the client needs to know how much media has already
//! scrolled off the front; this type accumulates that.

use super::playlist::{LivePlaylist, SegmentEntry};
use super::window::SegmentWindow;

/// Number of target durations a player holds back from the live edge.
pub const DEFAULT_HOLD_BACK_SEGMENTS: u32 = 3;

/// Tracks the live window across manifest reloads.
#[derive(Debug, Clone)]
pub struct LiveTimeline {
    window: Option<SegmentWindow>,
    /// Seconds of media that scrolled out of the window since the first poll.
    elapsed_before_window: f64,
    hold_back_segments: u32,
}

impl Default for LiveTimeline {
    fn default() -> Self {
        Self::new(DEFAULT_HOLD_BACK_SEGMENTS)
    }
}

impl LiveTimeline {
    /// Create an empty timeline.
    pub fn new(hold_back_segments: u32) -> Self {
        Self {
            window: None,
            elapsed_before_window: 0.0,
            hold_back_segments,
        }
    }

    /// Merge a freshly fetched playlist. Returns `true` if new segments
    /// appeared.
    pub fn ingest(&mut self, playlist: &LivePlaylist) -> bool {
        if self.window.is_none() {
            let capacity = playlist.segments.len();
            self.window = Some(SegmentWindow::from_playlist(capacity, playlist.clone()));
            return !playlist.segments.is_empty();
        }
        let Some(window) = self.window.as_mut() else {
            return false;
        };

        let next_seq = window.playlist().sequence_range().end;
        let incoming = playlist.sequence_range();

        // A restarted encoder numbers from zero again. Whatever it publishes
        // comes after everything already seen.
        if incoming.start < window.playlist().media_sequence {
            self.elapsed_before_window += window.playlist().total_duration();
            *window = SegmentWindow::from_playlist(playlist.segments.len(), playlist.clone());
            return true;
        }
        if incoming.end <= next_seq {
            return false;
        }

        // Segments published and retired between two polls were never seen;
        // count them at the target duration.
        if incoming.start > next_seq {
            let missed = incoming.start - next_seq;
            self.elapsed_before_window += window.playlist().total_duration()
                + missed as f64 * f64::from(playlist.target_duration);
            *window = SegmentWindow::from_playlist(playlist.segments.len(), playlist.clone());
            return true;
        }

        window.grow_to(playlist.segments.len());
        let skip = (next_seq - incoming.start) as usize;
        for entry in playlist.segments.iter().skip(skip) {
            let evicted: Vec<SegmentEntry> = window.push(entry.clone());
            self.elapsed_before_window += evicted.iter().map(|e| e.duration).sum::<f64>();
        }
        true
    }

    /// Absolute position of the start of the current window, in seconds.
    pub fn window_start(&self) -> f64 {
        self.elapsed_before_window
    }

    /// Absolute position of the live edge (end of the newest segment).
    pub fn live_edge(&self) -> f64 {
        self.elapsed_before_window
            + self
                .window
                .as_ref()
                .map(|w| w.playlist().total_duration())
                .unwrap_or(0.0)
    }

    /// The position a live player should sit at: the edge minus the hold-back,
    /// never before the start of the window. `None` before the first manifest.
    pub fn live_sync_position(&self) -> Option<f64> {
        let window = self.window.as_ref()?;
        let hold_back =
            f64::from(self.hold_back_segments) * f64::from(window.playlist().target_duration);
        Some((self.live_edge() - hold_back).max(self.window_start()))
    }

    /// Target duration of the current window.
    pub fn target_duration(&self) -> Option<u32> {
        self.window.as_ref().map(|w| w.playlist().target_duration)
    }
}
