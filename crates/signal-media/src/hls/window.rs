//! Bounded append-and-prune segment window.
//!
//! Mirrors what the encoder does to `live.m3u8` in append-list mode: every
//! new segment is appended, and once more than `capacity` segments are
//! listed the oldest ones drop off the front and the media sequence advances.

use super::playlist::{LivePlaylist, SegmentEntry};

/// A live playlist that never lists more than `capacity` segments.
#[derive(Debug, Clone)]
pub struct SegmentWindow {
    capacity: usize,
    playlist: LivePlaylist,
}

impl SegmentWindow {
    /// Create an empty window. A capacity of zero is treated as one.
    pub fn new(capacity: usize, target_duration: u32) -> Self {
        Self {
            capacity: capacity.max(1),
            playlist: LivePlaylist::new(target_duration),
        }
    }

    /// Start a window from an already published playlist, trimming it to
    /// `capacity` if needed.
    pub fn from_playlist(capacity: usize, playlist: LivePlaylist) -> Self {
        let mut window = Self {
            capacity: capacity.max(1),
            playlist,
        };
        window.prune();
        window
    }

    /// Append a segment and return the entries that fell out of the window,
    /// oldest first.
    pub fn push(&mut self, entry: SegmentEntry) -> Vec<SegmentEntry> {
        let needed = entry.duration.ceil() as u32;
        if needed > self.playlist.target_duration {
            self.playlist.target_duration = needed;
        }
        self.playlist.segments.push(entry);
        self.prune()
    }

    fn prune(&mut self) -> Vec<SegmentEntry> {
        let excess = self.playlist.segments.len().saturating_sub(self.capacity);
        if excess == 0 {
            return Vec::new();
        }
        self.playlist.media_sequence += excess as u64;
        self.playlist.segments.drain(..excess).collect()
    }

    /// Raise the capacity; never shrinks.
    pub fn grow_to(&mut self, capacity: usize) {
        self.capacity = self.capacity.max(capacity);
    }

    /// Maximum number of listed segments.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of currently listed segments.
    pub fn len(&self) -> usize {
        self.playlist.segments.len()
    }

    /// Whether no segment is listed yet.
    pub fn is_empty(&self) -> bool {
        self.playlist.segments.is_empty()
    }

    /// The current playlist.
    pub fn playlist(&self) -> &LivePlaylist {
        &self.playlist
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_common::paths::segment_file_name;

    fn segment(seq: u64) -> SegmentEntry {
        SegmentEntry::new(4.0, segment_file_name(seq))
    }

    #[test]
    fn test_window_never_exceeds_capacity() {
        let mut window = SegmentWindow::new(5, 4);

        for seq in 0..23 {
            window.push(segment(seq));
            assert!(window.len() <= 5, "window grew to {}", window.len());
        }

        let playlist = window.playlist();
        assert_eq!(playlist.media_sequence, 18);
        assert_eq!(playlist.sequence_range(), 18..23);
        assert_eq!(playlist.segments[0].uri, "live018.ts");
    }

    #[test]
    fn test_evicted_only_when_no_longer_listed() {
        let mut window = SegmentWindow::new(5, 4);
        for seq in 0..5 {
            assert!(window.push(segment(seq)).is_empty());
        }
        assert!(window.playlist().references("live000.ts"));

        let evicted = window.push(segment(5));
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].uri, "live000.ts");
        assert!(!window.playlist().references("live000.ts"));
        assert!(window.playlist().references("live001.ts"));
    }

    #[test]
    fn test_from_playlist_trims_to_capacity() {
        let mut playlist = LivePlaylist::new(4);
        playlist.media_sequence = 10;
        for seq in 10..18 {
            playlist.segments.push(segment(seq));
        }

        let window = SegmentWindow::from_playlist(5, playlist);
        assert_eq!(window.len(), 5);
        assert_eq!(window.playlist().media_sequence, 13);
    }

    #[test]
    fn test_long_segment_raises_target_duration() {
        let mut window = SegmentWindow::new(3, 4);
        window.push(SegmentEntry::new(4.2, "live000.ts"));
        assert_eq!(window.playlist().target_duration, 5);
    }

    #[test]
    fn test_zero_capacity_is_one() {
        let mut window = SegmentWindow::new(0, 4);
        window.push(segment(0));
        window.push(segment(1));
        assert_eq!(window.capacity(), 1);
        assert_eq!(window.len(), 1);
    }
}
