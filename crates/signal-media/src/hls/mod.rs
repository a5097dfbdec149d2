//! HLS live playlists.
//!
//! This module parses and renders the sliding-window media playlists the
//! encoder publishes, and tracks how that window moves over time.

mod playlist;
mod timeline;
mod window;

pub use playlist::{LivePlaylist, SegmentEntry};
pub use timeline::LiveTimeline;
pub use window::SegmentWindow;
