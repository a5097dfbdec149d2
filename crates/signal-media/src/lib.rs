//! Signal-Media: the live manifest model.
//!
//! The encoder owns the bytes on disk; this crate owns the *meaning* of the
//! manifest those bytes describe. It is shared by the segment janitor (which
//! needs to know what is still referenced), the headless manifest follower
//! (which needs the live edge) and the tests that pin the window invariants.
//!
//! # Modules
//!
//! - `hls` - live media playlist parse/render, bounded segment window and
//!   the absolute stream timeline built from successive manifest polls

pub mod hls;

pub use hls::{LivePlaylist, LiveTimeline, SegmentEntry, SegmentWindow};
