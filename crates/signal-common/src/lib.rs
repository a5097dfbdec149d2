//! Signal-Common: shared errors and path helpers.
//!
//! This crate provides the pieces every other midnight-signal crate leans on:
//!
//! - **Error Handling**: the broadcast failure taxonomy and a result alias
//! - **Path Utilities**: video-file detection and live segment naming
//!
//! # Examples
//!
//! ```
//! use signal_common::paths::{is_video_file, segment_sequence};
//! use signal_common::{Error, Result};
//! use std::path::Path;
//!
//! assert!(is_video_file(Path::new("infomercial.mp4")));
//! assert_eq!(segment_sequence("live012.ts"), Some(12));
//!
//! fn example() -> Result<()> {
//!     Err(Error::curation("no video files found"))
//! }
//! assert!(example().is_err());
//! ```

pub mod error;
pub mod paths;

pub use error::{Error, Result};
