//! Path utilities for content discovery and live segment naming.
//!
//! The curator leaves source videos in a content directory; the encoder
//! writes `live.m3u8` plus `liveNNN.ts` segments into the stream directory.
//! These helpers are the single place both conventions are spelled out.

use std::path::Path;

/// Video extensions accepted as broadcast content.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "ogv", "mkv", "m4v", "mov", "webm", "avi"];

/// File name of the concat list the curator may leave next to the videos.
pub const PLAYLIST_FILE: &str = "playlist.txt";

/// File name of the live manifest.
pub const MANIFEST_FILE: &str = "live.m3u8";

/// Prefix shared by every live segment file.
pub const SEGMENT_PREFIX: &str = "live";

/// Extension of live segment files.
pub const SEGMENT_EXTENSION: &str = "ts";

/// Check if a path has a recognized video file extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use signal_common::paths::is_video_file;
///
/// assert!(is_video_file(Path::new("episode.ogv")));
/// assert!(is_video_file(Path::new("/app/content/main_channel/a.MP4")));
/// assert!(!is_video_file(Path::new("playlist.txt")));
/// ```
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Get the list of recognized video file extensions.
#[must_use]
pub fn video_extensions() -> &'static [&'static str] {
    VIDEO_EXTENSIONS
}

/// Render the segment file name for a sequence number (`live007.ts`).
#[must_use]
pub fn segment_file_name(sequence: u64) -> String {
    format!("{SEGMENT_PREFIX}{sequence:03}.{SEGMENT_EXTENSION}")
}

/// The ffmpeg `-hls_segment_filename` pattern matching [`segment_file_name`].
#[must_use]
pub fn segment_pattern() -> String {
    format!("{SEGMENT_PREFIX}%03d.{SEGMENT_EXTENSION}")
}

/// Extract the numeric sequence suffix from a segment file name.
///
/// Accepts bare names or URIs with a directory part and query string, since
/// manifests may reference segments either way.
///
/// # Examples
///
/// ```
/// use signal_common::paths::segment_sequence;
///
/// assert_eq!(segment_sequence("live000.ts"), Some(0));
/// assert_eq!(segment_sequence("/stream/live1234.ts?v=2"), Some(1234));
/// assert_eq!(segment_sequence("live.m3u8"), None);
/// assert_eq!(segment_sequence("other001.ts"), None);
/// ```
pub fn segment_sequence(name: &str) -> Option<u64> {
    let name = name.split('?').next().unwrap_or(name);
    let name = name.rsplit('/').next().unwrap_or(name);
    let stem = name.strip_suffix(SEGMENT_EXTENSION)?.strip_suffix('.')?;
    let digits = stem.strip_prefix(SEGMENT_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Whether a file in the stream directory belongs to the live stream.
pub fn is_stream_artifact(name: &str) -> bool {
    name == MANIFEST_FILE || segment_sequence(name).is_some()
}
