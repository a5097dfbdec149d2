//! Stream directory housekeeping.
//!
//! ffmpeg's `delete_segments` normally keeps the directory tidy, but it
//! leaves stragglers behind when it is killed, and a previous process can
//! leave a whole dead stream on disk. Deletion here follows one rule: a
//! segment is removed only when its sequence number is below the current
//! manifest's media sequence, i.e. it is no longer listed.

use std::io;
use std::path::{Path, PathBuf};

use signal_common::paths::{is_stream_artifact, segment_sequence, MANIFEST_FILE};
use signal_media::LivePlaylist;

/// List the stream artifacts currently in `dir`, sorted by name.
///
/// A missing directory is reported as an empty listing.
pub fn list_artifacts(dir: &Path) -> io::Result<Vec<String>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter(|name| is_stream_artifact(name))
        .collect();
    names.sort();
    Ok(names)
}

/// Remove every manifest and segment file left in `dir`.
pub fn clear_stale_artifacts(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for name in list_artifacts(dir)? {
        let path = dir.join(&name);
        if remove_if_present(&path)? {
            removed.push(path);
        }
    }
    Ok(removed)
}

/// Delete segments that have left the live window.
///
/// Does nothing when the manifest is absent or unreadable: without it there
/// is no way to know which segments are still referenced.
pub fn sweep_unreferenced(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let manifest = match std::fs::read(dir.join(MANIFEST_FILE)) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let playlist = match LivePlaylist::parse(&manifest) {
        Ok(playlist) => playlist,
        Err(e) => {
            // Usually a manifest caught mid-rewrite; the next sweep will see
            // a complete one.
            tracing::debug!("Skipping segment sweep: {}", e);
            return Ok(Vec::new());
        }
    };

    let mut removed = Vec::new();
    for name in list_artifacts(dir)? {
        let Some(seq) = segment_sequence(&name) else {
            continue;
        };
        if seq >= playlist.media_sequence || playlist.references(&name) {
            continue;
        }
        let path = dir.join(&name);
        if remove_if_present(&path)? {
            removed.push(path);
        }
    }
    Ok(removed)
}

/// ffmpeg may delete the same file concurrently; losing that race is fine.
fn remove_if_present(path: &Path) -> io::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
