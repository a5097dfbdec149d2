//! Content acquisition.
//!
//! The curator is an external one-shot command that fills the content
//! directory with videos and, optionally, a `playlist.txt` concat list. What
//! it leaves behind is captured as a [`ContentSet`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use signal_av::{ToolCommand, TranscodeMode};
use signal_common::paths::{is_video_file, PLAYLIST_FILE};
use signal_common::{Error, Result};

use crate::config::CuratorConfig;

/// A video discovered in the content directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    pub path: PathBuf,
    pub extension: String,
}

impl VideoFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// The videos available for broadcast, sorted by file name.
#[derive(Debug, Clone, Default)]
pub struct ContentSet {
    pub videos: Vec<VideoFile>,
    /// Concat list left by the curator, used verbatim when present.
    pub playlist: Option<PathBuf>,
}

impl ContentSet {
    /// Scan `dir` without judging the result. A missing directory yields an
    /// empty set.
    pub fn scan(dir: &Path) -> Self {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Self::default();
        };

        let mut videos: Vec<VideoFile> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_video_file(path))
            .map(|path| {
                let extension = path
                    .extension()
                    .map(|e| e.to_string_lossy().to_lowercase())
                    .unwrap_or_default();
                VideoFile { path, extension }
            })
            .collect();
        videos.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));

        let playlist = Some(dir.join(PLAYLIST_FILE)).filter(|p| p.is_file());

        Self { videos, playlist }
    }

    /// Scan `dir` and require at least one video.
    ///
    /// # Errors
    ///
    /// [`Error::CurationFailure`] if the directory is missing or holds no
    /// recognized video file.
    pub fn discover(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::curation(format!(
                "content directory {} does not exist",
                dir.display()
            )));
        }
        let content = Self::scan(dir);
        if content.is_empty() {
            return Err(Error::curation(format!(
                "no video files in {}",
                dir.display()
            )));
        }
        Ok(content)
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.videos.iter().map(VideoFile::file_name).collect()
    }

    /// Playlist mode when a concat list exists, otherwise loop the first
    /// video of the listing.
    pub fn transcode_mode(&self) -> Result<TranscodeMode> {
        if let Some(playlist) = &self.playlist {
            return Ok(TranscodeMode::Playlist {
                playlist: playlist.clone(),
            });
        }
        let first = self
            .videos
            .first()
            .ok_or_else(|| Error::curation("no video files to broadcast"))?;
        Ok(TranscodeMode::SingleFile {
            input: first.path.clone(),
        })
    }
}

/// Runs the external curator command.
pub struct Curator {
    config: CuratorConfig,
}

impl Curator {
    pub fn new(config: CuratorConfig) -> Self {
        Self { config }
    }

    /// Run the curator once and collect what it produced.
    ///
    /// # Errors
    ///
    /// [`Error::CurationFailure`] if the command cannot run, exits non-zero,
    /// or leaves no video in `content_dir`.
    pub async fn run(&self, content_dir: &Path) -> Result<ContentSet> {
        if self.config.enabled {
            self.execute().await?;
        } else {
            tracing::info!("Curation disabled, using existing content");
        }

        let content = ContentSet::discover(content_dir)?;
        tracing::info!(
            "Found {} videos in {}{}",
            content.len(),
            content_dir.display(),
            if content.playlist.is_some() {
                " (with playlist)"
            } else {
                ""
            }
        );
        Ok(content)
    }

    async fn execute(&self) -> Result<()> {
        if let Some(script) = self.script() {
            if !script.exists() {
                return Err(Error::curation(format!(
                    "curator script not found at {}",
                    script.display()
                )));
            }
        }

        tracing::info!(
            "Running curator: {} {}",
            self.config.command,
            self.config.args.join(" ")
        );
        let output = ToolCommand::new(&self.config.command)
            .args(self.config.args.iter().cloned())
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .execute()
            .await
            .map_err(|e| Error::curation(e.to_string()))?;

        for line in output.stdout_lines() {
            tracing::info!(target: "curator", "{}", line);
        }
        for line in output.stderr_lines() {
            tracing::warn!(target: "curator", "{}", line);
        }
        tracing::info!("Curator finished in {:.1}s", output.elapsed.as_secs_f64());
        Ok(())
    }

    /// The script argument, if the first argument names a file.
    fn script(&self) -> Option<PathBuf> {
        let first = self.config.args.first()?;
        if first.starts_with('-') || !first.contains('/') {
            return None;
        }
        Some(PathBuf::from(shellexpand::tilde(first).as_ref()))
    }
}
