//! Common error types used throughout midnight-signal.
//!
//! Server-side variants (`CurationFailure`, `TranscodeProcessFailure`) are
//! fatal to the whole process. Client-side variants describe why a playback
//! session stopped or is waiting.

/// Common error type for midnight-signal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The content source failed or left nothing to broadcast.
    #[error("Curation failed: {0}")]
    CurationFailure(String),

    /// The encoder exited abnormally.
    #[error("Transcoder exited abnormally: {0}")]
    TranscodeProcessFailure(String),

    /// A manifest-referenced file has not been flushed to disk yet.
    #[error("Segment not yet available: {0}")]
    SegmentNotYetAvailable(String),

    /// The playback environment refused an unattended start.
    #[error("Autoplay blocked: {0}")]
    PlaybackAutoplayBlocked(String),

    /// The live manifest could not be fetched.
    #[error("Manifest fetch failed: {0}")]
    ManifestFetchFailure(String),

    /// The manifest or media could not be decoded.
    #[error("Decode failed: {0}")]
    DecodeFailure(String),

    /// A required external tool is not installed.
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// An external tool could not be run.
    #[error("Tool {tool} failed: {message}")]
    Tool { tool: String, message: String },

    /// A pipeline state change was out of order.
    #[error("Invalid pipeline transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new CurationFailure error.
    pub fn curation<S: Into<String>>(msg: S) -> Self {
        Self::CurationFailure(msg.into())
    }

    /// Create a new TranscodeProcessFailure error.
    pub fn transcode<S: Into<String>>(msg: S) -> Self {
        Self::TranscodeProcessFailure(msg.into())
    }

    /// Create a new ManifestFetchFailure error.
    pub fn manifest_fetch<S: Into<String>>(msg: S) -> Self {
        Self::ManifestFetchFailure(msg.into())
    }

    /// Create a new DecodeFailure error.
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::DecodeFailure(msg.into())
    }

    /// Create a new Tool error.
    pub fn tool<T: Into<String>, M: Into<String>>(tool: T, message: M) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Whether this error must take the whole service down.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CurationFailure(_) | Self::TranscodeProcessFailure(_) | Self::ToolNotFound(_)
        )
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::curation("no video files");
        assert_eq!(err.to_string(), "Curation failed: no video files");

        let err = Error::transcode("exit status 1");
        assert_eq!(err.to_string(), "Transcoder exited abnormally: exit status 1");

        let err = Error::tool("ffmpeg", "failed to spawn");
        assert_eq!(err.to_string(), "Tool ffmpeg failed: failed to spawn");

        let err = Error::InvalidTransition {
            from: "publishing".into(),
            to: "curating".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid pipeline transition: publishing -> curating"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::curation("x").is_fatal());
        assert!(Error::transcode("x").is_fatal());
        assert!(Error::ToolNotFound("ffmpeg".into()).is_fatal());

        assert!(!Error::SegmentNotYetAvailable("live001.ts".into()).is_fatal());
        assert!(!Error::PlaybackAutoplayBlocked("policy".into()).is_fatal());
        assert!(!Error::manifest_fetch("HTTP 503").is_fatal());
    }
}
