use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures running ffmpeg and the other external programs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    /// The file or playlist the encoder was pointed at is gone.
    #[error("encoder input missing: {}", path.display())]
    InputMissing { path: PathBuf },

    /// The stream directory could not be created or cleaned.
    #[error("stream directory {} unusable: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn input_missing(path: impl Into<PathBuf>) -> Self {
        Self::InputMissing { path: path.into() }
    }

    pub fn output_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::OutputDir {
            path: path.into(),
            source,
        }
    }
}

impl From<Error> for signal_common::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::ToolNotFound { tool } => signal_common::Error::ToolNotFound(tool),
            Error::ToolFailed { tool, message } => signal_common::Error::tool(tool, message),
            // Curation produced it moments ago; losing it is a content problem.
            err @ Error::InputMissing { .. } => signal_common::Error::curation(err.to_string()),
            err @ Error::OutputDir { .. } => signal_common::Error::transcode(err.to_string()),
            Error::Io(e) => signal_common::Error::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converts_into_common_error() {
        let err: signal_common::Error = Error::tool_not_found("ffmpeg").into();
        assert!(matches!(err, signal_common::Error::ToolNotFound(ref t) if t == "ffmpeg"));
        assert!(err.is_fatal());

        let err: signal_common::Error = Error::tool_failed("python3", "exit 2").into();
        assert_eq!(err.to_string(), "Tool python3 failed: exit 2");

        let err: signal_common::Error = Error::input_missing("/app/content/playlist.txt").into();
        assert!(matches!(err, signal_common::Error::CurationFailure(ref m) if m.contains("playlist.txt")));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: signal_common::Error = Error::output_dir("/app/streams", io).into();
        assert!(matches!(err, signal_common::Error::TranscodeProcessFailure(ref m) if m.contains("read-only")));
    }
}
