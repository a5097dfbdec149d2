//! # signal-av
//!
//! External tool management and encoder supervision for the broadcast
//! pipeline.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`check_tools`], [`require_tool`]) -- locate ffmpeg,
//!   ffprobe and the curator's interpreter on `PATH`.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support for one-shot external steps such as content curation.
//! - **Transcode supervision** ([`transcode`]) -- build the fixed-ladder
//!   ffmpeg invocation, spawn it, throttle its diagnostics, prune segments
//!   that left the live window, and report its exit through a single future.

mod error;
pub mod command;
pub mod tools;
pub mod transcode;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use error::{Error, Result};
pub use tools::{
    check_tool, check_tools, get_tool_path, require_tool, ToolInfo, ToolSpec, BROADCAST_TOOLS,
};
pub use transcode::{
    AudioSource, HlsOutput, OutputProfile, TranscodeExit, TranscodeHandle, TranscodeMode,
    TranscodeSettings, TranscodeSupervisor,
};
