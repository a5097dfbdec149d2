//! Locating the external programs the broadcast shells out to.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::{Error, Result};

/// An external program and what the broadcast needs it for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: &'static str,
    /// Argument that makes it print a version and exit 0.
    pub version_arg: &'static str,
    /// Whether a broadcast can start without it.
    pub required: bool,
    pub purpose: &'static str,
}

/// Everything `check-tools` reports on.
pub const BROADCAST_TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "ffmpeg",
        version_arg: "-version",
        required: true,
        purpose: "live HLS encoder",
    },
    ToolSpec {
        name: "ffprobe",
        version_arg: "-version",
        required: false,
        purpose: "silent-track detection",
    },
    ToolSpec {
        name: "python3",
        version_arg: "--version",
        required: false,
        purpose: "default curator interpreter",
    },
];

/// Result of probing one [`ToolSpec`].
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub spec: ToolSpec,
    pub available: bool,
    /// First line the version probe printed.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

impl ToolInfo {
    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    /// Missing and the broadcast cannot do without it.
    pub fn is_blocking(&self) -> bool {
        self.spec.required && !self.available
    }
}

/// Probe a tool by running its version argument.
pub fn check_tool(spec: ToolSpec) -> ToolInfo {
    let version = Command::new(spec.name)
        .arg(spec.version_arg)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| {
            // Older pythons print the version on stderr.
            let text = if output.stdout.is_empty() {
                output.stderr
            } else {
                output.stdout
            };
            String::from_utf8_lossy(&text)
                .lines()
                .next()
                .unwrap_or_default()
                .trim()
                .to_string()
        });

    ToolInfo {
        spec,
        available: version.is_some(),
        path: version.as_ref().and_then(|_| which::which(spec.name).ok()),
        version,
    }
}

/// Probe every tool in [`BROADCAST_TOOLS`].
pub fn check_tools() -> Vec<ToolInfo> {
    BROADCAST_TOOLS.iter().copied().map(check_tool).collect()
}

/// Resolve `name` on `PATH`.
///
/// # Errors
///
/// [`Error::ToolNotFound`] if it is not there.
pub fn require_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::tool_not_found(name))
}

/// Resolve a tool, preferring a configured path that exists over `PATH`.
pub fn get_tool_path(name: &str, configured: Option<&Path>) -> Result<PathBuf> {
    match configured {
        Some(path) if path.exists() => return Ok(path.to_path_buf()),
        Some(path) => tracing::warn!(
            "Configured {} at {} does not exist, searching PATH",
            name,
            path.display()
        ),
        None => {}
    }
    require_tool(name)
}
