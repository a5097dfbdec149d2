//! Throttling of ffmpeg's stderr.
//!
//! ffmpeg prints a progress line per stats interval and a status line per
//! segment. Forwarding all of it floods any rate-limited log sink, so only
//! errors pass through unconditionally; informational lines are let through
//! at most once per interval and progress is dropped.

use std::time::{Duration, Instant};

/// How a stderr line is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Something went wrong; always surfaced.
    Error,
    /// Input/stream/segment information; surfaced at a throttled rate.
    Info,
    /// Frame/bitrate progress and everything else; dropped.
    Progress,
}

const ERROR_MARKERS: &[&str] = &["Error", "error", "failed"];
const INFO_MARKERS: &[&str] = &["Opening", "Duration", "Stream"];

impl LineKind {
    /// Classify one stderr line.
    pub fn classify(line: &str) -> Self {
        if ERROR_MARKERS.iter().any(|m| line.contains(m)) {
            Self::Error
        } else if INFO_MARKERS.iter().any(|m| line.contains(m)) {
            Self::Info
        } else {
            Self::Progress
        }
    }
}

/// Decides which stderr lines reach the log.
#[derive(Debug, Clone)]
pub struct DiagnosticFilter {
    interval: Duration,
    last_info: Option<Instant>,
}

impl DiagnosticFilter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_info: None,
        }
    }

    /// Returns the kind of line to log, or `None` if it must be dropped.
    pub fn admit(&mut self, line: &str, now: Instant) -> Option<LineKind> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match LineKind::classify(line) {
            LineKind::Error => Some(LineKind::Error),
            LineKind::Info => {
                let due = self
                    .last_info
                    .map_or(true, |last| now.duration_since(last) >= self.interval);
                if due {
                    self.last_info = Some(now);
                    Some(LineKind::Info)
                } else {
                    None
                }
            }
            LineKind::Progress => None,
        }
    }

    /// Log a line if the filter admits it.
    pub fn emit(&mut self, line: &str) {
        match self.admit(line, Instant::now()) {
            Some(LineKind::Error) => tracing::error!(target: "ffmpeg", "{}", line.trim()),
            Some(LineKind::Info) => tracing::info!(target: "ffmpeg", "{}", line.trim()),
            _ => {}
        }
    }
}

/// Longest line kept in memory before it is flushed unterminated.
pub const MAX_LINE_BYTES: usize = 4096;

/// Splits a byte stream into lines on `\n` or `\r`.
///
/// ffmpeg rewrites its progress line in place with bare carriage returns,
/// so splitting on newlines alone would buffer progress forever. A line that
/// reaches [`MAX_LINE_BYTES`] without a terminator is emitted as it stands.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    /// Feed a chunk and return the lines it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' || byte == b'\r' {
                if !self.pending.is_empty() {
                    lines.push(String::from_utf8_lossy(&self.pending).to_string());
                    self.pending.clear();
                }
            } else {
                self.pending.push(byte);
                if self.pending.len() >= MAX_LINE_BYTES {
                    lines.push(String::from_utf8_lossy(&self.pending).to_string());
                    self.pending.clear();
                }
            }
        }
        lines
    }

    /// Flush whatever is left once the stream closes.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).to_string();
        self.pending.clear();
        Some(line)
    }
}
