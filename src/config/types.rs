use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub curator: CuratorConfig,

    #[serde(default)]
    pub transcode: TranscodeConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// Overridden by the `PORT` environment variable when set.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Where the curator leaves the videos to broadcast
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,

    /// Where ffmpeg writes `live.m3u8` and its segments
    #[serde(default = "default_stream_dir")]
    pub stream_dir: PathBuf,
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("/app/content/main_channel")
}
fn default_stream_dir() -> PathBuf {
    PathBuf::from("/app/streams")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            content_dir: default_content_dir(),
            stream_dir: default_stream_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CuratorConfig {
    /// Run the curator before broadcasting (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_curator_command")]
    pub command: String,

    #[serde(default = "default_curator_args")]
    pub args: Vec<String>,

    /// Give up on the curator after this many seconds (default: 1800)
    #[serde(default = "default_curator_timeout")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}
fn default_curator_command() -> String {
    "python3".to_string()
}
fn default_curator_args() -> Vec<String> {
    vec!["/app/curator/curator.py".to_string()]
}
fn default_curator_timeout() -> u64 {
    30 * 60
}

impl Default for CuratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: default_curator_command(),
            args: default_curator_args(),
            timeout_secs: default_curator_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscodeConfig {
    /// Explicit ffmpeg binary; looked up on PATH when unset
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Explicit ffprobe binary; looked up on PATH when unset
    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    /// Linear audio gain; 1.0 leaves levels untouched
    #[serde(default = "default_gain")]
    pub gain: f32,

    #[serde(default = "default_segment_seconds")]
    pub segment_seconds: u32,

    /// Segments listed in the live manifest
    #[serde(default = "default_window_size")]
    pub window_size: u32,

    /// Seconds between sweeps for unreferenced segments; 0 disables
    #[serde(default = "default_janitor_interval")]
    pub janitor_interval_secs: u64,

    /// Encode a silent track for single-file inputs without audio
    #[serde(default)]
    pub synthesize_silence: bool,

    /// Minimum seconds between informational ffmpeg log lines
    #[serde(default = "default_log_interval")]
    pub log_interval_secs: u64,
}

fn default_gain() -> f32 {
    1.5
}
fn default_segment_seconds() -> u32 {
    4
}
fn default_window_size() -> u32 {
    5
}
fn default_janitor_interval() -> u64 {
    10
}
fn default_log_interval() -> u64 {
    10
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            gain: default_gain(),
            segment_seconds: default_segment_seconds(),
            window_size: default_window_size(),
            janitor_interval_secs: default_janitor_interval(),
            synthesize_silence: false,
            log_interval_secs: default_log_interval(),
        }
    }
}
