mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Environment variable that overrides `server.port`.
pub const PORT_ENV: &str = "PORT";

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    apply_env_overrides(&mut config)?;
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./midnight-signal.toml",
        "~/.config/midnight-signal/config.toml",
        "/etc/midnight-signal/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    let mut config = Config::default();
    apply_env_overrides(&mut config)?;
    validate_config(&config)?;
    Ok(config)
}

/// Apply `PORT` from the environment, as hosting platforms inject it.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Ok(port) = std::env::var(PORT_ENV) {
        config.server.port = port
            .trim()
            .parse()
            .with_context(|| format!("Invalid {} value: {:?}", PORT_ENV, port))?;
    }
    Ok(())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.transcode.window_size == 0 {
        anyhow::bail!("Transcode window_size cannot be 0");
    }

    if config.transcode.segment_seconds == 0 {
        anyhow::bail!("Transcode segment_seconds cannot be 0");
    }

    if !config.transcode.gain.is_finite() || config.transcode.gain < 0.0 {
        anyhow::bail!("Transcode gain must be a non-negative number");
    }

    if config.curator.enabled && config.curator.command.trim().is_empty() {
        anyhow::bail!("Curator is enabled but has no command");
    }

    if let Some(ref ffmpeg) = config.transcode.ffmpeg_path {
        if !ffmpeg.exists() {
            tracing::warn!("Configured ffmpeg does not exist: {:?}", ffmpeg);
        }
    }

    Ok(())
}
