//! CLI end-to-end tests
//!
//! Tests for the midnight-signal command-line interface.

use predicates::prelude::*;
use std::fs;
use std::path::Path;
use assert_cmd::Command;
use tempfile::tempdir;

/// Get a command for the midnight-signal binary
#[allow(deprecated)]
fn midnight_signal_cmd() -> Command {
    let mut cmd = Command::cargo_bin("midnight-signal").unwrap();
    cmd.env_remove("PORT").env("RUST_LOG", "off");
    cmd
}

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("midnight-signal.toml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_cli_no_args_shows_help() {
    midnight_signal_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    midnight_signal_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("midnight-signal"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_flag() {
    midnight_signal_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("midnight-signal"));
}

#[test]
fn test_cli_version_command() {
    midnight_signal_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_check_tools_command() {
    midnight_signal_cmd()
        .arg("check-tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("ffmpeg"));
}

#[test]
fn test_cli_start_help() {
    midnight_signal_cmd()
        .args(["start", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Start the broadcast"))
        .stdout(predicate::str::contains("--skip-curation"));
}

#[test]
fn test_cli_watch_requires_url() {
    midnight_signal_cmd()
        .arg("watch")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<URL>"));
}

#[test]
fn test_cli_validate_valid_config() {
    let dir = tempdir().unwrap();
    let config = write_config(
        dir.path(),
        r#"
[server]
port = 8088

[paths]
content_dir = "/srv/content"
stream_dir = "/srv/streams"
"#,
    );

    midnight_signal_cmd()
        .arg("validate")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("0.0.0.0:8088"));
}

#[test]
fn test_cli_validate_rejects_zero_window() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "[transcode]\nwindow_size = 0\n");

    midnight_signal_cmd()
        .arg("validate")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("window_size"));
}

#[test]
fn test_cli_validate_rejects_malformed_toml() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "[server\nport = ");

    midnight_signal_cmd()
        .arg("validate")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config file"));
}

#[test]
fn test_cli_start_without_content_exits_nonzero() {
    let dir = tempdir().unwrap();
    let content = dir.path().join("content");
    fs::create_dir_all(&content).unwrap();
    let config = write_config(
        dir.path(),
        &format!(
            "[paths]\ncontent_dir = {:?}\nstream_dir = {:?}\n",
            content.display().to_string(),
            dir.path().join("streams").display().to_string()
        ),
    );

    midnight_signal_cmd()
        .args(["--config"])
        .arg(&config)
        .args(["start", "--skip-curation", "--host", "127.0.0.1"])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no video files"));

    // Failed before the encoder or the server came up.
    assert!(!dir.path().join("streams").exists());
}

#[test]
fn test_cli_start_with_failing_curator_exits_nonzero() {
    let dir = tempdir().unwrap();
    let config = write_config(
        dir.path(),
        &format!(
            "[paths]\ncontent_dir = {:?}\n\n[curator]\ncommand = \"nonexistent_curator_xyz\"\nargs = []\n",
            dir.path().join("content").display().to_string()
        ),
    );

    midnight_signal_cmd()
        .args(["--config"])
        .arg(&config)
        .args(["start", "--host", "127.0.0.1"])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Curation failed"));
}
