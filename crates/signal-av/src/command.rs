//! One-shot external steps (the curator, tool probes) run to completion.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::process::Command;

use crate::{Error, Result};

/// Long enough for a curator that downloads a night's worth of content.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// What a finished step printed.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl ToolOutput {
    /// Non-blank stdout lines, trimmed.
    pub fn stdout_lines(&self) -> impl Iterator<Item = &str> {
        non_blank(&self.stdout)
    }

    /// Non-blank stderr lines, trimmed.
    pub fn stderr_lines(&self) -> impl Iterator<Item = &str> {
        non_blank(&self.stderr)
    }
}

fn non_blank(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty())
}

/// Builder for a step that must finish, successfully, within a deadline.
///
/// ```no_run
/// use signal_av::ToolCommand;
///
/// # async fn example() -> signal_av::Result<()> {
/// let output = ToolCommand::new("python3")
///     .arg("/app/curator/curator.py")
///     .env("CONTENT_DIR", "/app/content")
///     .execute()
///     .await?;
/// for line in output.stdout_lines() {
///     println!("{line}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    timeout: Duration,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the step, on top of ours.
    pub fn env(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Name used in errors and logs: the program's file name.
    pub fn name(&self) -> String {
        display_name(&self.program)
    }

    /// Run to completion.
    ///
    /// # Errors
    ///
    /// [`Error::ToolNotFound`] if the program does not exist. Otherwise
    /// [`Error::ToolFailed`] when it cannot spawn, overruns the timeout (the
    /// child is killed), or exits non-zero (the message carries its last
    /// stderr line).
    pub async fn execute(&self) -> Result<ToolOutput> {
        let name = self.name();
        let started = Instant::now();

        let child = Command::new(&self.program)
            .args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::tool_not_found(&name),
                _ => Error::tool_failed(&name, format!("failed to spawn: {e}")),
            })?;
        tracing::debug!("Running {} {:?}", name, self.args);

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| Error::tool_failed(&name, format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| Error::tool_failed(&name, format!("failed waiting for exit: {e}")))?;

        let output = ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            elapsed: started.elapsed(),
        };
        tracing::debug!("{} finished in {:?} ({})", name, output.elapsed, output.status);

        if !output.status.success() {
            let last = output.stderr_lines().last().unwrap_or("no diagnostics");
            return Err(Error::tool_failed(
                name,
                format!("exited with {}: {}", output.status, last),
            ));
        }
        Ok(output)
    }
}

fn display_name(program: &Path) -> String {
    program
        .file_name()
        .unwrap_or(program.as_os_str())
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_program_is_tool_not_found() {
        let err = ToolCommand::new("curator_that_does_not_exist_xyz")
            .execute()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { ref tool } if tool == "curator_that_does_not_exist_xyz"));
    }

    #[test]
    fn name_is_the_file_name() {
        assert_eq!(ToolCommand::new("/usr/bin/python3").name(), "python3");
        assert_eq!(ToolCommand::new("ffmpeg").name(), "ffmpeg");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_lines_and_environment() {
        let output = ToolCommand::new("sh")
            .args(["-c", "echo \"fetched $WANTED\"; echo; echo done; echo warn >&2"])
            .env("WANTED", "3 videos")
            .execute()
            .await
            .unwrap();

        assert!(output.status.success());
        assert_eq!(
            output.stdout_lines().collect::<Vec<_>>(),
            vec!["fetched 3 videos", "done"]
        );
        assert_eq!(output.stderr_lines().collect::<Vec<_>>(), vec!["warn"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_reports_last_stderr_line() {
        let err = ToolCommand::new("sh")
            .args(["-c", "echo starting >&2; echo 'archive unreachable' >&2; exit 3"])
            .execute()
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("archive unreachable"), "unexpected error: {msg}");
        assert!(!msg.contains("starting"), "unexpected error: {msg}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn overrunning_step_is_killed() {
        let started = Instant::now();
        let err = ToolCommand::new("sleep")
            .arg("10")
            .timeout(Duration::from_millis(100))
            .execute()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"), "unexpected error: {err}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
