//! Spawning and watching the long-lived ffmpeg process.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::{ChildStderr, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::args::{build_args, AudioSource, HlsOutput, OutputProfile, TranscodeMode};
use super::diagnostics::{DiagnosticFilter, LineSplitter};
use super::janitor::{clear_stale_artifacts, sweep_unreferenced};
use crate::command::ToolCommand;
use crate::{Error, Result};

/// Everything needed to run the encoder.
#[derive(Debug, Clone)]
pub struct TranscodeSettings {
    /// ffmpeg executable.
    pub ffmpeg: PathBuf,
    /// ffprobe executable, used only to detect inputs without audio.
    pub ffprobe: Option<PathBuf>,
    pub profile: OutputProfile,
    pub output: HlsOutput,
    /// Substitute a silent track when a single-file input has no audio.
    pub synthesize_silence: bool,
    /// Minimum spacing between informational ffmpeg log lines.
    pub log_interval: Duration,
    /// How often unreferenced segments are swept; `None` disables the sweep.
    pub janitor_interval: Option<Duration>,
}

impl TranscodeSettings {
    /// Settings for the broadcast profile writing into `dir`.
    pub fn new(ffmpeg: impl Into<PathBuf>, dir: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: None,
            profile: OutputProfile::broadcast(),
            output: HlsOutput {
                dir: dir.into(),
                segment_seconds: 4,
                window_size: 5,
            },
            synthesize_silence: false,
            log_interval: Duration::from_secs(10),
            janitor_interval: Some(Duration::from_secs(10)),
        }
    }
}

/// How the encoder process ended.
#[derive(Debug, Clone)]
pub enum TranscodeExit {
    /// Terminated on request through [`TranscodeHandle::shutdown`].
    Killed,
    /// Exited on its own.
    Exited(ExitStatus),
    /// The process could not be waited on.
    Lost(String),
}

impl TranscodeExit {
    /// Whether the exit was requested.
    pub fn was_requested(&self) -> bool {
        matches!(self, Self::Killed)
    }

    /// A live encoder is supposed to run forever, so any exit that was not
    /// requested is a failure, including a zero status.
    pub fn into_result(self) -> signal_common::Result<()> {
        match self {
            Self::Killed => Ok(()),
            other => Err(signal_common::Error::transcode(other.to_string())),
        }
    }
}

impl fmt::Display for TranscodeExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Killed => write!(f, "killed on shutdown"),
            Self::Exited(status) => match status.code() {
                Some(code) => write!(f, "ffmpeg exited with code {code}"),
                None => write!(f, "ffmpeg terminated by signal"),
            },
            Self::Lost(reason) => write!(f, "lost track of ffmpeg: {reason}"),
        }
    }
}

/// Starts encoder processes.
#[derive(Debug, Clone)]
pub struct TranscodeSupervisor {
    settings: TranscodeSettings,
}

impl TranscodeSupervisor {
    pub fn new(settings: TranscodeSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &TranscodeSettings {
        &self.settings
    }

    /// The ffmpeg arguments for `mode`.
    pub fn command_args(&self, mode: &TranscodeMode, audio: AudioSource) -> Vec<String> {
        build_args(mode, audio, &self.settings.profile, &self.settings.output)
    }

    /// Spawn ffmpeg for `mode`.
    ///
    /// Leftovers from a previous run are removed first so the publisher never
    /// serves a manifest that no live process is updating.
    ///
    /// # Errors
    ///
    /// - [`Error::InputMissing`] if the input does not exist.
    /// - [`Error::ToolNotFound`] if the ffmpeg executable is missing.
    /// - [`Error::OutputDir`] if the stream directory cannot be prepared.
    pub async fn start(&self, mode: &TranscodeMode) -> Result<TranscodeHandle> {
        if !mode.input().exists() {
            return Err(Error::input_missing(mode.input()));
        }

        let dir = self.settings.output.dir.clone();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::output_dir(&dir, e))?;
        let cleared = clear_stale_artifacts(&dir).map_err(|e| Error::output_dir(&dir, e))?;
        if !cleared.is_empty() {
            tracing::info!(
                "Removed {} stale stream files from {}",
                cleared.len(),
                dir.display()
            );
        }

        let audio = self.select_audio(mode).await;
        let args = self.command_args(mode, audio);
        let program = program_name(&self.settings.ffmpeg);

        tracing::info!(
            "Starting encoder in {} mode from {} ({})",
            mode.label(),
            mode.input().display(),
            self.settings.profile.quality_label()
        );
        tracing::debug!("{} {}", program, args.join(" "));

        let mut cmd = Command::new(&self.settings.ffmpeg);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::tool_not_found(program.clone()),
            _ => Error::tool_failed(program.clone(), format!("failed to spawn: {e}")),
        })?;
        let pid = child.id();
        tracing::info!("Encoder running (pid {:?})", pid);

        let mut tasks = Vec::new();
        if let Some(stderr) = child.stderr.take() {
            tasks.push(tokio::spawn(forward_stderr(
                stderr,
                DiagnosticFilter::new(self.settings.log_interval),
            )));
        }
        if let Some(every) = self.settings.janitor_interval {
            tasks.push(tokio::spawn(sweep_periodically(dir.clone(), every)));
        }

        let (exit_tx, exit_rx) = oneshot::channel();
        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        let monitor = tokio::spawn(async move {
            // A dropped sender counts as a kill request too.
            let natural = tokio::select! {
                status = child.wait() => Some(status),
                _ = kill_rx => None,
            };
            let exit = match natural {
                Some(Ok(status)) => TranscodeExit::Exited(status),
                Some(Err(e)) => TranscodeExit::Lost(e.to_string()),
                None => {
                    if let Err(e) = child.kill().await {
                        tracing::warn!("Failed to kill encoder: {}", e);
                    }
                    TranscodeExit::Killed
                }
            };
            let _ = exit_tx.send(exit);
        });
        tasks.push(monitor);

        Ok(TranscodeHandle {
            pid,
            output_dir: dir,
            exit_rx: Some(exit_rx),
            kill_tx: Some(kill_tx),
            exit: None,
            tasks,
        })
    }

    async fn select_audio(&self, mode: &TranscodeMode) -> AudioSource {
        let (true, TranscodeMode::SingleFile { input }) = (self.settings.synthesize_silence, mode)
        else {
            return AudioSource::Input;
        };
        let Some(ffprobe) = self.settings.ffprobe.as_ref() else {
            tracing::warn!("Silence synthesis enabled but ffprobe is not available");
            return AudioSource::Input;
        };

        match has_audio(ffprobe, input).await {
            Ok(true) => AudioSource::Input,
            Ok(false) => {
                tracing::info!("{} has no audio track, adding silence", input.display());
                AudioSource::Silence
            }
            Err(e) => {
                tracing::warn!("Audio probe failed, using input audio: {}", e);
                AudioSource::Input
            }
        }
    }
}

async fn has_audio(ffprobe: &Path, input: &Path) -> Result<bool> {
    let output = ToolCommand::new(ffprobe.to_path_buf())
        .args([
            "-v",
            "error",
            "-select_streams",
            "a",
            "-show_entries",
            "stream=index",
            "-of",
            "csv=p=0",
        ])
        .arg(input.to_string_lossy())
        .timeout(Duration::from_secs(30))
        .execute()
        .await?;
    Ok(!output.stdout.trim().is_empty())
}

async fn forward_stderr(mut stderr: ChildStderr, mut filter: DiagnosticFilter) {
    let mut splitter = LineSplitter::default();
    let mut buf = [0u8; 4096];
    loop {
        match stderr.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                for line in splitter.feed(&buf[..n]) {
                    filter.emit(&line);
                }
            }
            Err(e) => {
                tracing::debug!("Encoder stderr closed: {}", e);
                break;
            }
        }
    }
    if let Some(line) = splitter.finish() {
        filter.emit(&line);
    }
}

async fn sweep_periodically(dir: PathBuf, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; nothing to sweep yet.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let target = dir.clone();
        match tokio::task::spawn_blocking(move || sweep_unreferenced(&target)).await {
            Ok(Ok(removed)) if !removed.is_empty() => {
                tracing::debug!("Swept {} unreferenced segments", removed.len());
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!("Segment sweep failed: {}", e),
            Err(e) => tracing::warn!("Segment sweep task failed: {}", e),
        }
    }
}

fn program_name(program: &Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| program.to_string_lossy().to_string())
}

/// A running encoder.
///
/// Dropping the handle stops the background tasks and kills the process.
#[derive(Debug)]
pub struct TranscodeHandle {
    pid: Option<u32>,
    output_dir: PathBuf,
    exit_rx: Option<oneshot::Receiver<TranscodeExit>>,
    kill_tx: Option<oneshot::Sender<()>>,
    exit: Option<TranscodeExit>,
    tasks: Vec<JoinHandle<()>>,
}

impl TranscodeHandle {
    /// OS process id, if the process was still running when spawned.
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Wait for the process to end.
    ///
    /// Cancellation safe, so it can sit in a `select!` loop. Once the exit is
    /// known every later call returns it again.
    pub async fn wait(&mut self) -> TranscodeExit {
        if let Some(exit) = &self.exit {
            return exit.clone();
        }
        let exit = match self.exit_rx.as_mut() {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| TranscodeExit::Lost("monitor task ended".to_string())),
            None => TranscodeExit::Lost("no monitor task".to_string()),
        };
        self.exit_rx = None;
        self.exit = Some(exit.clone());
        exit
    }

    /// Kill the process and wait until it is gone.
    pub async fn shutdown(&mut self) -> TranscodeExit {
        if let Some(kill) = self.kill_tx.take() {
            tracing::info!("Stopping encoder");
            let _ = kill.send(());
        }
        self.wait().await
    }
}

impl Drop for TranscodeHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
