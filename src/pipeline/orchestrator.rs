use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use signal_av::{
    get_tool_path, HlsOutput, OutputProfile, TranscodeSettings, TranscodeSupervisor,
};
use signal_common::Error;
use tokio::sync::{oneshot, watch};

use super::PipelineState;
use crate::config::Config;
use crate::curator::Curator;
use crate::server::{self, PublisherContext};

/// Runs the channel: curate once, start the encoder, publish its output.
pub struct Orchestrator {
    config: Config,
    state: watch::Sender<PipelineState>,
}

impl Orchestrator {
    pub fn new(config: Config) -> Self {
        let (state, _) = watch::channel(PipelineState::Idle);
        Self { config, state }
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    /// Move to `next`, refusing anything but a forward step or a failure.
    pub fn transition(&self, next: PipelineState) -> signal_common::Result<()> {
        let current = self.state();
        if !current.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }
        self.state.send_replace(next);
        tracing::info!("Pipeline {} -> {}", current, next);
        Ok(())
    }

    /// Run until an OS shutdown signal.
    pub async fn run(&self) -> Result<()> {
        self.run_until(server::shutdown_signal()).await
    }

    /// Run until `shutdown` resolves.
    ///
    /// Returns `Ok` only for a requested shutdown. Everything else (failed
    /// curation, an encoder that could not start or exited, a publisher
    /// that stopped) leaves the pipeline `Failed` and returns the cause.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let result = self.broadcast(shutdown).await;
        if let Err(ref e) = result {
            tracing::error!("Broadcast failed: {:#}", e);
            if !self.state().is_terminal() {
                self.transition(PipelineState::Failed)?;
            }
        }
        result
    }

    async fn broadcast(&self, shutdown: impl Future<Output = ()>) -> Result<()> {
        self.transition(PipelineState::Curating)?;
        let content = Curator::new(self.config.curator.clone())
            .run(&self.config.paths.content_dir)
            .await?;
        let mode = content.transcode_mode()?;

        self.transition(PipelineState::Transcoding)?;
        let supervisor = TranscodeSupervisor::new(self.transcode_settings()?);
        let mut encoder = supervisor
            .start(&mode)
            .await
            .map_err(Error::from)
            .context("Failed to start encoder")?;

        // The encoder has spawned and its directory exists; that is enough to
        // serve. The manifest appears once the first segment is written.
        let listener = server::bind(&self.config).await?;
        let ctx = PublisherContext::from_config(&self.config, self.subscribe());
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let mut publisher = tokio::spawn(server::serve(listener, ctx, async move {
            let _ = stop_rx.await;
        }));
        self.transition(PipelineState::Publishing)?;

        let outcome: Result<()> = tokio::select! {
            exit = encoder.wait() => {
                Err(exit.into_result().err().unwrap_or_else(|| {
                    Error::transcode("encoder stopped without a shutdown request")
                }).into())
            }
            served = &mut publisher => {
                encoder.shutdown().await;
                match served {
                    Ok(Ok(())) => Err(anyhow::anyhow!("publisher stopped unexpectedly")),
                    Ok(Err(e)) => Err(e.context("Publisher failed")),
                    Err(e) => Err(anyhow::anyhow!("publisher task failed: {}", e)),
                }
            }
            _ = shutdown => {
                let exit = encoder.shutdown().await;
                tracing::info!("Encoder stopped: {}", exit);
                Ok(())
            }
        };

        let _ = stop_tx.send(());
        if !publisher.is_finished() {
            if let Err(e) = publisher.await {
                tracing::warn!("Publisher task ended abnormally: {}", e);
            }
        }
        outcome
    }

    fn transcode_settings(&self) -> Result<TranscodeSettings> {
        let transcode = &self.config.transcode;
        let ffmpeg = get_tool_path("ffmpeg", transcode.ffmpeg_path.as_deref())
            .map_err(Error::from)?;
        let ffprobe = if transcode.synthesize_silence {
            get_tool_path("ffprobe", transcode.ffprobe_path.as_deref()).ok()
        } else {
            None
        };

        let mut profile = OutputProfile::broadcast();
        profile.gain = Some(transcode.gain).filter(|g| (*g - 1.0).abs() > f32::EPSILON);

        Ok(TranscodeSettings {
            ffmpeg,
            ffprobe,
            profile,
            output: HlsOutput {
                dir: self.config.paths.stream_dir.clone(),
                segment_seconds: transcode.segment_seconds,
                window_size: transcode.window_size,
            },
            synthesize_silence: transcode.synthesize_silence,
            log_interval: Duration::from_secs(transcode.log_interval_secs),
            janitor_interval: Some(transcode.janitor_interval_secs)
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_rejects_skipping() {
        let orchestrator = Orchestrator::new(Config::default());
        let err = orchestrator
            .transition(PipelineState::Publishing)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
        assert_eq!(orchestrator.state(), PipelineState::Idle);
    }

    #[test]
    fn test_transition_notifies_subscribers() {
        let orchestrator = Orchestrator::new(Config::default());
        let rx = orchestrator.subscribe();
        orchestrator.transition(PipelineState::Curating).unwrap();
        assert_eq!(*rx.borrow(), PipelineState::Curating);

        orchestrator.transition(PipelineState::Failed).unwrap();
        assert!(orchestrator.transition(PipelineState::Transcoding).is_err());
        assert!(orchestrator.transition(PipelineState::Failed).is_err());
    }

    #[test]
    fn test_unity_gain_is_omitted() {
        let mut config = Config::default();
        config.transcode.ffmpeg_path = Some(std::env::current_exe().unwrap());
        config.transcode.gain = 1.0;
        config.transcode.janitor_interval_secs = 0;

        let settings = Orchestrator::new(config).transcode_settings().unwrap();
        assert_eq!(settings.profile.gain, None);
        assert_eq!(settings.janitor_interval, None);
    }
}
