//! Headless stream handler that follows a published live manifest.

use std::collections::VecDeque;
use std::time::Duration;

use signal_common::{Error, Result};
use signal_media::{LivePlaylist, LiveTimeline};

use crate::handler::{HandlerEvent, StreamHandler};

/// Consecutive failed polls tolerated before the stream counts as lost.
pub const DEFAULT_MAX_FAILURES: u32 = 5;

/// Polls `live.m3u8` and tracks the live edge across reloads.
#[derive(Debug)]
pub struct ManifestFollower {
    client: reqwest::Client,
    url: Option<String>,
    timeline: LiveTimeline,
    parsed: bool,
    failures: u32,
    max_failures: u32,
    events: VecDeque<HandlerEvent>,
}

impl Default for ManifestFollower {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FAILURES)
    }
}

impl ManifestFollower {
    pub fn new(max_failures: u32) -> Self {
        Self::with_client(reqwest::Client::new(), max_failures)
    }

    pub fn with_client(client: reqwest::Client, max_failures: u32) -> Self {
        Self {
            client,
            url: None,
            timeline: LiveTimeline::default(),
            parsed: false,
            failures: 0,
            max_failures: max_failures.max(1),
            events: VecDeque::new(),
        }
    }

    pub fn timeline(&self) -> &LiveTimeline {
        &self.timeline
    }

    /// How long to wait between polls: half a target duration once known.
    pub fn poll_interval(&self) -> Duration {
        match self.timeline.target_duration() {
            Some(target) if target > 0 => Duration::from_millis(u64::from(target) * 500),
            _ => Duration::from_secs(1),
        }
    }

    /// Fetch the manifest once and queue the resulting events.
    pub async fn poll(&mut self) {
        let Some(url) = self.url.clone() else {
            return;
        };
        let fetched = self.fetch(&url).await;
        // A destroy() may have raced the request; drop its result.
        if self.url.as_deref() == Some(url.as_str()) {
            self.apply(fetched);
        }
    }

    /// Take the events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<HandlerEvent> {
        self.events.drain(..).collect()
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::manifest_fetch(e.to_string()))?;
        let response = response
            .error_for_status()
            .map_err(|e| Error::manifest_fetch(e.to_string()))?;
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::manifest_fetch(e.to_string()))?;
        Ok(body.to_vec())
    }

    /// Fold one fetch result into the timeline.
    fn apply(&mut self, fetched: Result<Vec<u8>>) {
        let playlist = fetched.and_then(|body| LivePlaylist::parse(&body));
        let playlist = match playlist {
            Ok(playlist) => playlist,
            Err(e) => {
                self.failures += 1;
                tracing::debug!(
                    "Manifest poll failed ({}/{}): {}",
                    self.failures,
                    self.max_failures,
                    e
                );
                let event = if self.failures >= self.max_failures {
                    HandlerEvent::fatal(e.to_string())
                } else {
                    HandlerEvent::transient(e.to_string())
                };
                self.events.push_back(event);
                return;
            }
        };

        self.failures = 0;
        if self.timeline.ingest(&playlist) {
            tracing::trace!(
                "Live edge at {:.2}s (sequence {})",
                self.timeline.live_edge(),
                playlist.media_sequence
            );
        }
        if !self.parsed {
            self.parsed = true;
            self.events.push_back(HandlerEvent::ManifestParsed);
        }
        if playlist.ended {
            self.events
                .push_back(HandlerEvent::fatal("broadcast ended".to_string()));
        }
    }
}

impl StreamHandler for ManifestFollower {
    fn attach(&mut self, url: &str) {
        self.url = Some(url.to_string());
        self.timeline = LiveTimeline::default();
        self.parsed = false;
        self.failures = 0;
        self.events.clear();
    }

    fn destroy(&mut self) {
        self.url = None;
        self.events.clear();
    }

    fn live_sync_position(&self) -> Option<f64> {
        self.timeline.live_sync_position()
    }
}
