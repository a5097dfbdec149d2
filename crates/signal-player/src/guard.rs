//! The live-edge playback guard.
//!
//! The guard owns a viewer's [`PlaybackSession`] and is the only thing that
//! changes it. There is no seek operation: the position moves
//! with playback, and whenever it strays from the live-sync point by more
//! than the tolerance it is put back, inside the same callback that noticed.

use signal_common::Error;

use crate::handler::{Attachment, HandlerEvent, MediaElement, StreamHandler};
use crate::session::{GuardState, PlaybackSession, AUTOPLAY_PROMPT};

/// Largest allowed distance from the live-sync position, in seconds.
pub const DEFAULT_TOLERANCE: f64 = 1.0;

/// Keeps one media element pinned to the live edge of one stream.
pub struct LiveGuard<H: StreamHandler, M: MediaElement> {
    url: String,
    media: M,
    session: PlaybackSession,
    tolerance: f64,
    idle_handler: Option<H>,
    attachment: Option<Attachment<H>>,
    unmounted: bool,
}

impl<H: StreamHandler, M: MediaElement> LiveGuard<H, M> {
    pub fn new(url: impl Into<String>, handler: H, media: M) -> Self {
        Self {
            url: url.into(),
            media,
            session: PlaybackSession::default(),
            tolerance: DEFAULT_TOLERANCE,
            idle_handler: Some(handler),
            attachment: None,
            unmounted: false,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn state(&self) -> GuardState {
        self.session.state
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    /// The attached handler, `None` while detached.
    pub fn handler(&self) -> Option<&H> {
        self.attachment.as_ref().and_then(Attachment::handler)
    }

    pub fn handler_mut(&mut self) -> Option<&mut H> {
        self.attachment.as_mut().and_then(Attachment::handler_mut)
    }

    pub fn is_attached(&self) -> bool {
        self.attachment.is_some()
    }

    /// Attach the handler to the stream and start loading.
    pub fn mount(&mut self) {
        if self.unmounted || self.attachment.is_some() {
            return;
        }
        let Some(handler) = self.idle_handler.take() else {
            return;
        };
        tracing::debug!("Attaching to {}", self.url);
        self.attachment = Some(Attachment::acquire(handler, &self.url));
        self.set_state(GuardState::Loading);
    }

    /// Detach for good. Events delivered afterwards are ignored.
    pub fn unmount(&mut self) {
        self.detach();
        self.unmounted = true;
    }

    /// Feed one event from the handler or media element.
    pub fn handle_event(&mut self, event: HandlerEvent) {
        if self.attachment.is_none() {
            tracing::trace!("Ignoring {:?} on a detached session", event);
            return;
        }
        match event {
            HandlerEvent::ManifestParsed => self.on_manifest_parsed(),
            HandlerEvent::Error { fatal: true, details } => {
                self.fail(format!("Signal lost: {details}"));
            }
            HandlerEvent::Error {
                fatal: false,
                details,
            } => {
                tracing::warn!("Stream error (recovering): {}", details);
            }
            HandlerEvent::PositionChanged(position) => {
                self.on_position_change(position);
            }
        }
    }

    /// Position callback. Returns the corrected position if playback had
    /// drifted outside the tolerance.
    pub fn on_position_change(&mut self, position: f64) -> Option<f64> {
        if self.attachment.is_none() {
            return None;
        }
        self.session.position = position;
        if self.session.state != GuardState::Live {
            return None;
        }

        let live_sync = self.handler().and_then(|h| h.live_sync_position())?;
        self.session.live_sync = Some(live_sync);

        if (position - live_sync).abs() > self.tolerance {
            tracing::debug!(
                "Position {:.2}s strayed from live edge {:.2}s, resetting",
                position,
                live_sync
            );
            self.media.set_position(live_sync);
            self.session.position = live_sync;
            return Some(live_sync);
        }
        None
    }

    /// Read the media element's position and enforce the live edge.
    pub fn sync(&mut self) -> Option<f64> {
        let position = self.media.position();
        self.on_position_change(position)
    }

    /// Set the volume, clamped to `0.0..=1.0`. An audible volume while muted
    /// also unmutes. Non-finite values are ignored.
    pub fn set_volume(&mut self, volume: f64) {
        if !volume.is_finite() {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        if volume > 0.0 && self.session.muted {
            self.session.muted = false;
            self.media.set_muted(false);
        }
        self.session.volume = volume;
        self.media.set_volume(volume);
    }

    pub fn toggle_mute(&mut self) {
        self.set_muted(!self.session.muted);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.session.muted = muted;
        self.media.set_muted(muted);
    }

    /// A click or key press. Retries playback if autoplay was refused.
    pub fn user_interaction(&mut self) {
        if self.session.state != GuardState::Live || self.session.prompt.is_none() {
            return;
        }
        self.start_playback();
    }

    /// Start over after a fatal error.
    pub fn retry(&mut self) {
        if self.unmounted || self.session.state != GuardState::Error {
            return;
        }
        self.session.error = None;
        self.session.prompt = None;
        self.session.live_sync = None;
        self.mount();
    }

    /// Re-attach a live session from scratch, back through `Loading`.
    pub fn reload(&mut self) {
        if self.unmounted || self.session.state != GuardState::Live {
            return;
        }
        tracing::info!("Reloading {}", self.url);
        self.detach();
        self.session.prompt = None;
        self.session.live_sync = None;
        self.mount();
    }

    fn on_manifest_parsed(&mut self) {
        if self.session.state != GuardState::Loading {
            return;
        }
        self.set_state(GuardState::Live);
        self.media.set_muted(self.session.muted);
        self.media.set_volume(self.session.volume);
        self.start_playback();
    }

    fn start_playback(&mut self) {
        match self.media.play() {
            Ok(()) => self.session.prompt = None,
            Err(Error::PlaybackAutoplayBlocked(reason)) => {
                tracing::info!("Autoplay blocked: {}", reason);
                self.session.prompt = Some(AUTOPLAY_PROMPT.to_string());
            }
            Err(e) => self.fail(format!("Signal lost: {e}")),
        }
    }

    fn fail(&mut self, message: String) {
        tracing::error!("{}", message);
        self.session.error = Some(message);
        self.session.prompt = None;
        self.set_state(GuardState::Error);
        self.detach();
    }

    fn detach(&mut self) {
        if let Some(attachment) = self.attachment.take() {
            if let Some(handler) = attachment.release() {
                self.idle_handler = Some(handler);
            }
        }
    }

    fn set_state(&mut self, next: GuardState) {
        if self.session.state != next {
            tracing::info!("Playback {} -> {}", self.session.state, next);
            self.session.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::SimulatedElement;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Handler with a fixed live-sync point that records its lifecycle.
    struct FixedEdge {
        sync: Option<f64>,
        attached: Rc<Cell<u32>>,
        destroyed: Rc<Cell<u32>>,
    }

    impl FixedEdge {
        fn at(sync: f64) -> Self {
            Self {
                sync: Some(sync),
                attached: Rc::default(),
                destroyed: Rc::default(),
            }
        }
    }

    impl StreamHandler for FixedEdge {
        fn attach(&mut self, _url: &str) {
            self.attached.set(self.attached.get() + 1);
        }
        fn destroy(&mut self) {
            self.destroyed.set(self.destroyed.get() + 1);
        }
        fn live_sync_position(&self) -> Option<f64> {
            self.sync
        }
    }

    fn live_guard(sync: f64) -> LiveGuard<FixedEdge, SimulatedElement> {
        let mut guard = LiveGuard::new(
            "/stream/live.m3u8",
            FixedEdge::at(sync),
            SimulatedElement::default(),
        );
        guard.mount();
        guard.handle_event(HandlerEvent::ManifestParsed);
        guard
    }

    #[test]
    fn test_manifest_parsed_goes_live_and_plays() {
        let guard = live_guard(100.0);
        assert_eq!(guard.state(), GuardState::Live);
        assert!(guard.media().is_playing());
        assert!(guard.media().is_muted());
        assert_eq!(guard.session().prompt, None);
    }

    #[test]
    fn test_drift_is_reset_in_same_callback() {
        let mut guard = live_guard(100.0);

        let corrected = guard.on_position_change(102.0);

        assert_eq!(corrected, Some(100.0));
        assert_eq!(guard.media().position(), 100.0);
        assert_eq!(guard.session().position, 100.0);
    }

    #[test]
    fn test_drift_within_tolerance_is_left_alone() {
        let mut guard = live_guard(100.0);
        assert_eq!(guard.on_position_change(100.8), None);
        assert_eq!(guard.on_position_change(99.2), None);
        assert_eq!(guard.session().position, 99.2);
    }

    #[test]
    fn test_scrub_backwards_snaps_to_live() {
        let mut guard = live_guard(100.0);
        guard.media_mut().scrub(10.0);
        assert_eq!(guard.sync(), Some(100.0));
        assert_eq!(guard.media().position(), 100.0);
    }

    #[test]
    fn test_no_correction_while_loading() {
        let mut guard = LiveGuard::new("u", FixedEdge::at(100.0), SimulatedElement::default());
        guard.mount();
        assert_eq!(guard.on_position_change(0.0), None);
        assert_eq!(guard.state(), GuardState::Loading);
    }

    #[test]
    fn test_volume_while_muted_unmutes() {
        let mut guard = live_guard(0.0);
        guard.set_volume(0.0);
        assert!(guard.session().muted);

        guard.set_volume(0.6);

        assert!(!guard.session().muted);
        assert_eq!(guard.session().volume, 0.6);
        assert!(!guard.media().is_muted());
        assert_eq!(guard.media().volume(), 0.6);
    }

    #[test]
    fn test_toggle_mute_keeps_volume() {
        let mut guard = live_guard(0.0);
        guard.set_volume(0.4);
        guard.toggle_mute();
        assert!(guard.session().muted);
        assert_eq!(guard.session().volume, 0.4);
    }

    #[test]
    fn test_autoplay_blocked_prompts_then_plays_on_interaction() {
        let mut guard = LiveGuard::new("u", FixedEdge::at(50.0), SimulatedElement::new(false));
        guard.mount();
        guard.handle_event(HandlerEvent::ManifestParsed);

        assert_eq!(guard.state(), GuardState::Live);
        assert_eq!(guard.session().prompt.as_deref(), Some(AUTOPLAY_PROMPT));
        assert!(!guard.media().is_playing());

        guard.set_volume(0.3);
        guard.media_mut().grant_gesture();
        guard.user_interaction();

        assert!(guard.media().is_playing());
        assert_eq!(guard.session().prompt, None);
        assert_eq!(guard.state(), GuardState::Live);
        assert_eq!(guard.session().volume, 0.3);
    }

    #[test]
    fn test_fatal_error_detaches_and_retry_reattaches() {
        let mut guard = live_guard(100.0);
        let attached = guard.handler().unwrap().attached.clone();
        let destroyed = guard.handler().unwrap().destroyed.clone();

        guard.handle_event(HandlerEvent::fatal("manifestLoadError"));

        assert_eq!(guard.state(), GuardState::Error);
        assert_eq!(
            guard.session().error.as_deref(),
            Some("Signal lost: manifestLoadError")
        );
        assert!(!guard.is_attached());
        assert_eq!(destroyed.get(), 1);

        guard.retry();
        assert_eq!(guard.state(), GuardState::Loading);
        assert_eq!(guard.session().error, None);
        assert_eq!(attached.get(), 2);

        guard.handle_event(HandlerEvent::ManifestParsed);
        assert_eq!(guard.state(), GuardState::Live);
    }

    #[test]
    fn test_transient_error_is_ignored() {
        let mut guard = live_guard(100.0);
        guard.handle_event(HandlerEvent::transient("fragLoadError"));
        assert_eq!(guard.state(), GuardState::Live);
        assert!(guard.is_attached());
    }

    #[test]
    fn test_no_callbacks_after_unmount() {
        let mut guard = live_guard(100.0);
        let destroyed = guard.handler().unwrap().destroyed.clone();

        guard.unmount();
        assert_eq!(destroyed.get(), 1);

        guard.handle_event(HandlerEvent::fatal("late"));
        assert_eq!(guard.on_position_change(500.0), None);
        guard.retry();
        guard.mount();

        assert_eq!(guard.state(), GuardState::Live);
        assert_eq!(guard.session().error, None);
        assert!(!guard.is_attached());
        assert_eq!(guard.media().position(), 0.0);
    }

    #[test]
    fn test_drop_destroys_handler() {
        let guard = live_guard(100.0);
        let destroyed = guard.handler().unwrap().destroyed.clone();
        drop(guard);
        assert_eq!(destroyed.get(), 1);
    }

    #[test]
    fn test_non_finite_volume_is_ignored() {
        let mut guard = live_guard(0.0);
        guard.set_volume(0.5);

        guard.set_volume(f64::NAN);
        guard.set_volume(f64::INFINITY);

        assert_eq!(guard.session().volume, 0.5);
        assert_eq!(guard.media().volume(), 0.5);
    }

    #[test]
    fn test_reload_goes_back_through_loading() {
        let mut guard = live_guard(100.0);
        let attached = guard.handler().unwrap().attached.clone();
        let destroyed = guard.handler().unwrap().destroyed.clone();

        guard.reload();

        assert_eq!(guard.state(), GuardState::Loading);
        assert!(guard.is_attached());
        assert_eq!(destroyed.get(), 1);
        assert_eq!(attached.get(), 2);
        assert_eq!(guard.session().live_sync, None);
        assert_eq!(guard.on_position_change(500.0), None);

        guard.handle_event(HandlerEvent::ManifestParsed);
        assert_eq!(guard.state(), GuardState::Live);
    }

    #[test]
    fn test_reload_only_applies_to_live_sessions() {
        let mut guard = LiveGuard::new("u", FixedEdge::at(1.0), SimulatedElement::default());
        guard.reload();
        assert!(!guard.is_attached());

        let mut guard = live_guard(100.0);
        guard.unmount();
        guard.reload();
        assert!(!guard.is_attached());
    }
}
