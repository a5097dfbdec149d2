//! Seams between the guard and the playback stack underneath it.

use signal_common::Result;

/// Something a [`StreamHandler`] reports back to the guard.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerEvent {
    /// The first manifest was loaded and parsed.
    ManifestParsed,
    /// Loading failed. Only fatal errors end the session.
    Error { fatal: bool, details: String },
    /// The media element's playback position moved.
    PositionChanged(f64),
}

impl HandlerEvent {
    pub fn fatal(details: impl Into<String>) -> Self {
        Self::Error {
            fatal: true,
            details: details.into(),
        }
    }

    pub fn transient(details: impl Into<String>) -> Self {
        Self::Error {
            fatal: false,
            details: details.into(),
        }
    }
}

/// The segmented-streaming protocol handler (manifest loading, segment
/// fetching, live-edge tracking).
pub trait StreamHandler {
    /// Start loading the stream at `url`.
    fn attach(&mut self, url: &str);

    /// Drop every resource acquired by [`attach`](Self::attach). No event may
    /// be produced afterwards until the next `attach`.
    fn destroy(&mut self);

    /// Where a live player should currently be, in seconds. `None` until the
    /// first manifest is known.
    fn live_sync_position(&self) -> Option<f64>;
}

/// The element that actually renders media.
pub trait MediaElement {
    fn position(&self) -> f64;

    fn set_position(&mut self, seconds: f64);

    /// Start playback.
    ///
    /// Returns [`signal_common::Error::PlaybackAutoplayBlocked`] when the
    /// environment refuses to start without a user gesture.
    fn play(&mut self) -> Result<()>;

    fn set_muted(&mut self, muted: bool);

    fn set_volume(&mut self, volume: f64);
}

/// A handler attached to a stream.
///
/// Releasing it, explicitly or by drop, destroys the handler's resources, so
/// a handler can never outlive the session it was attached for.
#[derive(Debug)]
pub struct Attachment<H: StreamHandler> {
    handler: Option<H>,
}

impl<H: StreamHandler> Attachment<H> {
    pub fn acquire(mut handler: H, url: &str) -> Self {
        handler.attach(url);
        Self {
            handler: Some(handler),
        }
    }

    pub fn handler(&self) -> Option<&H> {
        self.handler.as_ref()
    }

    pub fn handler_mut(&mut self) -> Option<&mut H> {
        self.handler.as_mut()
    }

    /// Destroy the handler's resources and hand it back for reuse.
    pub fn release(mut self) -> Option<H> {
        let mut handler = self.handler.take()?;
        handler.destroy();
        Some(handler)
    }
}

impl<H: StreamHandler> Drop for Attachment<H> {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.as_mut() {
            handler.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counting {
        attached: u32,
        destroyed: u32,
    }

    impl StreamHandler for Counting {
        fn attach(&mut self, _url: &str) {
            self.attached += 1;
        }
        fn destroy(&mut self) {
            self.destroyed += 1;
        }
        fn live_sync_position(&self) -> Option<f64> {
            None
        }
    }

    #[test]
    fn test_release_destroys_once() {
        let attachment = Attachment::acquire(Counting::default(), "/stream/live.m3u8");
        let handler = attachment.release().unwrap();
        assert_eq!(handler.attached, 1);
        assert_eq!(handler.destroyed, 1);
    }

    #[test]
    fn test_error_constructors() {
        assert_eq!(
            HandlerEvent::fatal("manifestLoadError"),
            HandlerEvent::Error {
                fatal: true,
                details: "manifestLoadError".into()
            }
        );
        assert!(matches!(
            HandlerEvent::transient("x"),
            HandlerEvent::Error { fatal: false, .. }
        ));
    }
}
