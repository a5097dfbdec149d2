//! # signal-player
//!
//! Live-only playback for the midnight-signal channel.
//!
//! A [`LiveGuard`] sits between a viewer and two pluggable pieces: a
//! [`StreamHandler`] that loads the segmented stream and knows where the live
//! edge is, and a [`MediaElement`] that renders it. The guard keeps playback
//! within a second of the live-sync point, exposes mute and volume, and
//! turns fatal handler errors into a visible "signal lost" state.
//!
//! ```
//! use signal_player::{HandlerEvent, LiveGuard, SimulatedElement, StreamHandler};
//!
//! struct Fixed;
//! impl StreamHandler for Fixed {
//!     fn attach(&mut self, _url: &str) {}
//!     fn destroy(&mut self) {}
//!     fn live_sync_position(&self) -> Option<f64> { Some(30.0) }
//! }
//!
//! let mut guard = LiveGuard::new("/stream/live.m3u8", Fixed, SimulatedElement::default());
//! guard.mount();
//! guard.handle_event(HandlerEvent::ManifestParsed);
//! assert_eq!(guard.on_position_change(0.0), Some(30.0));
//! ```
//!
//! With the `follower` feature, [`ManifestFollower`] implements
//! [`StreamHandler`] by polling a published manifest over HTTP.

#[cfg(feature = "follower")]
pub mod follower;
pub mod guard;
pub mod handler;
pub mod media;
pub mod session;

#[cfg(feature = "follower")]
pub use follower::ManifestFollower;
pub use guard::LiveGuard;
pub use handler::{Attachment, HandlerEvent, MediaElement, StreamHandler};
pub use media::SimulatedElement;
pub use session::{GuardState, PlaybackSession};
