//! Live HLS transcoding.
//!
//! One long-lived ffmpeg process reads the curated content (a concat
//! playlist or a single file, looped forever) and writes `live.m3u8` plus
//! `liveNNN.ts` segments into the stream directory. The supervisor never
//! restarts it: an exit is reported once through [`TranscodeHandle::wait`]
//! and the caller decides what happens to the process.

mod args;
mod diagnostics;
mod janitor;
mod supervisor;

pub use args::{build_args, AudioSource, HlsOutput, OutputProfile, TranscodeMode};
pub use diagnostics::{DiagnosticFilter, LineKind, LineSplitter};
pub use janitor::{clear_stale_artifacts, list_artifacts, sweep_unreferenced};
pub use supervisor::{TranscodeExit, TranscodeHandle, TranscodeSettings, TranscodeSupervisor};
