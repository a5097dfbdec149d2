//! Broadcast pipeline: curation, transcoding and publishing in sequence.

pub mod orchestrator;
pub mod state;

pub use orchestrator::Orchestrator;
pub use state::PipelineState;
