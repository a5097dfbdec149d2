//! Midnight Signal - unattended single-channel HLS broadcast engine
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod curator;
pub mod pipeline;
pub mod server;
