use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "midnight-signal")]
#[command(author, version, about = "Unattended single-channel HLS broadcast engine")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the broadcast: curate content, transcode it and publish the stream
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Use the existing content directory instead of running the curator
        #[arg(long)]
        skip_curation: bool,
    },

    /// Publish an existing stream directory without transcoding
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Follow a live stream headlessly and report live-edge corrections
    Watch {
        /// Manifest URL, e.g. http://localhost:3000/stream/live.m3u8
        #[arg(required = true)]
        url: String,

        /// Stop after this many seconds (runs until Ctrl+C if unset)
        #[arg(long)]
        duration: Option<u64>,

        /// Consecutive failed polls before the signal counts as lost
        #[arg(long, default_value = "5")]
        max_failures: u32,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
