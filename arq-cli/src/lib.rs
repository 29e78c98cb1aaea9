//! ARQ CLI Library
//!
//! Shared functionality for the ARQ command-line tools.

pub mod config;
pub mod stats;

pub use config::{CliConfig, ConfigFileError, ProtocolSection, TransferSection};
pub use stats::{
    display_receiver_stats, display_sender_stats, format_bandwidth, format_bytes,
    format_duration, print_progress, throughput_bps,
};

/// Initialise logging; `RUST_LOG` wins over the `--verbose` default
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
