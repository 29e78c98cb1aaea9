//! ARQ Sender - reliable file sender
//!
//! Sends one file to an `arq-receiver` over UDP using selective-repeat ARQ.

use anyhow::Context;
use arq::ProgressFn;
use arq_cli::{display_sender_stats, init_logging, print_progress, CliConfig};
use clap::Parser;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "arq-sender")]
#[command(about = "Send a file over UDP with selective-repeat ARQ", long_about = None)]
struct Args {
    /// File to send
    file: PathBuf,

    /// Receiver UDP port
    port: u16,

    /// Receiver host
    #[arg(long)]
    host: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ack timeout in milliseconds
    #[arg(long)]
    ack_timeout_ms: Option<u64>,

    /// Write the effective configuration to this file before sending
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn resolve(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .with_context(|| format!("Cannot resolve {}", host))?
        .next()
        .ok_or_else(|| anyhow::anyhow!("No address found for {}", host))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut cli_config = match &args.config {
        Some(path) => CliConfig::from_file(path)
            .with_context(|| format!("Cannot load {}", path.display()))?,
        None => CliConfig::default(),
    };
    if let Some(host) = args.host {
        cli_config.transfer.host = host;
    }
    if let Some(ms) = args.ack_timeout_ms {
        cli_config.protocol.ack_timeout_ms = ms;
    }
    if let Some(path) = &args.save_config {
        cli_config.to_file(path)?;
        tracing::info!("Configuration written to {}", path.display());
    }

    let config = cli_config.arq_config()?;
    let remote = resolve(&cli_config.transfer.host, args.port)?;

    tracing::info!("ARQ Sender starting...");
    tracing::debug!("Protocol configuration: {:?}", config);

    let progress: Option<ProgressFn> = if cli_config.transfer.progress {
        Some(Box::new(|bytes: u64| print_progress("Sent", bytes)))
    } else {
        None
    };

    let start = Instant::now();
    let stats = arq::send_file(&args.file, remote, config, progress)?;

    display_sender_stats(&stats, start.elapsed());
    println!("Success.");

    Ok(())
}
