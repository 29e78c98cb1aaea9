//! ARQ Receiver - reliable file receiver
//!
//! Waits for one `arq-sender` transfer on a UDP port and writes it to a file.
//! There is no dead-sender detection: if the sender vanishes mid-transfer
//! the receiver waits until it is killed.

use anyhow::Context;
use arq::ProgressFn;
use arq_cli::{display_receiver_stats, init_logging, print_progress, CliConfig};
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "arq-receiver")]
#[command(about = "Receive a file over UDP with selective-repeat ARQ", long_about = None)]
struct Args {
    /// Output file
    file: PathBuf,

    /// UDP port to listen on
    port: u16,

    /// Local address to bind
    #[arg(long)]
    bind: Option<IpAddr>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let cli_config = match &args.config {
        Some(path) => CliConfig::from_file(path)
            .with_context(|| format!("Cannot load {}", path.display()))?,
        None => CliConfig::default(),
    };
    let config = cli_config.arq_config()?;

    let ip = match args.bind {
        Some(ip) => ip,
        None => cli_config
            .transfer
            .bind
            .parse()
            .with_context(|| format!("Invalid bind address {}", cli_config.transfer.bind))?,
    };
    let local = SocketAddr::new(ip, args.port);

    tracing::info!("ARQ Receiver starting...");
    tracing::debug!("Protocol configuration: {:?}", config);

    let progress: Option<ProgressFn> = if cli_config.transfer.progress {
        Some(Box::new(|bytes: u64| print_progress("Received", bytes)))
    } else {
        None
    };

    let start = Instant::now();
    let stats = arq::receive_file(&args.file, local, config, progress)?;

    display_receiver_stats(&stats, start.elapsed());
    println!("Success.");

    Ok(())
}
