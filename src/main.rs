use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use appwarden::config::Config;
use appwarden::coordinator::Coordinator;
use appwarden::enforce::TermuxEnforcer;
use appwarden::error::WardenError;
use appwarden::probe::DumpsysProbe;

/// Appwarden: limit foreground time for listed apps and ban them when it runs out
#[derive(Parser, Debug)]
#[command(name = "appwarden")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Blocklist file, one package name per line (default: block.txt)
    #[arg(short = 'b', long = "blocklist")]
    blocklist: Option<PathBuf>,

    /// Active usage allowed per session, in seconds (default: 1800)
    #[arg(long = "limit-secs")]
    limit_secs: Option<u64>,

    /// Ban duration after the limit is hit, in seconds (default: 600)
    #[arg(long = "ban-secs")]
    ban_secs: Option<u64>,

    /// Pause longer than this resets the session, in seconds (default: 300)
    #[arg(long = "idle-reset-secs")]
    idle_reset_secs: Option<u64>,

    /// Polling interval in milliseconds (default: 1500)
    #[arg(long = "poll-interval-ms")]
    poll_interval_ms: Option<u64>,

    /// Config file (TOML format)
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("appwarden=debug,info")
    } else {
        EnvFilter::new("appwarden=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config, WardenError> {
    // Start with default config or load from file
    let mut config = if let Some(ref config_path) = cli.config {
        Config::from_file(config_path)?
    } else {
        Config::default()
    };

    // Merge CLI arguments
    config.merge_cli_args(
        cli.blocklist.clone(),
        cli.limit_secs,
        cli.ban_secs,
        cli.idle_reset_secs,
        cli.poll_interval_ms,
    );

    Ok(config)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    // Setup shutdown signal handling
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Received Ctrl+C, shutting down...");
        let _ = shutdown_tx_clone.send(());
    });

    // Load configuration
    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Limit {}s, ban {}s, idle reset {}s",
        config.limit_secs, config.ban_secs, config.idle_reset_secs
    );

    // Build the coordinator; a missing blocklist is fatal here
    let probe = DumpsysProbe::new(config.probe_timeout());
    let mut coordinator = match Coordinator::new(config, probe, Arc::new(TermuxEnforcer)) {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    // Run the polling loop until interrupted
    match coordinator.run(shutdown_rx).await {
        Err(WardenError::ShutdownRequested) => {
            println!("\n{} Quitting...", "INTERRUPTED:".yellow().bold());
            std::process::exit(0);
        }
        Ok(()) => {}
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
