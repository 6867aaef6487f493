//! Watchpost CLI Binary
//!
//! Command-line entry point: load configuration, set up logging, wire
//! Ctrl-C to cancellation, and run the requested command.

use clap::Parser;
use std::process;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use watchpost::cli::{Cli, RunContext};
use watchpost::config::MonitorConfig;
use watchpost::logging::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match MonitorConfig::load(cli.config.as_deref()) {
        Ok(config) => cli.apply_overrides(config),
        Err(e) => {
            eprintln!("{}", watchpost::cli::map_error(&e));
            process::exit(1);
        }
    };

    if let Err(e) = init_logging(Some(&config.logging)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("Watchpost starting");

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, stopping");
                signal_token.cancel();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    let context = RunContext::new(config);
    match context.execute(&cli.command, cancel).await {
        Ok(output) => {
            info!("Command completed");
            println!("{}", output);
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", watchpost::cli::map_error(&e));
            process::exit(1);
        }
    }
}
