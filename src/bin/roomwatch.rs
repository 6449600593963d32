//! roomwatch CLI Binary
//!
//! Command-line entry point for the Matrix room directory watchdog.

use anyhow::Context;
use clap::Parser;
use roomwatch::logging::init_logging;
use roomwatch::tooling::cli::{Cli, CliContext};
use std::process;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let working_dir = std::env::current_dir().context("Failed to resolve working directory")?;
    let context = CliContext::new(working_dir, cli.config.clone())
        .context("Failed to load configuration")?;

    let logging = cli.logging_config(&context.config().logging);
    init_logging(Some(&logging)).context("Failed to initialize logging")?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            interrupt.cancel();
        }
    });

    let output = context.execute(&cli.command, cancel).await?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}
