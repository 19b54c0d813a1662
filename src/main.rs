//! CLI entry point for `pymget`.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use pymget_core::config::Config;
use pymget_core::console::{Console, TerminalConsole};
use pymget_core::manager::Manager;
use tracing::{debug, error, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --quiet > --verbose > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let console: Arc<dyn Console> = Arc::new(TerminalConsole::new());

    let config = match Config::build(
        args.urls,
        &args.block_size,
        args.timeout,
        args.urls_file.as_deref(),
        args.out_file,
        console.as_ref(),
    ) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid arguments");
            return Err(e.into());
        }
    };

    info!(mirrors = config.urls.len(), block_size = config.block_size, "starting download");

    let mut manager = Manager::new(config, console).await?;
    manager.download().await?;

    Ok(())
}
