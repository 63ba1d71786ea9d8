//! Sentiview CLI
//!
//! Command-line access to Sentiview charts, filters and uploads.

#![warn(clippy::all)]
#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;

use sentiview_cli::cli::Cli;
use sentiview_cli::commands;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so JSON output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sentiview=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    commands::run(cli).await?;
    Ok(())
}
