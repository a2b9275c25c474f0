//! Binary crate for the `smhi` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive location setup
//! - Human-friendly output formatting

use clap::Parser;

mod cli;
mod render;

const DEFAULT_LOG_FILTER: &str = "smhi=info,smhi_core=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so rendered output on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
