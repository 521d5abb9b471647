//! hue - usage and subscription control plane.
//!
//! ingests per-session traffic reports from heterogeneous proxy/VPN
//! data-plane services, enforces per-user quotas and concurrency limits in
//! real time, aggregates usage into a reseller tree, and emits disconnect
//! commands when limits are violated.

use clap::Parser;
use color_eyre::eyre::Result;
use hue::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(cmd) => cmd.run().await,
    }
}
