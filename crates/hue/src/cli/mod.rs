//! command line interface for hue.

mod serve;

pub use serve::ServeCommand;

use clap::{Parser, Subcommand};

/// hue - usage and subscription control plane.
#[derive(Parser, Debug)]
#[command(name = "hue", version, about)]
pub struct Cli {
    /// the subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// run the control-plane server.
    Serve(ServeCommand),
}
