//! CLI argument definitions using clap
//!
//! Commands:
//! - modshelf init --config <path>
//! - modshelf serve --config <path> [--host <host>] [--port <port>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// modshelf - A self-hostable catalogue server for game-modification assets
#[derive(Parser, Debug)]
#[command(name = "modshelf")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default configuration file
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./modshelf.json")]
        config: PathBuf,
    },

    /// Start the catalogue server
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./modshelf.json")]
        config: PathBuf,

        /// Override the configured bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the configured bind port
        #[arg(long)]
        port: Option<u16>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
