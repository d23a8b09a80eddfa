//! Command-line interface for layernet.

use clap::{Parser, Subcommand};
use layernet::Mode;
use std::path::PathBuf;

/// Layernet - keeps game accounts claiming and playing
#[derive(Parser, Debug)]
#[command(name = "layernet")]
#[command(about = "Automated client for the Layernet game", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the bot over every account in the account file
    Run {
        /// Path to the TOML configuration file
        #[arg(short, long, default_value = "layernet.toml")]
        config: PathBuf,

        /// Override the account file
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Override the fleet mode
        #[arg(short, long, value_enum)]
        mode: Option<Mode>,

        /// Override the per-connection game ceiling
        #[arg(long)]
        max_games: Option<u32>,
    },

    /// List the accounts that parse from the account file
    Accounts {
        /// Account file
        #[arg(short, long, default_value = "data.txt")]
        data: PathBuf,
    },
}
