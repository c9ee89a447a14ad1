//! Command-line interface for strictly_chess.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Strictly Chess - unattended Lichess bot
#[derive(Parser, Debug)]
#[command(name = "strictly_chess")]
#[command(about = "Plays Lichess games with oracle-chosen moves and records every decision", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "strictly_chess.toml", global = true)]
    pub config: PathBuf,

    /// Override the ledger file
    #[arg(long, global = true)]
    pub ledger: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play active games and accept console commands
    Run {
        /// Start with matchmaking disabled
        #[arg(long)]
        paused: bool,

        /// Do not read commands from stdin
        #[arg(long)]
        no_console: bool,
    },

    /// Send one challenge and exit
    Challenge {
        /// Opponent username
        username: String,

        /// Time control as minutes+increment
        time: Option<String>,

        /// white, black or random
        color: Option<String>,

        /// rated or casual
        rated: Option<String>,
    },

    /// Compare recorded moves with current oracle suggestions
    Review,
}
