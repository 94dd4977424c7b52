use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "set-arena")]
#[command(version)]
#[command(about = "Real-time multi-player group claiming game")]
#[command(long_about = "Players race to mark groups of cards on a shared board. A complete \
                       group is judged by the coordinator: a valid group scores a point, an \
                       invalid one freezes the player for a while. Start with 'set-arena play'.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a game in the terminal; human players type "<agent> <slot>" lines
    Play {
        /// Configuration file to load instead of set-arena.toml
        #[arg(long, help = "Path to a TOML configuration file")]
        config: Option<PathBuf>,
        /// Number of human players
        #[arg(long, help = "Override the number of human players")]
        humans: Option<usize>,
        /// Number of autonomous players
        #[arg(long, help = "Override the number of autonomous players")]
        bots: Option<usize>,
        /// Seed for every random choice of the game
        #[arg(long, help = "Seed the game for reproducible runs")]
        seed: Option<u64>,
        /// Round length in seconds
        #[arg(long, help = "Override the round length in seconds")]
        round_seconds: Option<u64>,
        /// Print the outcome as JSON
        #[arg(long, help = "Print the final outcome as JSON on stdout")]
        json: bool,
    },
    /// Show the effective configuration
    Config {
        /// Configuration file to load instead of set-arena.toml
        #[arg(long, help = "Path to a TOML configuration file")]
        config: Option<PathBuf>,
        /// Write the configuration here instead of printing it
        #[arg(long, help = "Write the effective configuration to this path")]
        write: Option<PathBuf>,
    },
}
