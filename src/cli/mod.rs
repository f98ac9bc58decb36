//! CLI module for Skryba.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Skryba - transcript harvesting pipeline
///
/// Enumerates items from configured feeds and channels, resolves each
/// item's text through a chain of fallback strategies, and appends results
/// to per-source JSONL logs. The name comes from the Polish word for
/// "scribe."
#[derive(Parser, Debug)]
#[command(name = "skryba")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize configuration and a sources file skeleton
    Init,

    /// Check external tools and configuration
    Doctor,

    /// Run the acquisition pipeline over the configured sources
    Run {
        /// Path to the source list (overrides the configured one)
        #[arg(short, long)]
        sources: Option<String>,

        /// Only process sources whose id contains this string
        #[arg(long)]
        source: Option<String>,

        /// Maximum number of recent items per source
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List the configured sources
    Sources {
        /// Path to the source list (overrides the configured one)
        #[arg(short, long)]
        sources: Option<String>,
    },
}
