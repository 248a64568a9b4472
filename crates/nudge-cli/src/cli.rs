//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Budget Nudge - behavioral analytics for your spending
#[derive(Parser)]
#[command(name = "nudge")]
#[command(about = "Financial health score, anomalies, overspend risk and nudges", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Engine config file (defaults to the data-dir override, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Classifier artifact (defaults to the data-dir model; heuristic if absent)
    #[arg(long, global = true)]
    pub model: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a transaction export
    Analyze {
        /// JSON file with an array of transactions
        #[arg(short, long)]
        file: PathBuf,

        /// Earlier snapshot (JSON) to compare against
        #[arg(long)]
        previous: Option<PathBuf>,

        /// Write the snapshot as JSON to this path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the snapshot as JSON instead of a report
        #[arg(long)]
        json: bool,
    },

    /// Compare two transaction exports (earlier vs later)
    Compare {
        /// Earlier transaction export
        #[arg(long)]
        previous: PathBuf,

        /// Later transaction export
        #[arg(long)]
        current: PathBuf,

        /// Print the delta as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ask the assistant about a transaction export
    Chat {
        /// JSON file with an array of transactions
        #[arg(short, long)]
        file: PathBuf,

        /// Message to answer (interactive session if omitted)
        message: Option<String>,
    },

    /// Inspect engine configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show where config and model files are looked up
    Paths,

    /// Validate a config file without running analysis
    Validate {
        /// TOML file to check
        path: PathBuf,
    },
}
