//! Budget Nudge CLI - behavioral analytics for your spending
//!
//! Usage:
//!   nudge analyze --file tx.json               Score, anomalies, risk and nudges
//!   nudge compare --previous a.json --current b.json
//!   nudge chat --file tx.json "what's my score?"
//!   nudge config                               Show the effective configuration

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let engine = commands::EngineArgs {
        config: cli.config.as_deref(),
        model: cli.model.as_deref(),
    };

    match cli.command {
        Commands::Analyze {
            file,
            previous,
            output,
            json,
        } => commands::cmd_analyze(
            &engine,
            &file,
            previous.as_deref(),
            output.as_deref(),
            json,
        ),
        Commands::Compare {
            previous,
            current,
            json,
        } => commands::cmd_compare(&engine, &previous, &current, json),
        Commands::Chat { file, message } => {
            commands::cmd_chat(&engine, &file, message.as_deref())
        }
        Commands::Config { action } => match action {
            None => commands::cmd_config_show(&engine, false),
            Some(ConfigAction::Show { json }) => commands::cmd_config_show(&engine, json),
            Some(ConfigAction::Paths) => commands::cmd_config_paths(),
            Some(ConfigAction::Validate { path }) => commands::cmd_config_validate(&path),
        },
    }
}
