//! Shared utilities for commands
//!
//! This module contains:
//! - `EngineArgs` - Global engine flags
//! - `build_aggregator` - Load config and classifier, build the engine
//! - `load_transactions` - Read a JSON transaction export

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use nudge_core::{AnalyticsAggregator, EngineConfig, Transaction};

/// Global flags that shape the engine
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineArgs<'a> {
    pub config: Option<&'a Path>,
    pub model: Option<&'a Path>,
}

/// Load and validate the configuration
pub fn load_config(args: &EngineArgs<'_>) -> Result<EngineConfig> {
    EngineConfig::load(args.config).context("Failed to load engine configuration")
}

/// Build the aggregator, falling back to the heuristic risk model
pub fn build_aggregator(args: &EngineArgs<'_>) -> Result<AnalyticsAggregator> {
    let config = load_config(args)?;
    AnalyticsAggregator::from_config(config, args.model).context("Failed to build analytics engine")
}

/// Read a JSON array of transactions
pub fn load_transactions(path: &Path) -> Result<Vec<Transaction>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read transactions from {}", path.display()))?;
    let transactions: Vec<Transaction> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid transaction file {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        count = transactions.len(),
        "Loaded transactions"
    );
    Ok(transactions)
}
