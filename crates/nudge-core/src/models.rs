//! Domain models for Budget Nudge

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{Error, Result};

/// Categories every installation starts with
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Food Delivery",
    "Groceries",
    "Transportation",
    "Entertainment",
    "Utilities",
    "Healthcare",
    "Shopping",
    "Education",
    "Investment",
    "Other",
];

/// Categories counted as delivery spend by default
pub const DEFAULT_DELIVERY_CATEGORIES: &[&str] = &["Food Delivery"];

/// Transaction source - how it reached the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionSource {
    /// Imported from a bank statement
    #[default]
    Import,
    /// Synced from a connected mailbox or account
    Sync,
    /// Manually entered
    Manual,
    /// Generated by the simulator
    Simulated,
}

impl TransactionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Sync => "sync",
            Self::Manual => "manual",
            Self::Simulated => "simulated",
        }
    }
}

impl std::str::FromStr for TransactionSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "import" | "csv_upload" => Ok(Self::Import),
            "sync" | "gmail_sync" => Ok(Self::Sync),
            "manual" | "manual_entry" => Ok(Self::Manual),
            "simulated" | "simulation" => Ok(Self::Simulated),
            _ => Err(format!("Unknown transaction source: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A financial transaction, as handed over by the ingestion collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub category: String,
    /// Positive = expense, negative = income or refund
    pub amount: f64,
    #[serde(default)]
    pub source: TransactionSource,
    #[serde(default)]
    pub description: String,
}

impl Transaction {
    pub fn new(
        id: i64,
        user_id: i64,
        date: NaiveDate,
        category: impl Into<String>,
        amount: f64,
    ) -> Self {
        Self {
            id,
            user_id,
            date,
            category: category.into(),
            amount,
            source: TransactionSource::default(),
            description: String::new(),
        }
    }

    pub fn with_source(mut self, source: TransactionSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Whether this transaction counts as spending
    pub fn is_expense(&self) -> bool {
        self.amount > 0.0
    }

    /// Check the record invariant: finite amount, configured category
    pub fn validate(&self, config: &EngineConfig) -> Result<()> {
        if !self.amount.is_finite() {
            return Err(Error::InvalidData(format!(
                "transaction {} has non-finite amount",
                self.id
            )));
        }
        if !config.categories.contains(&self.category) {
            return Err(Error::InvalidData(format!(
                "transaction {} has unknown category '{}'",
                self.id, self.category
            )));
        }
        Ok(())
    }
}
