//! Engine configuration
//!
//! A single validated object carries every tunable the engine uses: the
//! anomaly threshold, component weights, risk cut points, and the category
//! enumeration.
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. Explicit path, or the override in the data dir
//!    (~/.local/share/budget-nudge/config/engine.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Validation runs on every path. A config that fails validation never
//! reaches the analysis code.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{DEFAULT_CATEGORIES, DEFAULT_DELIVERY_CATEGORIES};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/engine.toml");

/// Allowed drift when checking that weights sum to 1.0
const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Anomaly detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Z-score threshold (tau)
    pub z_threshold: f64,
    /// Severity is "high" above `high_severity_multiplier * z_threshold`
    pub high_severity_multiplier: f64,
    /// Rolling window length for overspend periods
    pub overspend_window_days: usize,
    /// Window total must exceed this multiple of the trailing average
    pub overspend_ratio: f64,
}

impl AnomalyConfig {
    /// Deviation above which a record is high severity
    pub fn high_severity_cutoff(&self) -> f64 {
        self.z_threshold * self.high_severity_multiplier
    }
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            z_threshold: 2.0,
            high_severity_multiplier: 1.5,
            overspend_window_days: 7,
            overspend_ratio: 1.2,
        }
    }
}

/// Health score component weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub delivery_ratio: f64,
    pub volatility: f64,
    pub anomaly_frequency: f64,
    pub overspending: f64,
}

impl ScoreWeights {
    pub fn as_array(&self) -> [f64; 4] {
        [
            self.delivery_ratio,
            self.volatility,
            self.anomaly_frequency,
            self.overspending,
        ]
    }

    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            delivery_ratio: 0.30,
            volatility: 0.25,
            anomaly_frequency: 0.25,
            overspending: 0.20,
        }
    }
}

/// Risk discretization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Probabilities at or above this are at least moderate
    pub moderate_cutoff: f64,
    /// Probabilities at or above this are high
    pub high_cutoff: f64,
    /// Minimum contribution for a feature to be reported as a risk factor
    pub materiality: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            moderate_cutoff: 0.30,
            high_cutoff: 0.60,
            materiality: 0.25,
        }
    }
}

impl RiskConfig {
    /// Cut points must satisfy `0 < moderate < high <= 1`; materiality is non-negative
    pub fn validate(&self) -> Result<()> {
        let cutoffs_ok = self.moderate_cutoff.is_finite()
            && self.high_cutoff.is_finite()
            && self.moderate_cutoff > 0.0
            && self.moderate_cutoff < self.high_cutoff
            && self.high_cutoff <= 1.0;
        if !cutoffs_ok {
            return Err(invalid(format!(
                "risk cut points must satisfy 0 < moderate < high <= 1, got {} / {}",
                self.moderate_cutoff, self.high_cutoff
            )));
        }
        if !self.materiality.is_finite() || self.materiality < 0.0 {
            return Err(invalid("risk.materiality must be a non-negative number"));
        }
        Ok(())
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub anomaly: AnomalyConfig,
    pub weights: ScoreWeights,
    pub risk: RiskConfig,
    /// Every category a transaction may carry
    pub categories: Vec<String>,
    /// Categories whose spend counts toward the delivery ratio
    pub delivery_categories: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            anomaly: AnomalyConfig::default(),
            weights: ScoreWeights::default(),
            risk: RiskConfig::default(),
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            delivery_categories: DEFAULT_DELIVERY_CATEGORIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

impl EngineConfig {
    /// Load configuration (explicit or data-dir override first, then embedded default)
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let content = match override_path {
            Some(path) if path.exists() => fs::read_to_string(path)?,
            Some(path) => {
                tracing::warn!(
                    path = %path.display(),
                    "Config file not found, using embedded defaults"
                );
                DEFAULT_CONFIG.to_string()
            }
            None => match default_config_path() {
                Some(path) if path.exists() => fs::read_to_string(&path)?,
                _ => DEFAULT_CONFIG.to_string(),
            },
        };

        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML content
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;
        let config = raw.into_config();
        config.validate()?;
        Ok(config)
    }

    /// The embedded default configuration, parsed
    pub fn embedded() -> Result<Self> {
        Self::from_toml_str(DEFAULT_CONFIG)
    }

    /// Check every invariant the scoring math relies on
    pub fn validate(&self) -> Result<()> {
        let a = &self.anomaly;
        if !a.z_threshold.is_finite() || a.z_threshold <= 0.0 {
            return Err(invalid(format!(
                "anomaly.z_threshold must be a positive number, got {}",
                a.z_threshold
            )));
        }
        if !a.high_severity_multiplier.is_finite() || a.high_severity_multiplier < 1.0 {
            return Err(invalid(format!(
                "anomaly.high_severity_multiplier must be >= 1.0, got {}",
                a.high_severity_multiplier
            )));
        }
        if a.overspend_window_days == 0 {
            return Err(invalid("anomaly.overspend_window_days must be at least 1"));
        }
        if !a.overspend_ratio.is_finite() || a.overspend_ratio < 1.0 {
            return Err(invalid(format!(
                "anomaly.overspend_ratio must be >= 1.0, got {}",
                a.overspend_ratio
            )));
        }

        let weights = self.weights.as_array();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(invalid("weights must be finite and non-negative"));
        }
        let sum = self.weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(invalid(format!("weights must sum to 1.0, got {}", sum)));
        }

        self.risk.validate()?;

        if self.categories.is_empty() {
            return Err(invalid("at least one category is required"));
        }
        for (i, category) in self.categories.iter().enumerate() {
            if self.categories[..i].contains(category) {
                return Err(invalid(format!("duplicate category '{}'", category)));
            }
        }
        if let Some(unknown) = self
            .delivery_categories
            .iter()
            .find(|c| !self.categories.contains(c))
        {
            return Err(invalid(format!(
                "delivery category '{}' is not in the category list",
                unknown
            )));
        }

        Ok(())
    }

    /// Whether spend in `category` counts as delivery spend
    pub fn is_delivery(&self, category: &str) -> bool {
        self.delivery_categories.iter().any(|c| c == category)
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidConfiguration(message.into())
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("budget-nudge").join("config").join("engine.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    anomaly: Option<RawAnomaly>,
    weights: Option<RawWeights>,
    risk: Option<RawRisk>,
    categories: Option<RawCategories>,
}

#[derive(Debug, Deserialize)]
struct RawAnomaly {
    z_threshold: Option<f64>,
    high_severity_multiplier: Option<f64>,
    overspend_window_days: Option<usize>,
    overspend_ratio: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawWeights {
    delivery_ratio: Option<f64>,
    volatility: Option<f64>,
    anomaly_frequency: Option<f64>,
    overspending: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawRisk {
    moderate_cutoff: Option<f64>,
    high_cutoff: Option<f64>,
    materiality: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawCategories {
    all: Option<Vec<String>>,
    delivery: Option<Vec<String>>,
}

impl RawConfig {
    /// Apply the raw values over the defaults
    fn into_config(self) -> EngineConfig {
        let mut config = EngineConfig::default();

        if let Some(anomaly) = self.anomaly {
            if let Some(v) = anomaly.z_threshold {
                config.anomaly.z_threshold = v;
            }
            if let Some(v) = anomaly.high_severity_multiplier {
                config.anomaly.high_severity_multiplier = v;
            }
            if let Some(v) = anomaly.overspend_window_days {
                config.anomaly.overspend_window_days = v;
            }
            if let Some(v) = anomaly.overspend_ratio {
                config.anomaly.overspend_ratio = v;
            }
        }

        if let Some(weights) = self.weights {
            if let Some(v) = weights.delivery_ratio {
                config.weights.delivery_ratio = v;
            }
            if let Some(v) = weights.volatility {
                config.weights.volatility = v;
            }
            if let Some(v) = weights.anomaly_frequency {
                config.weights.anomaly_frequency = v;
            }
            if let Some(v) = weights.overspending {
                config.weights.overspending = v;
            }
        }

        if let Some(risk) = self.risk {
            if let Some(v) = risk.moderate_cutoff {
                config.risk.moderate_cutoff = v;
            }
            if let Some(v) = risk.high_cutoff {
                config.risk.high_cutoff = v;
            }
            if let Some(v) = risk.materiality {
                config.risk.materiality = v;
            }
        }

        if let Some(categories) = self.categories {
            if let Some(all) = categories.all {
                config.categories = all;
            }
            if let Some(delivery) = categories.delivery {
                config.delivery_categories = delivery;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_embedded_config_matches_defaults() {
        let config = EngineConfig::embedded().unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.anomaly.z_threshold, 2.0);
        assert_eq!(config.risk.high_cutoff, 0.60);
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!((ScoreWeights::default().sum() - 1.0).abs() < 1e-12);
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [anomaly]
            z_threshold = 2.5
            "#,
        )
        .unwrap();
        assert_eq!(config.anomaly.z_threshold, 2.5);
        assert_eq!(config.anomaly.overspend_window_days, 7);
        assert_eq!(config.weights, ScoreWeights::default());
    }

    #[test]
    fn test_weights_not_summing_to_one_rejected() {
        let result = EngineConfig::from_toml_str(
            r#"
            [weights]
            delivery_ratio = 0.5
            "#,
        );
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_non_positive_threshold_rejected() {
        let mut config = EngineConfig::default();
        config.anomaly.z_threshold = 0.0;
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfiguration(_))
        ));

        config.anomaly.z_threshold = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_risk_cutoffs_rejected() {
        let mut config = EngineConfig::default();
        config.risk.moderate_cutoff = 0.7;
        config.risk.high_cutoff = 0.6;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_delivery_category_must_be_known() {
        let mut config = EngineConfig::default();
        config.delivery_categories.push("Takeout".to_string());
        assert!(config.validate().is_err());

        config.categories.push("Takeout".to_string());
        assert!(config.validate().is_ok());
        assert!(config.is_delivery("Takeout"));
        assert!(!config.is_delivery("Groceries"));
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let mut config = EngineConfig::default();
        config.categories.push("Groceries".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[risk]\nmoderate_cutoff = 0.25\nhigh_cutoff = 0.5\n\n[categories]\nall = [\"Food Delivery\", \"Rent\"]"
        )
        .unwrap();

        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.risk.moderate_cutoff, 0.25);
        assert_eq!(config.categories.len(), 2);
        assert_eq!(config.delivery_categories, vec!["Food Delivery"]);
    }

    #[test]
    fn test_missing_override_falls_back_to_embedded() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = EngineConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        assert!(matches!(
            EngineConfig::from_toml_str("[anomaly\nz_threshold = "),
            Err(Error::Toml(_))
        ));
    }
}
