//! Overspend risk prediction
//!
//! A logistic model over four behavioral features. Parameters come from a
//! trained artifact when one is available; otherwise a fixed heuristic
//! weighting of the same features is used, and the prediction says so.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::classifier::{self, ClassifierParams, FEATURE_COUNT};
use crate::config::RiskConfig;
use crate::error::{Error, Result};
use crate::stats;

use super::types::{
    AnomalyRecord, HealthScoreResult, Provenance, RiskFactor, RiskFeature, RiskFeatures,
    RiskLevel, RiskPrediction, Severity,
};

/// Fallback weights, in `RiskFeature::ALL` order
pub const HEURISTIC_WEIGHTS: [f64; FEATURE_COUNT] = [4.0, 2.0, 0.35, 0.6];

/// Fallback intercept
pub const HEURISTIC_BIAS: f64 = -2.5;

/// Shown when nothing is pushing risk up
const NO_FACTOR_RECOMMENDATION: &str = "Keep up the excellent spending habits!";

/// Appended to factor-specific advice
const GENERAL_RECOMMENDATIONS: [&str; 2] = [
    "Enable transaction notifications for better awareness",
    "Set specific savings goals to stay motivated",
];

impl RiskFeatures {
    /// Build the classifier input from score metrics and anomaly records
    pub fn extract(health: &HealthScoreResult, anomalies: &[AnomalyRecord]) -> Self {
        let statistical = anomalies.iter().filter(|a| a.kind.is_statistical()).count();
        let breaches = anomalies.len() - statistical;
        Self::new(
            health.metrics.delivery_ratio,
            health.metrics.volatility,
            statistical as f64,
            breaches as f64,
        )
    }
}

/// Logistic overspend-risk model
#[derive(Debug, Clone)]
pub struct RiskPredictor {
    params: Arc<ClassifierParams>,
    provenance: Provenance,
    config: RiskConfig,
}

impl Default for RiskPredictor {
    fn default() -> Self {
        Self {
            params: Arc::new(ClassifierParams::new(HEURISTIC_WEIGHTS, HEURISTIC_BIAS)),
            provenance: Provenance::Heuristic,
            config: RiskConfig::default(),
        }
    }
}

impl RiskPredictor {
    /// Predictor backed by trained parameters
    ///
    /// Parameters failing validation are `ModelUnavailable`; bad cut points
    /// are `InvalidConfiguration`.
    pub fn with_params(params: Arc<ClassifierParams>, config: &RiskConfig) -> Result<Self> {
        params.validate()?;
        config.validate()?;
        Ok(Self {
            params,
            provenance: Provenance::Model,
            config: config.clone(),
        })
    }

    /// Predictor backed by the built-in weights
    pub fn heuristic(config: &RiskConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            ..Self::default()
        })
    }

    /// Load the artifact at `path` (or the default location), falling back
    /// to the heuristic when it is missing or invalid
    ///
    /// Only an invalid `config` is an error.
    pub fn from_artifact(path: Option<&Path>, config: &RiskConfig) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match classifier::default_model_path() {
                Some(p) if p.exists() => p,
                _ => {
                    debug!("No classifier artifact installed, using heuristic risk model");
                    return Self::heuristic(config);
                }
            },
        };

        let loaded = ClassifierParams::load(&path)
            .and_then(|params| Self::with_params(Arc::new(params), config));
        match loaded {
            Ok(predictor) => {
                debug!(
                    path = %path.display(),
                    trained_at = predictor.params.trained_at().unwrap_or("unknown"),
                    "Loaded classifier artifact"
                );
                Ok(predictor)
            }
            Err(e @ Error::InvalidConfiguration(_)) => Err(e),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Classifier artifact unavailable, using heuristic risk model"
                );
                Self::heuristic(config)
            }
        }
    }

    /// Same model, discretized with `config` instead
    ///
    /// The caller guarantees `config` is valid.
    pub(crate) fn with_config(self, config: &RiskConfig) -> Self {
        Self {
            config: config.clone(),
            ..self
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn params(&self) -> &ClassifierParams {
        &self.params
    }

    /// Estimate overspend probability for a feature vector
    pub fn predict(&self, features: &RiskFeatures) -> RiskPrediction {
        let raw = features.as_array().map(sanitize);
        let scaled = self.params.transform(raw);
        let contributions = self.params.contributions(&scaled);

        let logit = self.params.bias() + contributions.iter().sum::<f64>();
        let probability = stats::sigmoid(logit);
        let level = self.level_for(probability);

        let mut factors: Vec<RiskFactor> = RiskFeature::ALL
            .iter()
            .zip(raw.iter().zip(contributions))
            .filter(|(_, (_, contribution))| *contribution > self.config.materiality)
            .map(|(feature, (value, contribution))| {
                self.factor(*feature, *value, contribution)
            })
            .collect();
        // Stable sort keeps feature order for equal contributions
        factors.sort_by(|a, b| b.contribution.total_cmp(&a.contribution));

        debug!(
            probability,
            level = level.as_str(),
            provenance = self.provenance.as_str(),
            factors = factors.len(),
            "Risk predicted"
        );

        RiskPrediction {
            probability,
            level,
            factors,
            features: RiskFeatures::new(raw[0], raw[1], raw[2], raw[3]),
            provenance: self.provenance,
        }
    }

    /// Prediction for a user with no spending to analyse
    pub fn no_data(&self) -> RiskPrediction {
        RiskPrediction {
            probability: 0.0,
            level: RiskLevel::Low,
            factors: vec![],
            features: RiskFeatures::default(),
            provenance: self.provenance,
        }
    }

    pub fn level_for(&self, probability: f64) -> RiskLevel {
        if probability >= self.config.high_cutoff {
            RiskLevel::High
        } else if probability >= self.config.moderate_cutoff {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }

    fn factor(&self, feature: RiskFeature, value: f64, contribution: f64) -> RiskFactor {
        let severity = if contribution >= 2.0 * self.config.materiality {
            Severity::High
        } else {
            Severity::Moderate
        };
        RiskFactor {
            feature,
            value,
            contribution,
            severity,
            rationale: rationale(feature, value),
            recommendation: recommendation(feature).to_string(),
        }
    }
}

/// NaN becomes 0, infinities saturate
fn sanitize(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(f64::MIN, f64::MAX)
    }
}

fn rationale(feature: RiskFeature, value: f64) -> String {
    match feature {
        RiskFeature::DeliveryRatio => {
            format!("{:.1}% of spending goes to food delivery", value * 100.0)
        }
        RiskFeature::Volatility => format!(
            "Daily spending swings by {:.0}% around its average",
            value * 100.0
        ),
        RiskFeature::AnomalyCount => format!("{:.0} unusual transactions detected", value),
        RiskFeature::BudgetBreachCount => {
            format!("{:.0} periods ran above your usual weekly spend", value)
        }
    }
}

fn recommendation(feature: RiskFeature) -> &'static str {
    match feature {
        RiskFeature::DeliveryRatio => "Reduce food delivery orders by cooking at home more often",
        RiskFeature::Volatility => "Create a monthly budget and stick to it for consistency",
        RiskFeature::AnomalyCount => {
            "Review large or unusual transactions to ensure they're necessary"
        }
        RiskFeature::BudgetBreachCount => "Set spending alerts to avoid exceeding your budget",
    }
}

/// Factor-specific advice followed by general tips
pub fn recommendations(prediction: &RiskPrediction) -> Vec<String> {
    if prediction.factors.is_empty() {
        return vec![NO_FACTOR_RECOMMENDATION.to_string()];
    }
    prediction
        .factors
        .iter()
        .map(|f| f.recommendation.clone())
        .chain(GENERAL_RECOMMENDATIONS.iter().map(|s| s.to_string()))
        .collect()
}
