//! Frozen classifier parameters
//!
//! The risk predictor consumes a logistic-regression model trained
//! elsewhere. Its parameters arrive as a small JSON artifact:
//!
//! ```json
//! {
//!   "features": ["delivery_ratio", "volatility", "anomaly_count", "budget_breach_count"],
//!   "weights": [3.1, 1.4, 0.2, 0.5],
//!   "bias": -2.0,
//!   "feature_means": [0.3, 0.6, 2.0, 0.5],
//!   "feature_scales": [0.2, 0.4, 2.5, 0.8],
//!   "trained_at": "2026-01-15"
//! }
//! ```
//!
//! Means and scales are optional; when present, inputs are standardized as
//! `(x - mean) / scale` before the dot product. Parameters are loaded once
//! and never mutated, so a single value can back any number of predictors.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::types::RiskFeature;
use crate::error::{Error, Result};

/// Number of classifier inputs
pub const FEATURE_COUNT: usize = RiskFeature::ALL.len();

/// Linear classifier parameters in `RiskFeature::ALL` order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierParams {
    features: Vec<String>,
    weights: Vec<f64>,
    bias: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feature_means: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feature_scales: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    trained_at: Option<String>,
}

impl ClassifierParams {
    /// Unscaled parameters over the standard feature order
    pub fn new(weights: [f64; FEATURE_COUNT], bias: f64) -> Self {
        Self {
            features: RiskFeature::ALL
                .iter()
                .map(|f| f.as_str().to_string())
                .collect(),
            weights: weights.to_vec(),
            bias,
            feature_means: None,
            feature_scales: None,
            trained_at: None,
        }
    }

    pub fn with_scaling(
        mut self,
        means: [f64; FEATURE_COUNT],
        scales: [f64; FEATURE_COUNT],
    ) -> Self {
        self.feature_means = Some(means.to_vec());
        self.feature_scales = Some(scales.to_vec());
        self
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn trained_at(&self) -> Option<&str> {
        self.trained_at.as_deref()
    }

    /// Read and validate an artifact
    ///
    /// Every failure is reported as `ModelUnavailable`, which callers treat
    /// as "use the heuristic".
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::ModelUnavailable(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    /// Parse and validate artifact JSON
    pub fn from_json_str(content: &str) -> Result<Self> {
        let params: ClassifierParams = serde_json::from_str(content)
            .map_err(|e| Error::ModelUnavailable(format!("malformed artifact: {}", e)))?;
        params.validate()?;
        Ok(params)
    }

    /// Feature names and order, lengths, and finiteness
    pub fn validate(&self) -> Result<()> {
        let expected: Vec<&str> = RiskFeature::ALL.iter().map(|f| f.as_str()).collect();
        if self.features.iter().map(String::as_str).ne(expected.iter().copied()) {
            return Err(unavailable(format!(
                "feature list {:?} does not match {:?}",
                self.features, expected
            )));
        }
        check_vector("weights", &self.weights)?;
        if !self.bias.is_finite() {
            return Err(unavailable("bias is not finite"));
        }

        match (&self.feature_means, &self.feature_scales) {
            (None, None) => {}
            (Some(means), Some(scales)) => {
                check_vector("feature_means", means)?;
                check_vector("feature_scales", scales)?;
                if scales.iter().any(|s| s.abs() < f64::EPSILON) {
                    return Err(unavailable("feature_scales contains zero"));
                }
            }
            _ => {
                return Err(unavailable(
                    "feature_means and feature_scales must be given together",
                ))
            }
        }
        Ok(())
    }

    /// Standardize a raw feature vector (identity without scaling)
    ///
    /// Entries without a matching mean and scale pass through unchanged.
    pub fn transform(&self, raw: [f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT] {
        let mut scaled = raw;
        if let (Some(means), Some(scales)) = (&self.feature_means, &self.feature_scales) {
            for (value, (mean, scale)) in scaled.iter_mut().zip(means.iter().zip(scales)) {
                *value = (*value - mean) / scale;
            }
        }
        scaled
    }

    /// Per-feature terms `w_i * x_i` of the logit (0.0 where no weight exists)
    pub fn contributions(&self, scaled: &[f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT] {
        let mut out = [0.0; FEATURE_COUNT];
        for (slot, (weight, value)) in out.iter_mut().zip(self.weights.iter().zip(scaled)) {
            *slot = weight * value;
        }
        out
    }
}

fn check_vector(name: &str, values: &[f64]) -> Result<()> {
    if values.len() != FEATURE_COUNT {
        return Err(unavailable(format!(
            "{} has {} entries, expected {}",
            name,
            values.len(),
            FEATURE_COUNT
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(unavailable(format!("{} contains a non-finite value", name)));
    }
    Ok(())
}

fn unavailable(message: impl Into<String>) -> Error {
    Error::ModelUnavailable(message.into())
}

/// Default artifact location
pub fn default_model_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| {
        d.join("budget-nudge")
            .join("models")
            .join("overspend_model.json")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const VALID: &str = r#"{
        "features": ["delivery_ratio", "volatility", "anomaly_count", "budget_breach_count"],
        "weights": [3.0, 1.5, 0.25, 0.5],
        "bias": -2.0,
        "feature_means": [0.3, 0.6, 2.0, 0.5],
        "feature_scales": [0.2, 0.4, 2.0, 1.0],
        "trained_at": "2026-01-15"
    }"#;

    #[test]
    fn test_parse_valid_artifact() {
        let params = ClassifierParams::from_json_str(VALID).unwrap();
        assert_eq!(params.bias, -2.0);
        assert_eq!(params.trained_at.as_deref(), Some("2026-01-15"));

        let scaled = params.transform([0.5, 0.6, 4.0, 0.5]);
        assert!((scaled[0] - 1.0).abs() < 1e-12);
        assert_eq!(scaled[1], 0.0);
        assert_eq!(scaled[2], 1.0);
    }

    #[test]
    fn test_wrong_feature_order_is_unavailable() {
        let json = VALID.replace(
            r#"["delivery_ratio", "volatility""#,
            r#"["volatility", "delivery_ratio""#,
        );
        assert!(matches!(
            ClassifierParams::from_json_str(&json),
            Err(Error::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_zero_scale_is_unavailable() {
        let json = VALID.replace("[0.2, 0.4, 2.0, 1.0]", "[0.2, 0.0, 2.0, 1.0]");
        assert!(ClassifierParams::from_json_str(&json).is_err());
    }

    #[test]
    fn test_wrong_length_is_unavailable() {
        let params = ClassifierParams {
            weights: vec![1.0, 2.0],
            ..ClassifierParams::new([0.0; 4], 0.0)
        };
        assert!(matches!(params.validate(), Err(Error::ModelUnavailable(_))));
    }

    #[test]
    fn test_half_scaling_is_unavailable() {
        let mut params = ClassifierParams::new([1.0; 4], 0.0);
        params.feature_means = Some(vec![0.0; 4]);
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_malformed_and_missing_files() {
        assert!(matches!(
            ClassifierParams::from_json_str("{not json"),
            Err(Error::ModelUnavailable(_))
        ));

        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            ClassifierParams::load(&dir.path().join("missing.json")),
            Err(Error::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", VALID).unwrap();
        let params = ClassifierParams::load(file.path()).unwrap();
        assert_eq!(params.weights, vec![3.0, 1.5, 0.25, 0.5]);
    }

    #[test]
    fn test_unscaled_transform_is_identity() {
        let params = ClassifierParams::new([1.0, 2.0, 3.0, 4.0], 0.5);
        assert_eq!(params.transform([0.1, 0.2, 3.0, 1.0]), [0.1, 0.2, 3.0, 1.0]);
        assert_eq!(
            params.contributions(&[1.0, 1.0, 1.0, 1.0]),
            [1.0, 2.0, 3.0, 4.0]
        );
    }

    #[test]
    fn test_short_vectors_never_panic() {
        // Deserializing directly skips validation
        let params: ClassifierParams = serde_json::from_str(
            r#"{"features": ["delivery_ratio", "volatility"], "weights": [2.0, 3.0], "bias": 0.0,
                "feature_means": [1.0], "feature_scales": [2.0]}"#,
        )
        .unwrap();
        assert!(params.validate().is_err());

        let scaled = params.transform([3.0, 1.0, 1.0, 1.0]);
        assert_eq!(scaled, [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(params.contributions(&scaled), [2.0, 3.0, 0.0, 0.0]);
    }
}
