//! Financial health score
//!
//! Four component scores, each 0-100 with 100 as the best behavior, are
//! combined with the configured weights into one overall score:
//!
//! | Component         | Measures                                    |
//! |-------------------|---------------------------------------------|
//! | delivery_ratio    | share of spend in delivery categories       |
//! | volatility        | coefficient of variation of daily spend     |
//! | anomaly_frequency | anomaly records per expense                 |
//! | overspending      | count and severity of overspend periods     |
//!
//! Every curve is piecewise-linear, continuous, non-increasing in its
//! input, and clamped to [0, 100]. Components without enough data take
//! the neutral value.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::config::{EngineConfig, ScoreWeights};
use crate::models::Transaction;
use crate::stats;

use super::types::{
    AnomalyKind, AnomalyRecord, Grade, HealthScoreResult, HealthStatus, ScoreComponents,
    ScoreMetrics, Severity,
};

/// Component value used when there is nothing to measure
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Deterministic weighted scorer
#[derive(Debug, Clone)]
pub struct HealthScoreCalculator {
    weights: ScoreWeights,
    delivery_categories: Vec<String>,
}

impl Default for HealthScoreCalculator {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl HealthScoreCalculator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            weights: config.weights,
            delivery_categories: config.delivery_categories.clone(),
        }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Score the expenses in `transactions` given the detector's records
    pub fn score(
        &self,
        transactions: &[Transaction],
        anomalies: &[AnomalyRecord],
    ) -> HealthScoreResult {
        let expenses: Vec<&Transaction> = transactions.iter().filter(|t| t.is_expense()).collect();

        if expenses.is_empty() {
            return self.neutral();
        }

        let total: f64 = expenses.iter().map(|t| t.amount).sum();
        let delivery: f64 = expenses
            .iter()
            .filter(|t| self.delivery_categories.contains(&t.category))
            .map(|t| t.amount)
            .sum();
        let delivery_ratio = if total > 0.0 { delivery / total } else { 0.0 };

        let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for tx in &expenses {
            *daily.entry(tx.date).or_default() += tx.amount;
        }
        let daily_totals: Vec<f64> = daily.into_values().collect();
        let volatility = stats::coefficient_of_variation(&daily_totals);

        let anomaly_rate = anomalies.len() as f64 / expenses.len() as f64;
        let overspend_points = overspend_points(anomalies);

        let components = ScoreComponents {
            delivery_ratio: if total > 0.0 {
                delivery_score(delivery_ratio)
            } else {
                NEUTRAL_SCORE
            },
            volatility: if daily_totals.len() >= 2 {
                volatility_score(volatility)
            } else {
                NEUTRAL_SCORE
            },
            anomaly_frequency: anomaly_frequency_score(anomaly_rate),
            overspending: overspending_score(overspend_points),
        };

        let metrics = ScoreMetrics {
            delivery_ratio,
            volatility,
            anomaly_rate,
            overspend_points,
            expense_count: expenses.len(),
        };

        let result = self.assemble(components, metrics, false);
        debug!(
            overall = result.overall,
            delivery = components.delivery_ratio,
            volatility = components.volatility,
            anomaly_frequency = components.anomaly_frequency,
            overspending = components.overspending,
            "Health score computed"
        );
        result
    }

    /// Degenerate result for an empty expense set
    fn neutral(&self) -> HealthScoreResult {
        let components = ScoreComponents {
            delivery_ratio: NEUTRAL_SCORE,
            volatility: NEUTRAL_SCORE,
            anomaly_frequency: NEUTRAL_SCORE,
            overspending: NEUTRAL_SCORE,
        };
        let metrics = ScoreMetrics {
            delivery_ratio: 0.0,
            volatility: 0.0,
            anomaly_rate: 0.0,
            overspend_points: 0,
            expense_count: 0,
        };
        debug!("No expenses to score, using neutral components");
        self.assemble(components, metrics, true)
    }

    fn assemble(
        &self,
        components: ScoreComponents,
        metrics: ScoreMetrics,
        insufficient_data: bool,
    ) -> HealthScoreResult {
        let overall = stats::clamp_score(components.weighted_sum(&self.weights));
        HealthScoreResult {
            overall,
            components,
            weights: self.weights,
            metrics,
            grade: Grade::from_score(overall),
            status: HealthStatus::from_score(overall),
            insufficient_data,
        }
    }
}

/// 100 minus the delivery share as a percentage
pub fn delivery_score(delivery_ratio: f64) -> f64 {
    stats::clamp_score(100.0 - delivery_ratio * 100.0)
}

/// Decreasing map from the coefficient of variation of daily spend
pub fn volatility_score(cv: f64) -> f64 {
    let score = if cv <= 0.2 {
        100.0
    } else if cv <= 0.5 {
        100.0 - (cv - 0.2) / 0.3 * 20.0
    } else if cv <= 1.0 {
        80.0 - (cv - 0.5) / 0.5 * 40.0
    } else {
        40.0 - (cv - 1.0) * 30.0
    };
    stats::clamp_score(score)
}

/// Decreasing map from anomaly records per expense
pub fn anomaly_frequency_score(rate: f64) -> f64 {
    let score = if rate <= 0.0 {
        100.0
    } else if rate <= 0.05 {
        100.0 - rate / 0.05 * 10.0
    } else if rate <= 0.15 {
        90.0 - (rate - 0.05) / 0.10 * 40.0
    } else {
        50.0 - (rate - 0.15) * 200.0
    };
    stats::clamp_score(score)
}

/// 20 points off per penalty point
pub fn overspending_score(points: u32) -> f64 {
    stats::clamp_score(100.0 - 20.0 * points as f64)
}

/// One point per moderate overspend period, two per high
pub fn overspend_points(anomalies: &[AnomalyRecord]) -> u32 {
    anomalies
        .iter()
        .filter(|a| a.kind == AnomalyKind::OverspendPeriod)
        .map(|a| match a.severity {
            Severity::Moderate => 1,
            Severity::High => 2,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::AnomalySubject;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, day).unwrap()
    }

    fn period(severity: Severity) -> AnomalyRecord {
        AnomalyRecord {
            kind: AnomalyKind::OverspendPeriod,
            subject: AnomalySubject::Period {
                start: date(1),
                end: date(7),
            },
            score: 0.5,
            severity,
            observed: 150.0,
            expected: 100.0,
            category: None,
            detail: String::new(),
        }
    }

    #[test]
    fn test_empty_is_neutral() {
        let result = HealthScoreCalculator::default().score(&[], &[]);
        assert!(result.insufficient_data);
        assert_eq!(result.components.as_array(), [50.0; 4]);
        assert!((result.overall - 50.0).abs() < 1e-9);
        assert_eq!(result.grade, Grade::D);
    }

    #[test]
    fn test_single_expense_has_neutral_volatility() {
        let txs = vec![Transaction::new(1, 1, date(1), "Groceries", 40.0)];
        let result = HealthScoreCalculator::default().score(&txs, &[]);
        assert!(!result.insufficient_data);
        assert_eq!(result.components.volatility, NEUTRAL_SCORE);
        assert_eq!(result.components.delivery_ratio, 100.0);
    }

    #[test]
    fn test_delivery_component() {
        let txs = vec![
            Transaction::new(1, 1, date(1), "Food Delivery", 75.0),
            Transaction::new(2, 1, date(2), "Groceries", 25.0),
        ];
        let result = HealthScoreCalculator::default().score(&txs, &[]);
        assert!((result.metrics.delivery_ratio - 0.75).abs() < 1e-12);
        assert!((result.components.delivery_ratio - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_volatility_curve_is_continuous_and_decreasing() {
        assert_eq!(volatility_score(0.0), 100.0);
        assert_eq!(volatility_score(0.2), 100.0);
        assert!((volatility_score(0.5) - 80.0).abs() < 1e-9);
        assert!((volatility_score(1.0) - 40.0).abs() < 1e-9);
        assert_eq!(volatility_score(5.0), 0.0);

        let mut previous = f64::INFINITY;
        for i in 0..400 {
            let score = volatility_score(i as f64 * 0.01);
            assert!(score <= previous);
            previous = score;
        }
    }

    #[test]
    fn test_anomaly_curve() {
        assert_eq!(anomaly_frequency_score(0.0), 100.0);
        assert!((anomaly_frequency_score(0.05) - 90.0).abs() < 1e-9);
        assert!((anomaly_frequency_score(0.15) - 50.0).abs() < 1e-9);
        assert_eq!(anomaly_frequency_score(1.0), 0.0);
    }

    #[test]
    fn test_overspend_points_weight_severity() {
        let anomalies = vec![period(Severity::Moderate), period(Severity::High)];
        assert_eq!(overspend_points(&anomalies), 3);
        assert_eq!(overspending_score(3), 40.0);
        assert_eq!(overspending_score(10), 0.0);
    }

    #[test]
    fn test_overall_is_weighted_sum() {
        let txs: Vec<_> = (1..=9)
            .map(|d| {
                let category = if d % 3 == 0 { "Food Delivery" } else { "Groceries" };
                Transaction::new(d as i64, 1, date(d), category, 20.0 * d as f64)
            })
            .collect();
        let anomalies = vec![period(Severity::Moderate)];
        let result = HealthScoreCalculator::default().score(&txs, &anomalies);

        let expected = result.components.weighted_sum(&result.weights);
        assert!((result.overall - expected).abs() < 1e-9);
        assert!((0.0..=100.0).contains(&result.overall));
        assert_eq!(result.components.overspending, 80.0);
    }
}
