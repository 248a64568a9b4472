//! Analytics aggregator - runs every component over one transaction set
//!
//! The aggregator owns no mutable state. Each call validates its input once,
//! hands the same slice to every component, and packages the results into a
//! fresh snapshot, so concurrent calls never observe each other.

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::models::Transaction;

use super::anomaly::AnomalyDetector;
use super::compare::{compare_scores, compare_snapshots};
use super::health_score::HealthScoreCalculator;
use super::nudge::NudgeEngine;
use super::risk::RiskPredictor;
use super::summary::SpendingSummary;
use super::types::{AnalyticsSnapshot, RiskFeatures};

/// Single entry point of the engine
#[derive(Debug, Clone)]
pub struct AnalyticsAggregator {
    config: EngineConfig,
    detector: AnomalyDetector,
    calculator: HealthScoreCalculator,
    predictor: RiskPredictor,
    nudges: NudgeEngine,
}

impl AnalyticsAggregator {
    /// Build an aggregator; fails only for an invalid configuration
    ///
    /// `config.risk` replaces whatever cut points and materiality the
    /// predictor was built with, so one config governs every component.
    pub fn new(config: EngineConfig, predictor: RiskPredictor) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            detector: AnomalyDetector::new(&config.anomaly),
            calculator: HealthScoreCalculator::new(&config),
            predictor: predictor.with_config(&config.risk),
            nudges: NudgeEngine::new(),
            config,
        })
    }

    /// Aggregator using the heuristic risk model
    pub fn with_heuristic(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let predictor = RiskPredictor::heuristic(&config.risk)?;
        Self::new(config, predictor)
    }

    /// Aggregator loading the classifier artifact at `model_path` (or the
    /// default location), falling back to the heuristic
    pub fn from_config(config: EngineConfig, model_path: Option<&Path>) -> Result<Self> {
        config.validate()?;
        let predictor = RiskPredictor::from_artifact(model_path, &config.risk)?;
        Self::new(config, predictor)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn predictor(&self) -> &RiskPredictor {
        &self.predictor
    }

    /// Analyse one user's transactions
    pub fn analyze(&self, transactions: &[Transaction]) -> AnalyticsSnapshot {
        self.run(transactions, None)
    }

    /// Analyse and compare against an earlier snapshot
    pub fn analyze_with_previous(
        &self,
        transactions: &[Transaction],
        previous: &AnalyticsSnapshot,
    ) -> AnalyticsSnapshot {
        self.run(transactions, Some(previous))
    }

    fn run(
        &self,
        transactions: &[Transaction],
        previous: Option<&AnalyticsSnapshot>,
    ) -> AnalyticsSnapshot {
        let valid = self.validated(transactions);
        let skipped_transactions = transactions.len() - valid.len();

        let user_id = valid.first().map(|t| t.user_id);
        if let Some(uid) = user_id {
            if valid.iter().any(|t| t.user_id != uid) {
                warn!(
                    user_id = uid,
                    "Transaction set spans more than one user, analysing it as one"
                );
            }
        }

        let anomalies = self.detector.detect(&valid);
        debug!(count = anomalies.len(), "Stage complete: anomalies");

        let health = self.calculator.score(&valid, &anomalies);
        debug!(overall = health.overall, "Stage complete: health score");

        let risk = if health.insufficient_data {
            self.predictor.no_data()
        } else {
            self.predictor
                .predict(&RiskFeatures::extract(&health, &anomalies))
        };
        debug!(probability = risk.probability, "Stage complete: risk");

        let score_delta = previous.map(|p| compare_scores(&p.health, &health));
        let nudges =
            self.nudges
                .generate_with_delta(&health, &anomalies, &risk, score_delta.as_ref());
        // The nudge engine never returns an empty list
        let primary_nudge = nudges[0].clone();
        debug!(count = nudges.len(), "Stage complete: nudges");

        let summary = SpendingSummary::from_transactions(&valid, &self.config)
            .unwrap_or_else(|e| {
                warn!(error = %e, "Spending summary unavailable");
                SpendingSummary::default()
            });

        let mut snapshot = AnalyticsSnapshot {
            user_id,
            as_of: valid.iter().map(|t| t.date).max(),
            dataset_fingerprint: fingerprint(&valid),
            transaction_count: valid.len(),
            skipped_transactions,
            health,
            anomalies,
            risk,
            nudges,
            primary_nudge,
            summary,
            delta: None,
        };
        snapshot.delta = previous.map(|p| compare_snapshots(p, &snapshot));

        info!(
            transactions = snapshot.transaction_count,
            skipped = snapshot.skipped_transactions,
            score = snapshot.health.display_score(),
            grade = snapshot.health.grade.as_str(),
            risk = snapshot.risk.level.as_str(),
            anomalies = snapshot.anomalies.len(),
            "Analysis complete"
        );
        snapshot
    }

    /// Drop (and log) records that break the transaction invariant
    fn validated(&self, transactions: &[Transaction]) -> Vec<Transaction> {
        transactions
            .iter()
            .filter(|tx| match tx.validate(&self.config) {
                Ok(()) => true,
                Err(e) => {
                    warn!(transaction_id = tx.id, error = %e, "Skipping invalid transaction");
                    false
                }
            })
            .cloned()
            .collect()
    }
}

/// SHA-256 over the transactions in (date, id) order
fn fingerprint(transactions: &[Transaction]) -> String {
    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));

    let mut hasher = Sha256::new();
    for tx in ordered {
        hasher.update(tx.id.to_be_bytes());
        hasher.update(tx.user_id.to_be_bytes());
        hasher.update(tx.date.to_string().as_bytes());
        hasher.update(tx.category.as_bytes());
        hasher.update(tx.amount.to_be_bytes());
        hasher.update(tx.source.as_str().as_bytes());
        hasher.update(tx.description.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::{NudgeKind, RiskLevel};
    use crate::error::Error;
    use chrono::NaiveDate;

    fn tx(id: i64, day: u32, category: &str, amount: f64) -> Transaction {
        Transaction::new(
            id,
            5,
            NaiveDate::from_ymd_opt(2026, 7, day).unwrap(),
            category,
            amount,
        )
    }

    fn aggregator() -> AnalyticsAggregator {
        AnalyticsAggregator::with_heuristic(EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_aggregator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AnalyticsAggregator>();
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.weights.volatility = 0.9;
        assert!(matches!(
            AnalyticsAggregator::with_heuristic(config),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_invalid_transactions_are_skipped() {
        let txs = vec![
            tx(1, 1, "Groceries", 50.0),
            tx(2, 2, "Yachts", 5_000.0),
            tx(3, 3, "Groceries", f64::INFINITY),
            tx(4, 4, "Groceries", 55.0),
        ];
        let snapshot = aggregator().analyze(&txs);
        assert_eq!(snapshot.transaction_count, 2);
        assert_eq!(snapshot.skipped_transactions, 2);
        assert_eq!(snapshot.summary.total_spent, 105.0);
        assert_eq!(snapshot.as_of, NaiveDate::from_ymd_opt(2026, 7, 4));
    }

    #[test]
    fn test_empty_input() {
        let snapshot = aggregator().analyze(&[]);
        assert_eq!(snapshot.user_id, None);
        assert_eq!(snapshot.as_of, None);
        assert_eq!(snapshot.risk.level, RiskLevel::Low);
        assert_eq!(snapshot.risk.probability, 0.0);
        assert_eq!(snapshot.primary_nudge.kind, NudgeKind::InsufficientData);
        assert!(snapshot.delta.is_none());
    }

    #[test]
    fn test_fingerprint_ignores_input_order() {
        let a = vec![tx(1, 1, "Groceries", 50.0), tx(2, 2, "Shopping", 70.0)];
        let b = vec![a[1].clone(), a[0].clone()];
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a).len(), 64);

        let c = vec![tx(1, 1, "Groceries", 50.01), tx(2, 2, "Shopping", 70.0)];
        assert_ne!(fingerprint(&a), fingerprint(&c));
    }

    #[test]
    fn test_primary_nudge_is_first() {
        let txs: Vec<_> = (1..=5).map(|d| tx(d as i64, d, "Food Delivery", 60.0)).collect();
        let snapshot = aggregator().analyze(&txs);
        assert_eq!(snapshot.primary_nudge, snapshot.nudges[0]);
        assert_eq!(snapshot.user_id, Some(5));
    }

    #[test]
    fn test_previous_snapshot_produces_delta() {
        let agg = aggregator();
        let before: Vec<_> = (1..=5).map(|d| tx(d as i64, d, "Food Delivery", 60.0)).collect();
        let after: Vec<_> = (1..=5).map(|d| tx(d as i64, d, "Groceries", 60.0)).collect();

        let previous = agg.analyze(&before);
        let current = agg.analyze_with_previous(&after, &previous);
        let delta = current.delta.as_ref().unwrap();
        assert!(delta.score.change > 5.0);
        assert_eq!(current.primary_nudge.kind, NudgeKind::Improvement);
        assert!(delta.risk_probability_change < 0.0);
    }

    #[test]
    fn test_config_cutoffs_override_predictor() {
        let mut config = EngineConfig::default();
        config.risk.moderate_cutoff = 0.01;
        config.risk.high_cutoff = 0.02;

        let agg = AnalyticsAggregator::new(config.clone(), RiskPredictor::default()).unwrap();
        assert_eq!(agg.predictor().config(), &config.risk);

        let txs: Vec<_> = (1..=5).map(|d| tx(d as i64, d, "Groceries", 60.0)).collect();
        assert_eq!(agg.analyze(&txs).risk.level, RiskLevel::High);
        assert_eq!(aggregator().analyze(&txs).risk.level, RiskLevel::Low);
    }

    #[test]
    fn test_inverted_cutoffs_are_rejected() {
        let mut config = EngineConfig::default();
        config.risk.moderate_cutoff = 0.9;
        config.risk.high_cutoff = 0.1;
        assert!(matches!(
            AnalyticsAggregator::new(config, RiskPredictor::default()),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_dates_near_calendar_start_do_not_panic() {
        let early = Transaction::new(1, 5, NaiveDate::MIN, "Groceries", 40.0);
        let snapshot = aggregator().analyze(&[early]);
        assert_eq!(snapshot.transaction_count, 1);
        assert_eq!(snapshot.summary, SpendingSummary::default());
    }
}
