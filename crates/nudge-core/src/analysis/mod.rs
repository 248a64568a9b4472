//! Analysis engine - scores, anomalies, risk and nudges
//!
//! Turns one user's transactions into a single immutable
//! [`AnalyticsSnapshot`]. The pipeline is fixed:
//!
//! 1. [`AnomalyDetector`] flags outlying transactions, days and periods
//! 2. [`HealthScoreCalculator`] combines four component scores
//! 3. [`RiskPredictor`] estimates the probability of overspending
//! 4. [`NudgeEngine`] picks the most relevant behavioral messages
//!
//! [`AnalyticsAggregator`] runs the stages in that order over the same
//! validated transaction slice.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nudge_core::{AnalyticsAggregator, EngineConfig};
//!
//! let aggregator = AnalyticsAggregator::from_config(EngineConfig::load(None)?, None)?;
//! let snapshot = aggregator.analyze(&transactions);
//! println!("{} ({})", snapshot.health.display_score(), snapshot.health.grade);
//! ```

pub mod aggregator;
pub mod anomaly;
pub mod compare;
pub mod health_score;
pub mod nudge;
pub mod risk;
pub mod summary;
pub mod types;

pub use aggregator::AnalyticsAggregator;
pub use anomaly::AnomalyDetector;
pub use compare::{compare_scores, compare_snapshots};
pub use health_score::{HealthScoreCalculator, NEUTRAL_SCORE};
pub use nudge::NudgeEngine;
pub use risk::{recommendations, RiskPredictor};
pub use summary::{SpendingSummary, Trend};
pub use types::*;
