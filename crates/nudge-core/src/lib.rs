//! Budget Nudge Core Library
//!
//! Behavioral analytics over one user's transactions:
//! - Statistical anomaly detection (amount, category, frequency, overspend periods)
//! - Weighted financial health score with letter grade
//! - Logistic overspend-risk prediction with heuristic fallback
//! - Rule-table behavioral nudges
//! - Snapshot comparison, spending summaries and chat intent routing
//!
//! The engine is synchronous and stateless. Storage, ingestion and
//! presentation live with the caller.

pub mod analysis;
pub mod chat;
pub mod classifier;
pub mod config;
pub mod error;
pub mod models;
pub mod stats;

pub use analysis::{
    compare_scores, compare_snapshots, recommendations, AnalyticsAggregator, AnalyticsSnapshot,
    AnomalyDetector, AnomalyKind, AnomalyRecord, AnomalySubject, Grade, GradeChange,
    HealthScoreCalculator, HealthScoreResult, HealthStatus, Nudge, NudgeEngine, NudgeKind,
    Provenance, RiskFactor, RiskFeature, RiskFeatures, RiskLevel, RiskPrediction, RiskPredictor,
    ScoreComponents, ScoreDelta, ScoreMetrics, Severity, SnapshotDelta, SpendingSummary, Tone,
    Trend,
};
pub use chat::{ChatReply, ChatResponder, Intent};
pub use classifier::{default_model_path, ClassifierParams};
pub use config::{default_config_path, AnomalyConfig, EngineConfig, RiskConfig, ScoreWeights};
pub use error::{Error, Result};
pub use models::{Transaction, TransactionSource, DEFAULT_CATEGORIES};
