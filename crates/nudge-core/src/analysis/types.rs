//! Core types for the analysis engine
//!
//! Everything here is plain data: numbers, strings, dates and enums that
//! serialize with serde, so renderers never need to know how a value was
//! computed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::ScoreWeights;

use super::summary::SpendingSummary;

// =============================================================================
// Anomalies
// =============================================================================

/// Dimension an anomaly was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Transaction amount far from the overall mean
    Amount,
    /// Transaction amount far from its category's mean
    Category,
    /// Day with an unusual number of transactions
    Frequency,
    /// Rolling window whose spend exceeds the trailing average
    OverspendPeriod,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::Amount => "amount",
            AnomalyKind::Category => "category",
            AnomalyKind::Frequency => "frequency",
            AnomalyKind::OverspendPeriod => "overspend_period",
        }
    }

    /// Z-score based kinds (everything except the overspend ratio rule)
    pub fn is_statistical(&self) -> bool {
        !matches!(self, AnomalyKind::OverspendPeriod)
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AnomalyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "amount" => Ok(AnomalyKind::Amount),
            "category" => Ok(AnomalyKind::Category),
            "frequency" => Ok(AnomalyKind::Frequency),
            "overspend_period" => Ok(AnomalyKind::OverspendPeriod),
            _ => Err(format!("Unknown anomaly kind: {}", s)),
        }
    }
}

/// Severity tier shared by anomaly records and risk factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Moderate,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Moderate => "moderate",
            Severity::High => "high",
        }
    }

    /// High when `magnitude` exceeds `cutoff`
    pub fn from_magnitude(magnitude: f64, cutoff: f64) -> Self {
        if magnitude > cutoff {
            Severity::High
        } else {
            Severity::Moderate
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What an anomaly record points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnomalySubject {
    Transaction {
        transaction_id: i64,
        date: NaiveDate,
    },
    Day {
        date: NaiveDate,
    },
    Period {
        start: NaiveDate,
        end: NaiveDate,
    },
}

impl AnomalySubject {
    /// First date covered by the subject
    pub fn start_date(&self) -> NaiveDate {
        match self {
            AnomalySubject::Transaction { date, .. } | AnomalySubject::Day { date } => *date,
            AnomalySubject::Period { start, .. } => *start,
        }
    }

    pub fn transaction_id(&self) -> Option<i64> {
        match self {
            AnomalySubject::Transaction { transaction_id, .. } => Some(*transaction_id),
            _ => None,
        }
    }
}

/// A flagged transaction, day, or period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub kind: AnomalyKind,
    pub subject: AnomalySubject,
    /// Signed z-score, or ratio excess (ratio - 1) for overspend periods
    pub score: f64,
    pub severity: Severity,
    /// Observed value (amount, daily count, or window total)
    pub observed: f64,
    /// Value the observation was compared against (mean or trailing average)
    pub expected: f64,
    /// Category the test ran within, for category anomalies
    pub category: Option<String>,
    /// One-line explanation, e.g. "412.0% above average"
    pub detail: String,
}

// =============================================================================
// Health score
// =============================================================================

/// The four normalized sub-scores (each 0-100, 100 = best)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub delivery_ratio: f64,
    pub volatility: f64,
    pub anomaly_frequency: f64,
    pub overspending: f64,
}

impl ScoreComponents {
    pub fn as_array(&self) -> [f64; 4] {
        [
            self.delivery_ratio,
            self.volatility,
            self.anomaly_frequency,
            self.overspending,
        ]
    }

    /// Weighted sum of the components
    pub fn weighted_sum(&self, weights: &ScoreWeights) -> f64 {
        self.as_array()
            .iter()
            .zip(weights.as_array())
            .map(|(score, weight)| score * weight)
            .sum()
    }
}

/// Raw measurements the components were derived from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreMetrics {
    /// Share of expense total in delivery categories (0-1)
    pub delivery_ratio: f64,
    /// Coefficient of variation of daily spend
    pub volatility: f64,
    /// Anomaly records per expense transaction
    pub anomaly_rate: f64,
    /// Overspend penalty points (1 per moderate, 2 per high period)
    pub overspend_points: u32,
    /// Number of expense transactions scored
    pub expense_count: usize,
}

/// Letter grade, ordered worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "F")]
    F,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A+")]
    APlus,
}

impl Grade {
    /// Bucket a 0-100 score; edge values land in the higher band
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Grade::APlus
        } else if score >= 80.0 {
            Grade::A
        } else if score >= 70.0 {
            Grade::B
        } else if score >= 60.0 {
            Grade::C
        } else if score >= 50.0 {
            Grade::D
        } else {
            Grade::F
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }

    /// Display label, e.g. "A+ Excellent"
    pub fn label(&self) -> &'static str {
        match self {
            Grade::APlus => "A+ Excellent",
            Grade::A => "A Good",
            Grade::B => "B Fair",
            Grade::C => "C Needs Improvement",
            Grade::D => "D Poor",
            Grade::F => "F Critical",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Coarse health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Moderate,
    AtRisk,
}

impl HealthStatus {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            HealthStatus::Healthy
        } else if score >= 60.0 {
            HealthStatus::Moderate
        } else {
            HealthStatus::AtRisk
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Moderate => "Moderate",
            HealthStatus::AtRisk => "At Risk",
        }
    }
}

/// Financial health score with its breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScoreResult {
    /// Weighted sum of `components`, always within [0, 100]
    pub overall: f64,
    pub components: ScoreComponents,
    pub weights: ScoreWeights,
    pub metrics: ScoreMetrics,
    pub grade: Grade,
    pub status: HealthStatus,
    /// Set when there was nothing to score and components are neutral
    pub insufficient_data: bool,
}

impl HealthScoreResult {
    /// Overall score rounded to one decimal for display
    pub fn display_score(&self) -> f64 {
        (self.overall * 10.0).round() / 10.0
    }
}

// =============================================================================
// Risk
// =============================================================================

/// Discretized overspend risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a risk probability came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Trained classifier parameters from the model artifact
    Model,
    /// Built-in fallback weights
    Heuristic,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Model => "model",
            Provenance::Heuristic => "heuristic",
        }
    }
}

/// One input of the risk classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFeature {
    DeliveryRatio,
    Volatility,
    AnomalyCount,
    BudgetBreachCount,
}

impl RiskFeature {
    /// Classifier input order
    pub const ALL: [RiskFeature; 4] = [
        RiskFeature::DeliveryRatio,
        RiskFeature::Volatility,
        RiskFeature::AnomalyCount,
        RiskFeature::BudgetBreachCount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskFeature::DeliveryRatio => "delivery_ratio",
            RiskFeature::Volatility => "volatility",
            RiskFeature::AnomalyCount => "anomaly_count",
            RiskFeature::BudgetBreachCount => "budget_breach_count",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskFeature::DeliveryRatio => "High Delivery Spending",
            RiskFeature::Volatility => "Spending Volatility",
            RiskFeature::AnomalyCount => "Unusual Transactions",
            RiskFeature::BudgetBreachCount => "Budget Breaches",
        }
    }
}

/// Feature vector fed to the classifier
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskFeatures {
    pub delivery_ratio: f64,
    pub volatility: f64,
    pub anomaly_count: f64,
    pub budget_breach_count: f64,
}

impl RiskFeatures {
    pub fn new(
        delivery_ratio: f64,
        volatility: f64,
        anomaly_count: f64,
        budget_breach_count: f64,
    ) -> Self {
        Self {
            delivery_ratio,
            volatility,
            anomaly_count,
            budget_breach_count,
        }
    }

    /// Values in `RiskFeature::ALL` order
    pub fn as_array(&self) -> [f64; 4] {
        [
            self.delivery_ratio,
            self.volatility,
            self.anomaly_count,
            self.budget_breach_count,
        ]
    }

    pub fn get(&self, feature: RiskFeature) -> f64 {
        match feature {
            RiskFeature::DeliveryRatio => self.delivery_ratio,
            RiskFeature::Volatility => self.volatility,
            RiskFeature::AnomalyCount => self.anomaly_count,
            RiskFeature::BudgetBreachCount => self.budget_breach_count,
        }
    }
}

/// A feature that pushed the risk estimate up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub feature: RiskFeature,
    /// Raw feature value
    pub value: f64,
    /// weight * (scaled) value
    pub contribution: f64,
    pub severity: Severity,
    pub rationale: String,
    pub recommendation: String,
}

/// Overspend risk estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPrediction {
    /// Probability of overspending, within [0, 1]
    pub probability: f64,
    pub level: RiskLevel,
    /// Ordered by contribution, largest first
    pub factors: Vec<RiskFactor>,
    pub features: RiskFeatures,
    pub provenance: Provenance,
}

impl RiskPrediction {
    /// Probability as a percentage rounded to one decimal
    pub fn percentage(&self) -> f64 {
        (self.probability * 1000.0).round() / 10.0
    }
}

// =============================================================================
// Nudges
// =============================================================================

/// Tone of a nudge message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Encouraging,
    Warning,
    Critical,
    Neutral,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Encouraging => "encouraging",
            Tone::Warning => "warning",
            Tone::Critical => "critical",
            Tone::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rule that produced a nudge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NudgeKind {
    Risk,
    Delivery,
    Anomaly,
    Volatility,
    Improvement,
    Positive,
    NoSignal,
    InsufficientData,
}

impl NudgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NudgeKind::Risk => "risk",
            NudgeKind::Delivery => "delivery",
            NudgeKind::Anomaly => "anomaly",
            NudgeKind::Volatility => "volatility",
            NudgeKind::Improvement => "improvement",
            NudgeKind::Positive => "positive",
            NudgeKind::NoSignal => "no_signal",
            NudgeKind::InsufficientData => "insufficient_data",
        }
    }
}

/// A short behavioral message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nudge {
    pub kind: NudgeKind,
    pub message: String,
    pub tone: Tone,
    /// Higher = more relevant
    pub priority: u8,
}

// =============================================================================
// Comparison
// =============================================================================

/// Direction a grade moved between two results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeChange {
    Improved,
    Declined,
    Unchanged,
}

/// Change in health score between two results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDelta {
    pub previous_score: f64,
    pub current_score: f64,
    /// current - previous
    pub change: f64,
    pub previous_grade: Grade,
    pub current_grade: Grade,
    pub grade_change: GradeChange,
}

/// Change between two snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDelta {
    pub score: ScoreDelta,
    pub previous_risk_level: RiskLevel,
    pub current_risk_level: RiskLevel,
    /// current - previous
    pub risk_probability_change: f64,
    /// current - previous
    pub anomaly_count_change: i64,
}

// =============================================================================
// Snapshot
// =============================================================================

/// Complete analysis result for one user and one transaction set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub user_id: Option<i64>,
    /// Latest transaction date in the analysed set
    pub as_of: Option<NaiveDate>,
    /// SHA-256 over the analysed transactions
    pub dataset_fingerprint: String,
    pub transaction_count: usize,
    /// Records dropped for violating the transaction invariant
    pub skipped_transactions: usize,
    pub health: HealthScoreResult,
    pub anomalies: Vec<AnomalyRecord>,
    pub risk: RiskPrediction,
    /// Ranked, never empty; the first entry is `primary_nudge`
    pub nudges: Vec<Nudge>,
    pub primary_nudge: Nudge,
    pub summary: SpendingSummary,
    pub delta: Option<SnapshotDelta>,
}

impl AnalyticsSnapshot {
    /// Amount, category and frequency records
    pub fn statistical_anomalies(&self) -> impl Iterator<Item = &AnomalyRecord> {
        self.anomalies.iter().filter(|a| a.kind.is_statistical())
    }

    /// Overspend-period records
    pub fn overspend_periods(&self) -> impl Iterator<Item = &AnomalyRecord> {
        self.anomalies
            .iter()
            .filter(|a| a.kind == AnomalyKind::OverspendPeriod)
    }
}
