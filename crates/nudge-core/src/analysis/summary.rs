//! Descriptive spending statistics
//!
//! Plain totals and averages for display: no thresholds, no scoring. All
//! figures cover expenses only, except `income_total`.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::models::Transaction;
use crate::stats;

/// Days in the spending projection
pub const PROJECTION_DAYS: u32 = 30;

/// Week-over-week change (percent) that counts as a trend
const TREND_THRESHOLD_PERCENT: f64 = 10.0;

/// Direction of week-over-week spending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Stable => "stable",
        }
    }
}

/// Spend in delivery categories
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeliveryMetrics {
    pub total: f64,
    pub count: usize,
    /// Share of total spend, 0-100
    pub percentage: f64,
    pub average_order: f64,
}

/// Spend in one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub total: f64,
    pub count: usize,
    pub average: f64,
}

/// Last 7 days against the 7 before, ending at the latest transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyComparison {
    pub current_week: f64,
    pub previous_week: f64,
    /// 0 when the previous week had no spend
    pub change_percentage: f64,
    pub trend: Trend,
}

impl Default for WeeklyComparison {
    fn default() -> Self {
        Self {
            current_week: 0.0,
            previous_week: 0.0,
            change_percentage: 0.0,
            trend: Trend::Stable,
        }
    }
}

/// Straight-line projection from the daily average
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendingProjection {
    pub daily_average: f64,
    pub projected_amount: f64,
    pub days: u32,
}

impl Default for SpendingProjection {
    fn default() -> Self {
        Self {
            daily_average: 0.0,
            projected_amount: 0.0,
            days: PROJECTION_DAYS,
        }
    }
}

/// Summary statistics for one transaction set
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpendingSummary {
    pub transaction_count: usize,
    pub expense_count: usize,
    pub total_spent: f64,
    /// Sum of income and refunds, as a positive number
    pub income_total: f64,
    pub average_expense: f64,
    pub median_expense: f64,
    pub max_expense: f64,
    pub min_expense: f64,
    /// Inclusive span from the first to the last expense (0 when none)
    pub date_range_days: i64,
    pub delivery: DeliveryMetrics,
    /// Sorted by total, largest first
    pub categories: Vec<CategoryBreakdown>,
    pub weekly: WeeklyComparison,
    pub projection: SpendingProjection,
}

impl SpendingSummary {
    /// Fails with `InvalidData` only when the two-week lookback from the
    /// latest expense falls before the earliest representable date
    pub fn from_transactions(
        transactions: &[Transaction],
        config: &EngineConfig,
    ) -> Result<Self> {
        let income_total: f64 = transactions
            .iter()
            .filter(|t| !t.is_expense())
            .map(|t| -t.amount)
            .sum();
        let expenses: Vec<&Transaction> = transactions.iter().filter(|t| t.is_expense()).collect();

        let mut summary = Self {
            transaction_count: transactions.len(),
            income_total,
            ..Self::default()
        };
        if expenses.is_empty() {
            return Ok(summary);
        }

        let amounts: Vec<f64> = expenses.iter().map(|t| t.amount).collect();
        let total: f64 = amounts.iter().sum();

        summary.expense_count = expenses.len();
        summary.total_spent = total;
        summary.average_expense = stats::mean(&amounts);
        summary.median_expense = stats::median(&amounts);
        summary.max_expense = amounts.iter().copied().fold(f64::MIN, f64::max);
        summary.min_expense = amounts.iter().copied().fold(f64::MAX, f64::min);

        let first = expenses.iter().map(|t| t.date).min().unwrap_or_default();
        let last = expenses.iter().map(|t| t.date).max().unwrap_or_default();
        summary.date_range_days = (last - first).num_days() + 1;

        summary.delivery = delivery_metrics(&expenses, total, config);
        summary.categories = category_breakdown(&expenses);
        summary.weekly = weekly_comparison(&expenses, last)?;

        let daily_average = total / summary.date_range_days as f64;
        summary.projection = SpendingProjection {
            daily_average,
            projected_amount: daily_average * PROJECTION_DAYS as f64,
            days: PROJECTION_DAYS,
        };

        Ok(summary)
    }

    pub fn top_category(&self) -> Option<&CategoryBreakdown> {
        self.categories.first()
    }
}

fn delivery_metrics(expenses: &[&Transaction], total: f64, config: &EngineConfig) -> DeliveryMetrics {
    let delivery: Vec<f64> = expenses
        .iter()
        .filter(|t| config.is_delivery(&t.category))
        .map(|t| t.amount)
        .collect();
    let delivery_total: f64 = delivery.iter().sum();

    DeliveryMetrics {
        total: delivery_total,
        count: delivery.len(),
        percentage: if total > 0.0 {
            delivery_total / total * 100.0
        } else {
            0.0
        },
        average_order: stats::mean(&delivery),
    }
}

fn category_breakdown(expenses: &[&Transaction]) -> Vec<CategoryBreakdown> {
    let mut by_category: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for tx in expenses {
        let entry = by_category.entry(tx.category.as_str()).or_default();
        entry.0 += tx.amount;
        entry.1 += 1;
    }

    let mut breakdown: Vec<CategoryBreakdown> = by_category
        .into_iter()
        .map(|(category, (total, count))| CategoryBreakdown {
            category: category.to_string(),
            total,
            count,
            average: total / count as f64,
        })
        .collect();
    breakdown.sort_by(|a, b| b.total.total_cmp(&a.total));
    breakdown
}

fn weekly_comparison(expenses: &[&Transaction], as_of: NaiveDate) -> Result<WeeklyComparison> {
    let lookback = |days: i64| {
        as_of.checked_sub_signed(Duration::days(days)).ok_or_else(|| {
            Error::InvalidData(format!("{} is too early for a week-over-week comparison", as_of))
        })
    };
    let current_start = lookback(6)?;
    let previous_start = lookback(13)?;

    let mut current_week = 0.0;
    let mut previous_week = 0.0;
    for tx in expenses {
        if tx.date >= current_start && tx.date <= as_of {
            current_week += tx.amount;
        } else if tx.date >= previous_start && tx.date < current_start {
            previous_week += tx.amount;
        }
    }

    let change_percentage = if previous_week > 0.0 {
        (current_week - previous_week) / previous_week * 100.0
    } else {
        0.0
    };
    let trend = if change_percentage > TREND_THRESHOLD_PERCENT {
        Trend::Increasing
    } else if change_percentage < -TREND_THRESHOLD_PERCENT {
        Trend::Decreasing
    } else {
        Trend::Stable
    };

    Ok(WeeklyComparison {
        current_week,
        previous_week,
        change_percentage,
        trend,
    })
}
