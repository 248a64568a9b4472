//! Anomaly detection
//!
//! Detects:
//! - Amount anomalies: expenses far from the other expenses
//! - Category anomalies: the same test inside each category
//! - Frequency anomalies: days with an unusual number of expenses
//! - Overspend periods: rolling windows well above the trailing average
//!
//! The first three are z-score tests with threshold `z_threshold`. Amount
//! and category scores measure each expense against the mean and spread of
//! the *other* expenses, so one huge purchase cannot hide inside the spread
//! it creates. The overspend rule is a ratio test and is reported
//! separately. Every test degrades to "no anomalies" when it lacks the data
//! it needs.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::config::AnomalyConfig;
use crate::models::Transaction;
use crate::stats;

use super::types::{AnomalyKind, AnomalyRecord, AnomalySubject, Severity};

/// Minimum expense days before the frequency test runs
const MIN_FREQUENCY_DAYS: usize = 3;

/// Other expenses needed before one expense is scored against them
const MIN_BASELINE_SIZE: usize = 3;

/// Reference spread never drops below this fraction of the baseline mean
const MIN_RELATIVE_SPREAD: f64 = 0.05;

/// Statistical outlier detector
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    config: AnomalyConfig,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(&AnomalyConfig::default())
    }
}

impl AnomalyDetector {
    pub fn new(config: &AnomalyConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    /// Run every test over the expenses in `transactions`
    ///
    /// Records come back grouped by kind: amount (input order), category
    /// (by category name), frequency (by date), overspend (by start date).
    pub fn detect(&self, transactions: &[Transaction]) -> Vec<AnomalyRecord> {
        let expenses: Vec<&Transaction> = transactions.iter().filter(|t| t.is_expense()).collect();

        let amount = self.detect_amount(&expenses);
        let category = self.detect_category(&expenses);
        let frequency = self.detect_frequency(&expenses);
        let overspend = self.detect_overspend(&expenses);

        debug!(
            expenses = expenses.len(),
            amount = amount.len(),
            category = category.len(),
            frequency = frequency.len(),
            overspend = overspend.len(),
            "Anomaly detection complete"
        );

        let mut records = amount;
        records.extend(category);
        records.extend(frequency);
        records.extend(overspend);
        records
    }

    /// Expenses more than tau deviations from the other expenses
    fn detect_amount(&self, expenses: &[&Transaction]) -> Vec<AnomalyRecord> {
        self.z_test(expenses, AnomalyKind::Amount, None)
    }

    /// The amount test, run independently inside each category
    fn detect_category(&self, expenses: &[&Transaction]) -> Vec<AnomalyRecord> {
        let mut by_category: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
        for tx in expenses {
            by_category.entry(tx.category.as_str()).or_default().push(tx);
        }

        by_category
            .into_iter()
            .flat_map(|(category, group)| {
                self.z_test(&group, AnomalyKind::Category, Some(category))
            })
            .collect()
    }

    fn z_test(
        &self,
        expenses: &[&Transaction],
        kind: AnomalyKind,
        category: Option<&str>,
    ) -> Vec<AnomalyRecord> {
        let amounts: Vec<f64> = expenses.iter().map(|t| t.amount).collect();
        let Some(deviations) =
            stats::leave_one_out(&amounts, MIN_BASELINE_SIZE, MIN_RELATIVE_SPREAD)
        else {
            return vec![];
        };

        expenses
            .iter()
            .zip(deviations)
            .filter(|(_, d)| d.z.abs() > self.config.z_threshold)
            .map(|(tx, d)| AnomalyRecord {
                kind,
                subject: AnomalySubject::Transaction {
                    transaction_id: tx.id,
                    date: tx.date,
                },
                score: d.z,
                severity: Severity::from_magnitude(d.z.abs(), self.config.high_severity_cutoff()),
                observed: tx.amount,
                expected: d.baseline,
                category: category.map(str::to_string),
                detail: percent_detail(tx.amount, d.baseline, "the other expenses' average"),
            })
            .collect()
    }

    /// Days whose expense count deviates from the typical daily count
    fn detect_frequency(&self, expenses: &[&Transaction]) -> Vec<AnomalyRecord> {
        let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for tx in expenses {
            *per_day.entry(tx.date).or_default() += 1;
        }
        if per_day.len() < MIN_FREQUENCY_DAYS {
            return vec![];
        }

        let counts: Vec<f64> = per_day.values().map(|c| *c as f64).collect();
        let std_dev = stats::sample_std_dev(&counts);
        let Some(z_scores) = stats::z_scores(&counts, std_dev) else {
            return vec![];
        };
        let mean = stats::mean(&counts);

        per_day
            .keys()
            .zip(counts.iter().zip(z_scores))
            .filter(|(_, (_, z))| z.abs() > self.config.z_threshold)
            .map(|(date, (count, z))| AnomalyRecord {
                kind: AnomalyKind::Frequency,
                subject: AnomalySubject::Day { date: *date },
                score: z,
                severity: Severity::from_magnitude(z.abs(), self.config.high_severity_cutoff()),
                observed: *count,
                expected: mean,
                category: None,
                detail: format!("{} transactions vs {:.1} on a typical day", count, mean),
            })
            .collect()
    }

    /// Rolling windows whose total exceeds `overspend_ratio` times the
    /// average of all earlier windows. Consecutive hits merge into one period.
    ///
    /// Days without spending are implicit zeros: only windows touching an
    /// expense are summed, while the trailing average still counts every
    /// earlier window.
    fn detect_overspend(&self, expenses: &[&Transaction]) -> Vec<AnomalyRecord> {
        let window = self.config.overspend_window_days as i64;
        let daily = daily_totals(expenses);
        let (Some(first), Some(last)) = (
            daily.keys().next().copied(),
            daily.keys().next_back().copied(),
        ) else {
            return vec![];
        };

        let span = (last - first).num_days() + 1;
        if span <= window {
            return self.detect_single_window(first, last, expenses).into_iter().collect();
        }

        // Window start offsets (days after `first`) that cover an expense
        let last_start = span - window;
        let mut starts = BTreeSet::new();
        for date in daily.keys() {
            let offset = (*date - first).num_days();
            starts.extend((offset - window + 1).max(0)..=offset.min(last_start));
        }

        let mut records = Vec::new();
        let mut current: Option<OverspendRun> = None;
        let mut running_sum = 0.0;
        let mut previous_start = None;

        for k in starts {
            // Skipped starts are empty windows, which end any run
            if previous_start.is_some_and(|p: i64| k > p + 1) {
                if let Some(run) = current.take() {
                    records.push(self.overspend_record(run, &self.trailing_label()));
                }
            }
            previous_start = Some(k);

            let start = first + Duration::days(k);
            let end = start + Duration::days(window - 1);
            let total: f64 = daily.range(start..=end).map(|(_, amount)| amount).sum();

            let hit = if k == 0 {
                None
            } else {
                let trailing = running_sum / k as f64;
                (trailing > 0.0 && total > self.config.overspend_ratio * trailing)
                    .then(|| (total / trailing, trailing))
            };
            running_sum += total;

            match (hit, current.as_mut()) {
                (Some((ratio, trailing)), Some(run)) => run.extend(end, ratio, total, trailing),
                (Some((ratio, trailing)), None) => {
                    current = Some(OverspendRun::new(start, end, ratio, total, trailing));
                }
                (None, _) => {
                    if let Some(run) = current.take() {
                        records.push(self.overspend_record(run, &self.trailing_label()));
                    }
                }
            }
        }
        if let Some(run) = current.take() {
            records.push(self.overspend_record(run, &self.trailing_label()));
        }

        records
    }

    /// With no earlier window to trail, the whole span is one window measured
    /// against what the same purchases cost at a typical price
    fn detect_single_window(
        &self,
        first: NaiveDate,
        last: NaiveDate,
        expenses: &[&Transaction],
    ) -> Option<AnomalyRecord> {
        let observed: f64 = expenses.iter().map(|t| t.amount).sum();
        let expected = typical_purchase(expenses) * expenses.len() as f64;
        if expected <= 0.0 || observed <= self.config.overspend_ratio * expected {
            return None;
        }

        let run = OverspendRun::new(first, last, observed / expected, observed, expected);
        Some(self.overspend_record(run, "typical spending for the same purchases"))
    }

    fn trailing_label(&self) -> String {
        format!("the trailing {}-day average", self.config.overspend_window_days)
    }

    fn overspend_record(&self, run: OverspendRun, baseline: &str) -> AnomalyRecord {
        let excess = run.ratio - 1.0;
        AnomalyRecord {
            kind: AnomalyKind::OverspendPeriod,
            subject: AnomalySubject::Period {
                start: run.start,
                end: run.end,
            },
            score: excess,
            severity: Severity::from_magnitude(excess, self.config.high_severity_cutoff()),
            observed: run.observed,
            expected: run.expected,
            category: None,
            detail: percent_detail(run.observed, run.expected, baseline),
        }
    }
}

/// A stretch of consecutive flagged windows, tracking the worst one
struct OverspendRun {
    start: NaiveDate,
    end: NaiveDate,
    ratio: f64,
    observed: f64,
    expected: f64,
}

impl OverspendRun {
    fn new(start: NaiveDate, end: NaiveDate, ratio: f64, observed: f64, expected: f64) -> Self {
        Self {
            start,
            end,
            ratio,
            observed,
            expected,
        }
    }

    fn extend(&mut self, end: NaiveDate, ratio: f64, observed: f64, expected: f64) {
        self.end = end;
        if ratio > self.ratio {
            self.ratio = ratio;
            self.observed = observed;
            self.expected = expected;
        }
    }
}

/// Expense totals for each day that has spending
fn daily_totals(expenses: &[&Transaction]) -> BTreeMap<NaiveDate, f64> {
    let mut daily = BTreeMap::new();
    for tx in expenses {
        *daily.entry(tx.date).or_insert(0.0) += tx.amount;
    }
    daily
}

/// Mean of the per-category median expense; each category counts once
/// however often it is bought
fn typical_purchase(expenses: &[&Transaction]) -> f64 {
    let mut by_category: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for tx in expenses {
        by_category.entry(tx.category.as_str()).or_default().push(tx.amount);
    }
    let medians: Vec<f64> = by_category.values().map(|amounts| stats::median(amounts)).collect();
    stats::mean(&medians)
}

fn percent_detail(observed: f64, expected: f64, baseline: &str) -> String {
    if expected.abs() < stats::MIN_STD_DEV {
        return format!("{:.2} against a zero {}", observed, baseline);
    }
    let pct = (observed - expected) / expected.abs() * 100.0;
    let direction = if pct >= 0.0 { "above" } else { "below" };
    format!("{:.1}% {} {}", pct.abs(), direction, baseline)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, month, day).unwrap()
    }

    fn tx(id: i64, day: u32, category: &str, amount: f64) -> Transaction {
        Transaction::new(id, 1, date(1, day), category, amount)
    }

    #[test]
    fn test_too_few_transactions_is_empty() {
        let detector = AnomalyDetector::default();
        assert!(detector.detect(&[]).is_empty());
        assert!(detector.detect(&[tx(1, 1, "Groceries", 50.0)]).is_empty());
    }

    #[test]
    fn test_zero_variance_flags_nothing() {
        let detector = AnomalyDetector::default();
        let txs: Vec<_> = (1..=10).map(|i| tx(i, i as u32, "Groceries", 42.0)).collect();
        assert!(detector.detect(&txs).is_empty());
    }

    #[test]
    fn test_amount_outlier_is_high_severity() {
        let detector = AnomalyDetector::default();
        let mut txs: Vec<_> = (1..=12)
            .map(|i| tx(i, i as u32, "Shopping", if i % 2 == 0 { 120.0 } else { 80.0 }))
            .collect();
        txs.push(tx(13, 13, "Entertainment", 10_000.0));

        let records = detector.detect(&txs);
        let amount: Vec<_> = records
            .iter()
            .filter(|r| r.kind == AnomalyKind::Amount)
            .collect();
        assert_eq!(amount.len(), 1);
        assert_eq!(amount[0].subject.transaction_id(), Some(13));
        assert_eq!(amount[0].severity, Severity::High);
        assert!(amount[0].score > 3.0);
        assert!((amount[0].expected - 100.0).abs() < 1e-9);
        assert!(amount[0].detail.ends_with("above the other expenses' average"));
    }

    #[test]
    fn test_same_transaction_in_amount_and_category() {
        let detector = AnomalyDetector::default();
        let mut txs: Vec<_> = (1..=10).map(|i| tx(i, i as u32, "Groceries", 100.0 + i as f64)).collect();
        txs.push(tx(11, 11, "Groceries", 2_000.0));

        let records = detector.detect(&txs);
        let kinds: Vec<_> = records
            .iter()
            .filter(|r| r.subject.transaction_id() == Some(11))
            .map(|r| r.kind)
            .collect();
        assert!(kinds.contains(&AnomalyKind::Amount));
        assert!(kinds.contains(&AnomalyKind::Category));

        let category = records
            .iter()
            .find(|r| r.kind == AnomalyKind::Category)
            .unwrap();
        assert_eq!(category.category.as_deref(), Some("Groceries"));
    }

    #[test]
    fn test_category_test_runs_within_category() {
        // Entertainment is tiny but consistent, Shopping is large but has one outlier
        let detector = AnomalyDetector::default();
        let mut txs = vec![];
        for i in 1..=6 {
            txs.push(tx(i, i as u32, "Entertainment", 15.0));
        }
        for i in 7..=16 {
            txs.push(tx(i, i as u32, "Shopping", 200.0));
        }
        txs.push(tx(17, 17, "Shopping", 900.0));

        let category: Vec<_> = detector
            .detect(&txs)
            .into_iter()
            .filter(|r| r.kind == AnomalyKind::Category)
            .collect();
        assert_eq!(category.len(), 1);
        assert_eq!(category[0].subject.transaction_id(), Some(17));
    }

    #[test]
    fn test_frequency_spike() {
        let detector = AnomalyDetector::default();
        let mut txs = vec![];
        let mut id = 0;
        for day in 1..=10 {
            id += 1;
            txs.push(tx(id, day, "Groceries", 30.0 + day as f64));
        }
        for _ in 0..8 {
            id += 1;
            txs.push(tx(id, 11, "Groceries", 35.0));
        }

        let frequency: Vec<_> = detector
            .detect(&txs)
            .into_iter()
            .filter(|r| r.kind == AnomalyKind::Frequency)
            .collect();
        assert_eq!(frequency.len(), 1);
        assert_eq!(frequency[0].subject, AnomalySubject::Day { date: date(1, 11) });
        assert_eq!(frequency[0].observed, 9.0);
    }

    #[test]
    fn test_overspend_period_merges_consecutive_windows() {
        let detector = AnomalyDetector::default();
        let mut txs = vec![];
        for day in 1..=14 {
            txs.push(tx(day as i64, day, "Groceries", 20.0));
        }
        for day in 15..=17 {
            txs.push(tx(100 + day as i64, day, "Shopping", 300.0));
        }

        let overspend: Vec<_> = detector
            .detect(&txs)
            .into_iter()
            .filter(|r| r.kind == AnomalyKind::OverspendPeriod)
            .collect();
        assert_eq!(overspend.len(), 1);
        let record = &overspend[0];
        assert_eq!(record.subject.start_date(), date(1, 9));
        assert_eq!(
            record.subject,
            AnomalySubject::Period {
                start: date(1, 9),
                end: date(1, 17),
            }
        );
        assert!(record.score > 0.2);
        assert!(record.observed > record.expected);
    }

    #[test]
    fn test_short_history_outlier_is_flagged() {
        let detector = AnomalyDetector::default();
        let txs = vec![
            tx(1, 1, "Shopping", 80.0),
            tx(2, 2, "Shopping", 120.0),
            tx(3, 3, "Shopping", 80.0),
            tx(4, 4, "Shopping", 120.0),
            tx(5, 5, "Shopping", 10_000.0),
        ];

        let amount: Vec<_> = detector
            .detect(&txs)
            .into_iter()
            .filter(|r| r.kind == AnomalyKind::Amount)
            .collect();
        assert_eq!(amount.len(), 1);
        assert_eq!(amount[0].subject.transaction_id(), Some(5));
        assert_eq!(amount[0].severity, Severity::High);
        assert!((amount[0].score - 495.0).abs() < 1e-6);
    }

    #[test]
    fn test_flat_history_outlier_is_flagged() {
        let detector = AnomalyDetector::default();
        let mut txs: Vec<_> = (1..=4).map(|i| tx(i, i as u32, "Utilities", 100.0)).collect();
        txs.push(tx(5, 5, "Utilities", 10_000.0));

        let records = detector.detect(&txs);
        let flagged: Vec<_> = records
            .iter()
            .filter(|r| r.kind.is_statistical())
            .filter_map(|r| r.subject.transaction_id())
            .collect();
        assert_eq!(flagged, vec![5, 5]);
    }

    #[test]
    fn test_three_expenses_are_too_few_to_score() {
        let detector = AnomalyDetector::default();
        let txs = vec![
            tx(1, 1, "Groceries", 100.0),
            tx(2, 2, "Groceries", 105.0),
            tx(3, 3, "Groceries", 98.0),
        ];
        assert!(detector.detect(&txs).is_empty());
    }

    #[test]
    fn test_threshold_controls_flags() {
        // others of the last expense: mean 100, sigma 10, so z = 2.5
        let mut txs: Vec<_> = (1..=8)
            .map(|i| tx(i, i as u32, "Groceries", if i % 2 == 0 { 110.0 } else { 90.0 }))
            .collect();
        txs.push(tx(9, 9, "Groceries", 125.0));

        let flagged = |tau: f64| {
            let config = AnomalyConfig {
                z_threshold: tau,
                ..AnomalyConfig::default()
            };
            AnomalyDetector::new(&config)
                .detect(&txs)
                .into_iter()
                .filter(|r| r.kind == AnomalyKind::Amount)
                .count()
        };
        assert_eq!(flagged(2.0), 1);
        assert_eq!(flagged(3.0), 0);
    }

    #[test]
    fn test_single_week_measured_against_typical_purchase() {
        let detector = AnomalyDetector::default();
        let mut txs = vec![tx(1, 1, "Groceries", 95.0), tx(2, 2, "Groceries", 105.0)];
        for (i, amount) in [400.0, 420.0, 440.0, 460.0, 480.0, 500.0, 450.0, 430.0]
            .iter()
            .enumerate()
        {
            txs.push(tx(10 + i as i64, (1 + i as u32).min(7), "Food Delivery", *amount));
        }

        let overspend: Vec<_> = detector
            .detect(&txs)
            .into_iter()
            .filter(|r| r.kind == AnomalyKind::OverspendPeriod)
            .collect();
        assert_eq!(overspend.len(), 1);
        let record = &overspend[0];
        assert_eq!(
            record.subject,
            AnomalySubject::Period {
                start: date(1, 1),
                end: date(1, 7),
            }
        );
        // typical purchase: mean of medians 100 and 445, times 10 purchases
        assert!((record.expected - 2_725.0).abs() < 1e-9);
        assert!((record.observed - 3_780.0).abs() < 1e-9);
        assert_eq!(record.severity, Severity::Moderate);
        assert!(record.detail.ends_with("typical spending for the same purchases"));

        let strict = AnomalyConfig {
            overspend_ratio: 1.5,
            ..AnomalyConfig::default()
        };
        assert!(AnomalyDetector::new(&strict)
            .detect(&txs)
            .iter()
            .all(|r| r.kind != AnomalyKind::OverspendPeriod));
    }

    #[test]
    fn test_steady_single_week_has_no_overspend() {
        let detector = AnomalyDetector::default();
        let txs: Vec<_> = (1..=6)
            .map(|i| tx(i, i as u32, if i % 2 == 0 { "Groceries" } else { "Transportation" }, 30.0))
            .collect();
        assert!(detector
            .detect(&txs)
            .iter()
            .all(|r| r.kind != AnomalyKind::OverspendPeriod));
    }

    #[test]
    fn test_distant_dates_use_sparse_windows() {
        let detector = AnomalyDetector::default();
        let early = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
        let late = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let txs = vec![
            Transaction::new(1, 1, early, "Groceries", 50.0),
            Transaction::new(2, 1, late, "Groceries", 50.0),
        ];

        let overspend: Vec<_> = detector
            .detect(&txs)
            .into_iter()
            .filter(|r| r.kind == AnomalyKind::OverspendPeriod)
            .collect();
        // After decades of empty windows the trailing average is near zero
        assert_eq!(overspend.len(), 1);
        assert_eq!(
            overspend[0].subject,
            AnomalySubject::Period {
                start: late - Duration::days(6),
                end: late,
            }
        );
    }

    #[test]
    fn test_quiet_gap_ends_a_run() {
        let detector = AnomalyDetector::default();
        let mut txs: Vec<_> = (1..=10).map(|d| tx(d as i64, d, "Groceries", 20.0)).collect();
        txs.push(tx(50, 12, "Shopping", 400.0));
        txs.push(tx(51, 28, "Shopping", 400.0));

        let periods: Vec<_> = detector
            .detect(&txs)
            .into_iter()
            .filter(|r| r.kind == AnomalyKind::OverspendPeriod)
            .collect();
        assert_eq!(periods.len(), 2);
        assert!(periods[0].subject.start_date() < periods[1].subject.start_date());
    }

    #[test]
    fn test_income_is_ignored() {
        let detector = AnomalyDetector::default();
        let mut txs: Vec<_> = (1..=10).map(|i| tx(i, i as u32, "Groceries", 50.0)).collect();
        txs.push(tx(11, 11, "Other", -5_000.0));
        assert!(detector.detect(&txs).is_empty());
    }

    #[test]
    fn test_percent_detail() {
        assert_eq!(percent_detail(512.0, 100.0, "average"), "412.0% above average");
        assert_eq!(percent_detail(50.0, 100.0, "average"), "50.0% below average");
    }
}
