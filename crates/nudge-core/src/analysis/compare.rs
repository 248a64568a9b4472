//! Historical comparison
//!
//! Pure functions over two existing results. Nothing here re-runs analysis.

use std::cmp::Ordering;

use super::types::{AnalyticsSnapshot, GradeChange, HealthScoreResult, ScoreDelta, SnapshotDelta};

/// Score and grade movement from `previous` to `current`
pub fn compare_scores(previous: &HealthScoreResult, current: &HealthScoreResult) -> ScoreDelta {
    let grade_change = match current.grade.cmp(&previous.grade) {
        Ordering::Greater => GradeChange::Improved,
        Ordering::Less => GradeChange::Declined,
        Ordering::Equal => GradeChange::Unchanged,
    };

    ScoreDelta {
        previous_score: previous.overall,
        current_score: current.overall,
        change: current.overall - previous.overall,
        previous_grade: previous.grade,
        current_grade: current.grade,
        grade_change,
    }
}

/// Score, risk and anomaly movement between two snapshots
pub fn compare_snapshots(previous: &AnalyticsSnapshot, current: &AnalyticsSnapshot) -> SnapshotDelta {
    SnapshotDelta {
        score: compare_scores(&previous.health, &current.health),
        previous_risk_level: previous.risk.level,
        current_risk_level: current.risk.level,
        risk_probability_change: current.risk.probability - previous.risk.probability,
        anomaly_count_change: current.anomalies.len() as i64 - previous.anomalies.len() as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::health_score::HealthScoreCalculator;
    use crate::analysis::types::Grade;

    fn with_score(overall: f64) -> HealthScoreResult {
        let mut result = HealthScoreCalculator::default().score(&[], &[]);
        result.overall = overall;
        result.grade = Grade::from_score(overall);
        result
    }

    #[test]
    fn test_improvement_across_grade_boundary() {
        let delta = compare_scores(&with_score(78.0), &with_score(84.5));
        assert!((delta.change - 6.5).abs() < 1e-12);
        assert_eq!(delta.previous_grade, Grade::B);
        assert_eq!(delta.current_grade, Grade::A);
        assert_eq!(delta.grade_change, GradeChange::Improved);
    }

    #[test]
    fn test_decline_and_unchanged() {
        let delta = compare_scores(&with_score(91.0), &with_score(65.0));
        assert_eq!(delta.grade_change, GradeChange::Declined);
        assert!(delta.change < 0.0);

        let delta = compare_scores(&with_score(72.0), &with_score(77.0));
        assert_eq!(delta.grade_change, GradeChange::Unchanged);
    }
}
