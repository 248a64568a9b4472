//! Numeric helpers shared by the analysis components
//!
//! Every function here is total: empty input, a single value, and zero
//! variance all produce a defined result instead of NaN or a panic.

/// Standard deviations below this are treated as zero variance
pub const MIN_STD_DEV: f64 = 1e-9;

/// Arithmetic mean (0.0 for empty input)
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n)
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Sample standard deviation (divides by n - 1)
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Calculate median of a slice
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Z-scores for every value, or `None` when the series has no variance
pub fn z_scores(values: &[f64], std_dev: f64) -> Option<Vec<f64>> {
    if values.len() < 2 || !std_dev.is_finite() || std_dev < MIN_STD_DEV {
        return None;
    }
    let m = mean(values);
    Some(values.iter().map(|v| (v - m) / std_dev).collect())
}

/// A value's distance from the rest of its series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deviation {
    /// Signed distance in reference standard deviations
    pub z: f64,
    /// Mean of the other values
    pub baseline: f64,
}

/// Score every value against the mean and population sigma of the *other*
/// values, so one extreme value cannot inflate its own reference spread.
///
/// The reference sigma never drops below `spread_floor * |baseline|`, which
/// keeps a departure from an otherwise flat series finite. Returns `None`
/// when fewer than `min_others` other values exist.
pub fn leave_one_out(
    values: &[f64],
    min_others: usize,
    spread_floor: f64,
) -> Option<Vec<Deviation>> {
    if values.len() < 2 || values.len() - 1 < min_others {
        return None;
    }
    let n = values.len() as f64;
    let others = n - 1.0;
    let m = mean(values);
    let m2: f64 = values.iter().map(|v| (v - m).powi(2)).sum();

    let deviations = values
        .iter()
        .map(|v| {
            let d = v - m;
            let baseline = m - d / others;
            // Removing v shrinks the sum of squares by d^2 * n / (n - 1)
            let others_m2 = (m2 - d * d * n / others).max(0.0);
            let sigma = (others_m2 / others).sqrt().max(spread_floor * baseline.abs());
            let z = if sigma.is_finite() && sigma >= MIN_STD_DEV {
                (v - baseline) / sigma
            } else {
                0.0
            };
            Deviation { z, baseline }
        })
        .collect();
    Some(deviations)
}

/// Coefficient of variation (sample sigma / mean), 0.0 when undefined
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if values.len() < 2 || m.abs() < MIN_STD_DEV {
        return 0.0;
    }
    sample_std_dev(values) / m.abs()
}

/// Logistic function that saturates instead of overflowing
pub fn sigmoid(z: f64) -> f64 {
    if z.is_nan() {
        return 0.5;
    }
    let p = if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    };
    p.clamp(0.0, 1.0)
}

/// Clamp a component score into [0, 100]; NaN maps to 0
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_empty() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[2.0, 4.0]), 3.0);
    }

    #[test]
    fn test_std_devs() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((population_std_dev(&values) - 2.0).abs() < 1e-12);
        assert!((sample_std_dev(&values) - 2.138_089_935).abs() < 1e-6);
        assert_eq!(population_std_dev(&[5.0]), 0.0);
        assert_eq!(sample_std_dev(&[]), 0.0);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
        assert_eq!(median(&[15.99, 15.99, 15.99]), 15.99);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn test_z_scores_zero_variance_short_circuits() {
        assert!(z_scores(&[10.0, 10.0, 10.0], 0.0).is_none());
        assert!(z_scores(&[10.0], 1.0).is_none());

        let values = [1.0, 3.0];
        let z = z_scores(&values, population_std_dev(&values)).unwrap();
        assert_eq!(z, vec![-1.0, 1.0]);
    }

    #[test]
    fn test_leave_one_out_excludes_the_candidate() {
        let values = [80.0, 120.0, 80.0, 120.0, 10_000.0];
        let deviations = leave_one_out(&values, 3, 0.0).unwrap();

        let outlier = deviations[4];
        assert!((outlier.baseline - 100.0).abs() < 1e-9);
        assert!((outlier.z - 495.0).abs() < 1e-6);
        assert!(deviations[..4].iter().all(|d| d.z.abs() < 1.0));
    }

    #[test]
    fn test_leave_one_out_flat_history_uses_floor() {
        let deviations = leave_one_out(&[50.0, 50.0, 50.0, 50.0, 60.0], 3, 0.05).unwrap();
        // others: mean 50, sigma 0, floored to 2.5
        assert!((deviations[4].z - 4.0).abs() < 1e-9);

        let flat = leave_one_out(&[7.0; 6], 3, 0.05).unwrap();
        assert!(flat.iter().all(|d| d.z.abs() < 1e-9));
    }

    #[test]
    fn test_leave_one_out_needs_enough_others() {
        assert!(leave_one_out(&[100.0, 105.0, 98.0], 3, 0.05).is_none());
        assert!(leave_one_out(&[], 0, 0.05).is_none());
        assert!(leave_one_out(&[1.0, 2.0, 3.0, 4.0], 3, 0.05).is_some());
    }

    #[test]
    fn test_coefficient_of_variation() {
        assert_eq!(coefficient_of_variation(&[100.0]), 0.0);
        assert_eq!(coefficient_of_variation(&[50.0, 50.0]), 0.0);
        assert_eq!(coefficient_of_variation(&[0.0, 0.0]), 0.0);
        assert!(coefficient_of_variation(&[10.0, 90.0]) > 1.0);
    }

    #[test]
    fn test_sigmoid_saturates() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert_eq!(sigmoid(f64::INFINITY), 1.0);
        assert_eq!(sigmoid(f64::NEG_INFINITY), 0.0);
        assert_eq!(sigmoid(f64::NAN), 0.5);
        assert!(sigmoid(1e308) <= 1.0);
        assert!(sigmoid(-1e308) >= 0.0);
        assert!(sigmoid(2.0) > sigmoid(1.0));
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(-5.0), 0.0);
        assert_eq!(clamp_score(150.0), 100.0);
        assert_eq!(clamp_score(f64::NAN), 0.0);
        assert_eq!(clamp_score(42.0), 42.0);
    }
}
