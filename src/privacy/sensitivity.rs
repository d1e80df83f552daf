//! Sensitivity estimation for numeric columns
//!
//! Sensitivity bounds how much one record can move a column and so sets the
//! scale of the Laplace noise. Which estimator fits depends on what the
//! column measures:
//!
//! - [`SensitivityStrategy::Range`]: `max - min`, for velocity- and
//!   force-like attributes.
//! - [`SensitivityStrategy::LocalDifference`]: largest absolute step between
//!   adjacent readings, for coordinates whose global range would vastly
//!   overstate what one reading can change.
//! - [`SensitivityStrategy::Percentile`]: interquartile range, for derived
//!   intervals with unbounded outliers.
//!
//! Nulls are dropped before estimation. Every strategy returns a value
//! `>= 0`, and `0` when the column has too few non-null values or is
//! constant. A column holding an infinite value yields `NaN`. Sensitivity is computed from the data itself and is not
//! privacy-protected.

use serde::{Deserialize, Serialize};

/// Sensitivity estimator, attached to a column's privacy policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityStrategy {
    /// Global range of the column
    Range,
    /// Maximum absolute first difference between adjacent readings
    LocalDifference,
    /// Interquartile range `Q75 - Q25`
    Percentile,
}

impl std::fmt::Display for SensitivityStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Range => write!(f, "range"),
            Self::LocalDifference => write!(f, "local_difference"),
            Self::Percentile => write!(f, "percentile"),
        }
    }
}

/// Estimate the sensitivity of a column under the given strategy
pub fn estimate(values: &[Option<f64>], strategy: SensitivityStrategy) -> f64 {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    // An infinite reading has no finite bound; let the caller reject it.
    if present.iter().any(|v| !v.is_finite()) {
        return f64::NAN;
    }
    if present.len() < 2 {
        return 0.0;
    }
    let sensitivity = match strategy {
        SensitivityStrategy::Range => range(&present),
        SensitivityStrategy::LocalDifference => max_step(&present),
        SensitivityStrategy::Percentile => {
            let mut sorted = present;
            sorted.sort_by(|a, b| a.total_cmp(b));
            quantile(&sorted, 0.75) - quantile(&sorted, 0.25)
        }
    };
    // Rounding in the quantile interpolation can leave a tiny negative.
    sensitivity.max(0.0)
}

fn range(values: &[f64]) -> f64 {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    max - min
}

fn max_step(values: &[f64]) -> f64 {
    values
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .fold(0.0, f64::max)
}

/// Quantile of sorted data with linear interpolation between order
/// statistics
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = pos.floor() as usize;
            let upper = pos.ceil() as usize;
            let frac = pos - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * frac
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_range() {
        let values = col(&[25.0, 35.0, 20.0]);
        assert_eq!(estimate(&values, SensitivityStrategy::Range), 15.0);
    }

    #[test]
    fn test_range_ignores_nulls() {
        let values = vec![Some(1.0), None, Some(-3.0), None];
        assert_eq!(estimate(&values, SensitivityStrategy::Range), 4.0);
    }

    #[test]
    fn test_local_difference() {
        let values = vec![Some(42.0), Some(42.001), None, Some(42.004), Some(42.0035)];
        let s = estimate(&values, SensitivityStrategy::LocalDifference);
        assert!((s - 0.003).abs() < 1e-9, "got {}", s);
    }

    #[test]
    fn test_local_difference_smaller_than_range() {
        let values: Vec<Option<f64>> = (0..100).map(|i| Some(i as f64 * 0.5)).collect();
        assert_eq!(estimate(&values, SensitivityStrategy::LocalDifference), 0.5);
        assert_eq!(estimate(&values, SensitivityStrategy::Range), 49.5);
    }

    #[test]
    fn test_percentile_matches_linear_interpolation() {
        let values = col(&[1.0, 2.0, 3.0, 4.0]);
        // Q25 = 1.75, Q75 = 3.25
        assert_eq!(estimate(&values, SensitivityStrategy::Percentile), 1.5);

        let values = vec![Some(3.0), Some(1.0), None];
        assert_eq!(estimate(&values, SensitivityStrategy::Percentile), 1.0);
    }

    #[test]
    fn test_percentile_robust_to_outlier() {
        let mut values = col(&[1.0, 1.2, 1.4, 1.6, 1.8, 2.0, 2.2, 2.4]);
        values.push(Some(1.0e6));
        let s = estimate(&values, SensitivityStrategy::Percentile);
        assert!(s < 2.0, "got {}", s);
        assert!(estimate(&values, SensitivityStrategy::Range) > 1.0e5);
    }

    #[test]
    fn test_constant_column_is_zero() {
        let values = col(&[7.0; 10]);
        for strategy in [
            SensitivityStrategy::Range,
            SensitivityStrategy::LocalDifference,
            SensitivityStrategy::Percentile,
        ] {
            assert_eq!(estimate(&values, strategy), 0.0);
        }
    }

    #[test]
    fn test_all_null_and_single_value_are_zero() {
        let empty: Vec<Option<f64>> = vec![None, None, None];
        let single = vec![None, Some(5.0)];
        for strategy in [
            SensitivityStrategy::Range,
            SensitivityStrategy::LocalDifference,
            SensitivityStrategy::Percentile,
        ] {
            assert_eq!(estimate(&empty, strategy), 0.0);
            assert_eq!(estimate(&single, strategy), 0.0);
            assert_eq!(estimate(&[], strategy), 0.0);
        }
    }

    #[test]
    fn test_infinite_value_is_nan() {
        let values = vec![Some(1.0), Some(2.0), Some(3.0), Some(f64::INFINITY), Some(f64::INFINITY)];
        for strategy in [
            SensitivityStrategy::Range,
            SensitivityStrategy::LocalDifference,
            SensitivityStrategy::Percentile,
        ] {
            assert!(estimate(&values, strategy).is_nan(), "{}", strategy);
        }
        assert!(estimate(&[Some(f64::NEG_INFINITY)], SensitivityStrategy::Range).is_nan());
    }

    #[test]
    fn test_quantile_edges() {
        let sorted = [1.0, 2.0, 3.0];
        assert_eq!(quantile(&sorted, 0.0), 1.0);
        assert_eq!(quantile(&sorted, 0.5), 2.0);
        assert_eq!(quantile(&sorted, 1.0), 3.0);
        assert_eq!(quantile(&[4.0], 0.75), 4.0);
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(SensitivityStrategy::LocalDifference.to_string(), "local_difference");
    }
}
