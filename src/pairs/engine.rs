//! Cointegration test of a single asset pair.

use serde::{Deserialize, Serialize};

use crate::error::QuantLensError;
use crate::pairs::adf::{engle_granger, CriticalValues};
use crate::pairs::regression::{complete_pairs, half_life, MIN_OBSERVATIONS};
use crate::series::stats;
use crate::validate::{validate_same_len, validate_unit_interval};

/// Engle-Granger outcome with the spread statistics of the pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CointegrationResult {
    pub p_value: f64,
    pub test_statistic: f64,
    pub critical_values: CriticalValues,
    pub is_cointegrated: bool,
    /// Units of B per unit of A in the spread `A − β·B`.
    pub hedge_ratio: f64,
    /// Mean-reversion half-life in periods.
    pub half_life: f64,
    pub spread_mean: f64,
    pub spread_std: f64,
    /// Pearson correlation of the price levels.
    pub correlation: f64,
    /// Aligned observations used by the test.
    pub observations: usize,
}

fn check_series(values: &[f64], name: &str) -> crate::error::Result<()> {
    if values.len() < MIN_OBSERVATIONS {
        return Err(QuantLensError::data(format!(
            "{name} has {} observations, need at least {MIN_OBSERVATIONS}",
            values.len()
        )));
    }
    if values.iter().all(|v| !v.is_finite()) {
        return Err(QuantLensError::data(format!("{name} has no valid observations")));
    }
    Ok(())
}

/// Test whether `a` and `b` are cointegrated at `significance`.
///
/// Rows where either series is missing are dropped before testing.
///
/// # Errors
/// - [`QuantLensError::ShapeError`] — inputs differ in length
/// - [`QuantLensError::DataError`] — fewer than 30 observations, an all-missing
///   series, or fewer than 30 aligned rows
/// - [`QuantLensError::ConfigurationError`] — `significance ∉ (0, 1)`
///
/// # Examples
/// ```
/// use quantlens::pairs::test_pair;
///
/// let b: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 3.0 + i as f64 * 0.1).collect();
/// let a: Vec<f64> = b.iter().enumerate()
///     .map(|(i, v)| 2.0 * v + ((i * 37 + 11) % 23) as f64 / 23.0 - 0.5)
///     .collect();
/// let result = test_pair(&a, &b, 0.05)?;
/// assert!((result.hedge_ratio - 2.0).abs() < 0.05);
/// assert_eq!(result.observations, 60);
/// # Ok::<(), quantlens::QuantLensError>(())
/// ```
pub fn test_pair(a: &[f64], b: &[f64], significance: f64) -> crate::error::Result<CointegrationResult> {
    validate_unit_interval(significance, "significance level")?;
    validate_same_len(a.len(), b.len(), "pair series")?;
    check_series(a, "series A")?;
    check_series(b, "series B")?;

    let (a, b) = complete_pairs(a, b);
    if a.len() < MIN_OBSERVATIONS {
        return Err(QuantLensError::data(format!(
            "insufficient overlapping data: {} rows, need at least {MIN_OBSERVATIONS}",
            a.len()
        )));
    }

    let eg = engle_granger(&a, &b)?;
    let hedge_ratio = eg.slope;
    let spread: Vec<f64> = a.iter().zip(&b).map(|(x, y)| x - hedge_ratio * y).collect();

    #[cfg(feature = "logging")]
    tracing::debug!(
        statistic = eg.statistic,
        p_value = eg.p_value,
        hedge_ratio,
        observations = a.len(),
        "engle-granger test"
    );

    Ok(CointegrationResult {
        p_value: eg.p_value,
        test_statistic: eg.statistic,
        critical_values: eg.critical_values,
        is_cointegrated: eg.p_value < significance,
        hedge_ratio,
        half_life: half_life(&spread),
        spread_mean: stats::mean(&spread),
        spread_std: stats::sample_std(&spread),
        correlation: stats::pearson(&a, &b),
        observations: a.len(),
    })
}
