//! Augmented Dickey-Fuller regression and the Engle-Granger test.
//!
//! The residual ADF regression has no deterministic terms:
//!
//! ```text
//! Δu_t = γ·u_{t−1} + Σ_{i=1..p} φ_i·Δu_{t−i} + e_t
//! ```
//!
//! The lag order `p` minimises AIC over a common sample; the statistic is the
//! t-value of `γ` refitted on the full sample for that lag.
//!
//! # References
//! - Engle, R. & Granger, C. "Co-integration and Error Correction" (1987)
//! - MacKinnon, J. "Approximate Asymptotic Distribution Functions for
//!   Unit-Root and Cointegration Tests" (1994)
//! - MacKinnon, J. "Critical Values for Cointegration Tests" (2010)

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::QuantLensError;
use crate::implied::black::norm_cdf;
use crate::pairs::regression::{ols, ols_with_intercept};

// MacKinnon (1994) response surface, constant term, N = 2 variables.
const TAU_MAX: f64 = 0.92;
const TAU_MIN: f64 = -18.86;
const TAU_STAR: f64 = -2.62;
const TAU_SMALL_P: [f64; 3] = [2.92, 1.5012, 0.039796];
const TAU_LARGE_P: [f64; 4] = [2.1945, 0.64695, -0.29198, -0.042377];

// MacKinnon (2010) critical value coefficients, constant term, N = 2.
const CRIT_1: [f64; 3] = [-3.89644, -10.9519, -22.527];
const CRIT_5: [f64; 3] = [-3.33613, -6.1101, -6.823];
const CRIT_10: [f64; 3] = [-3.04445, -4.2412, -2.720];

/// Outcome of an ADF regression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdfResult {
    /// t-value of the lagged level.
    pub statistic: f64,
    /// Augmentation lags chosen by AIC.
    pub used_lag: usize,
    /// Upper bound of the lag search.
    pub max_lag: usize,
    /// Rows in the final regression.
    pub nobs: usize,
}

/// Engle-Granger critical values at 1%, 5% and 10%.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalValues {
    #[serde(rename = "1%")]
    pub one_percent: f64,
    #[serde(rename = "5%")]
    pub five_percent: f64,
    #[serde(rename = "10%")]
    pub ten_percent: f64,
}

/// Engle-Granger two-step test result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngleGranger {
    /// ADF statistic on the residuals, `−∞` for a perfectly collinear pair.
    pub statistic: f64,
    pub p_value: f64,
    pub critical_values: CriticalValues,
    pub intercept: f64,
    pub slope: f64,
    /// ADF lag order; `None` when the residual test was skipped.
    pub used_lag: Option<usize>,
}

/// Default lag bound `ceil(12·(n/100)^¼)`, capped at `n/2 − 1`.
pub fn default_max_lag(nobs: usize) -> usize {
    let schwert = (12.0 * (nobs as f64 / 100.0).powf(0.25)).ceil() as usize;
    schwert.min((nobs / 2).saturating_sub(1))
}

/// Design for lag `lag`: rows `t = start..m`, columns `[x_t, Δx_{t−1}, …, Δx_{t−lag}]`,
/// response `Δx_t`.
fn adf_design(x: &[f64], dx: &[f64], lag: usize, start: usize) -> (DVector<f64>, DMatrix<f64>) {
    let rows = dx.len() - start;
    let design = DMatrix::from_fn(rows, lag + 1, |r, c| {
        let t = start + r;
        if c == 0 { x[t] } else { dx[t - c] }
    });
    let response = DVector::from_fn(rows, |r, _| dx[start + r]);
    (response, design)
}

/// ADF regression without deterministic terms, lag chosen by AIC.
///
/// # Errors
/// Returns [`QuantLensError::DataError`] for a series too short to test and
/// [`QuantLensError::NumericalError`] for a singular regression.
pub fn adf_no_constant(x: &[f64]) -> crate::error::Result<AdfResult> {
    let n = x.len();
    if n < 6 {
        return Err(QuantLensError::data(format!(
            "series of length {n} is too short for an ADF regression"
        )));
    }
    let max_lag = default_max_lag(n);
    let dx: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();

    // All candidate lags share the sample of the largest one.
    let mut best: Option<(f64, usize)> = None;
    for lag in 0..=max_lag {
        let (y, design) = adf_design(x, &dx, lag, max_lag);
        let aic = ols(&y, &design)?.aic;
        if best.is_none_or(|(a, _)| aic < a) {
            best = Some((aic, lag));
        }
    }
    let used_lag = best.map_or(0, |(_, lag)| lag);

    let (y, design) = adf_design(x, &dx, used_lag, used_lag);
    let fit = ols(&y, &design)?;

    #[cfg(feature = "logging")]
    tracing::debug!(used_lag, max_lag, nobs = fit.nobs, "adf regression");

    Ok(AdfResult {
        statistic: fit.t_value(0),
        used_lag,
        max_lag,
        nobs: fit.nobs,
    })
}

/// Asymptotic p-value of an Engle-Granger statistic (two variables, constant).
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }
    let poly = |coef: &[f64]| coef.iter().rev().fold(0.0, |acc, c| acc * statistic + c);
    let z = if statistic <= TAU_STAR {
        poly(&TAU_SMALL_P)
    } else {
        poly(&TAU_LARGE_P)
    };
    norm_cdf(z)
}

/// Finite-sample critical values for `nobs` observations.
pub fn critical_values(nobs: usize) -> CriticalValues {
    let inv = 1.0 / nobs as f64;
    let eval = |b: [f64; 3]| b[0] + b[1] * inv + b[2] * inv * inv;
    CriticalValues {
        one_percent: eval(CRIT_1),
        five_percent: eval(CRIT_5),
        ten_percent: eval(CRIT_10),
    }
}

/// Engle-Granger test of `y` against `x` with a constant.
///
/// Inputs must be aligned and free of missing values.
///
/// # Errors
/// Propagates regression errors (too few rows, singular design).
pub fn engle_granger(y: &[f64], x: &[f64]) -> crate::error::Result<EngleGranger> {
    let step1 = ols_with_intercept(y, x)?;
    let critical_values = critical_values(y.len().saturating_sub(1));
    let (intercept, slope) = (step1.coefficients[0], step1.coefficients[1]);

    if step1.r_squared >= 1.0 - 100.0 * f64::EPSILON.sqrt() {
        #[cfg(feature = "logging")]
        tracing::warn!(
            r_squared = step1.r_squared,
            "pair is almost perfectly collinear; cointegration test skipped"
        );
        return Ok(EngleGranger {
            statistic: f64::NEG_INFINITY,
            p_value: 0.0,
            critical_values,
            intercept,
            slope,
            used_lag: None,
        });
    }

    let adf = adf_no_constant(&step1.residuals)?;
    Ok(EngleGranger {
        statistic: adf.statistic,
        p_value: mackinnon_p_value(adf.statistic),
        critical_values,
        intercept,
        slope,
        used_lag: Some(adf.used_lag),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};

    #[test]
    fn max_lag_schedule() {
        assert_eq!(default_max_lag(100), 12);
        assert_eq!(default_max_lag(30), 9);
        assert_eq!(default_max_lag(250), 16);
        assert_eq!(default_max_lag(10), 4);
    }

    #[test]
    fn p_value_limits() {
        assert_eq!(mackinnon_p_value(1.5), 1.0);
        assert_eq!(mackinnon_p_value(-25.0), 0.0);
        assert_eq!(mackinnon_p_value(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn p_value_is_continuous_at_switch_point() {
        let below = mackinnon_p_value(TAU_STAR);
        let above = mackinnon_p_value(TAU_STAR + 1e-9);
        assert_abs_diff_eq!(below, above, epsilon = 2e-3);
    }

    #[test]
    fn p_value_is_monotone() {
        let stats = [-6.0, -4.5, -3.34, -3.0, -2.0, -1.0, 0.0, 0.5];
        let p: Vec<f64> = stats.iter().map(|&s| mackinnon_p_value(s)).collect();
        assert!(p.windows(2).all(|w| w[0] <= w[1]), "{p:?}");
        // Around the asymptotic 5% critical value.
        assert!(p[2] > 0.03 && p[2] < 0.07, "{}", p[2]);
    }

    #[test]
    fn critical_values_for_large_sample_approach_asymptotes() {
        let cv = critical_values(1_000_000);
        assert_abs_diff_eq!(cv.one_percent, -3.89644, epsilon = 1e-4);
        assert_abs_diff_eq!(cv.five_percent, -3.33613, epsilon = 1e-4);
        assert_abs_diff_eq!(cv.ten_percent, -3.04445, epsilon = 1e-4);
    }

    #[test]
    fn critical_values_are_ordered() {
        let cv = critical_values(99);
        assert!(cv.one_percent < cv.five_percent && cv.five_percent < cv.ten_percent);
        assert_abs_diff_eq!(cv.five_percent, -3.33613 - 6.1101 / 99.0 - 6.823 / 9801.0, epsilon = 1e-12);
    }

    fn ar1(phi: f64, n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let mut x = vec![0.0];
        for _ in 1..n {
            let prev = x[x.len() - 1];
            x.push(phi * prev + noise.sample(&mut rng));
        }
        x
    }

    #[test]
    fn stationary_series_rejects_unit_root() {
        let adf = adf_no_constant(&ar1(0.3, 250, 7)).unwrap();
        assert!(adf.statistic < -3.0, "{}", adf.statistic);
        assert!(adf.used_lag <= adf.max_lag);
        assert_eq!(adf.max_lag, 16);
    }

    #[test]
    fn random_walk_keeps_unit_root() {
        let adf = adf_no_constant(&ar1(1.0, 250, 11)).unwrap();
        assert!(adf.statistic > -3.0, "{}", adf.statistic);
    }

    #[test]
    fn collinear_pair_short_circuits() {
        let x: Vec<f64> = (0..50).map(|i| 10.0 + i as f64 * 0.5 + (i as f64).sin()).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 + 2.0 * v).collect();
        let eg = engle_granger(&y, &x).unwrap();
        assert_eq!(eg.statistic, f64::NEG_INFINITY);
        assert_eq!(eg.p_value, 0.0);
        assert_eq!(eg.used_lag, None);
        assert_abs_diff_eq!(eg.slope, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn short_series_is_data_error() {
        assert!(matches!(
            adf_no_constant(&[1.0, 2.0, 3.0]),
            Err(QuantLensError::DataError { .. })
        ));
    }
}
