//! Ordinary least squares and the regressions built on it.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::conventions::TRADING_DAYS_PER_YEAR;
use crate::error::QuantLensError;
use crate::validate::validate_same_len;

/// Minimum aligned observations for a hedge-ratio regression.
pub const MIN_OBSERVATIONS: usize = 30;

/// Half-life reported when mean reversion cannot be estimated.
pub const DEFAULT_HALF_LIFE: f64 = 30.0;

const MIN_HALF_LIFE_ROWS: usize = 10;

/// Fitted OLS model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OlsFit {
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub residuals: Vec<f64>,
    /// Sum of squared residuals.
    pub ssr: f64,
    /// Centered coefficient of determination.
    pub r_squared: f64,
    /// Akaike information criterion, `−2·llf + 2·k`.
    pub aic: f64,
    pub nobs: usize,
}

impl OlsFit {
    /// t-statistic of coefficient `i`.
    pub fn t_value(&self, i: usize) -> f64 {
        self.coefficients[i] / self.std_errors[i]
    }
}

/// Regress `y` on the columns of `x`.
///
/// Include a column of ones in `x` for an intercept.
///
/// # Errors
/// Returns [`QuantLensError::ShapeError`] if row counts differ,
/// [`QuantLensError::DataError`] if there are no more rows than regressors,
/// and [`QuantLensError::NumericalError`] if `XᵀX` is singular.
pub fn ols(y: &DVector<f64>, x: &DMatrix<f64>) -> crate::error::Result<OlsFit> {
    validate_same_len(y.len(), x.nrows(), "ols response and design")?;
    let (n, k) = x.shape();
    if n <= k {
        return Err(QuantLensError::data(format!(
            "regression needs more observations than regressors ({n} rows, {k} columns)"
        )));
    }

    let xtx_inv = (x.transpose() * x)
        .try_inverse()
        .ok_or_else(|| QuantLensError::numerical("singular regression design"))?;
    let beta = &xtx_inv * (x.transpose() * y);
    let resid = y - x * &beta;
    let ssr = resid.dot(&resid);
    let sigma2 = ssr / (n - k) as f64;

    let y_mean = y.mean();
    let tss: f64 = y.iter().map(|v| (v - y_mean) * (v - y_mean)).sum();
    let r_squared = if tss > 0.0 { 1.0 - ssr / tss } else { f64::NAN };

    let nf = n as f64;
    let llf = -0.5 * nf * ((2.0 * std::f64::consts::PI).ln() + (ssr / nf).ln() + 1.0);

    Ok(OlsFit {
        coefficients: beta.iter().copied().collect(),
        std_errors: (0..k).map(|i| (sigma2 * xtx_inv[(i, i)]).sqrt()).collect(),
        residuals: resid.iter().copied().collect(),
        ssr,
        r_squared,
        aic: -2.0 * llf + 2.0 * k as f64,
        nobs: n,
    })
}

/// Rows where both inputs are finite.
pub(crate) fn complete_pairs(a: &[f64], b: &[f64]) -> (Vec<f64>, Vec<f64>) {
    a.iter()
        .zip(b)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| (*x, *y))
        .unzip()
}

/// OLS of `y` on `[1, x]`.
pub(crate) fn ols_with_intercept(y: &[f64], x: &[f64]) -> crate::error::Result<OlsFit> {
    let design = DMatrix::from_fn(x.len(), 2, |i, j| if j == 0 { 1.0 } else { x[i] });
    ols(&DVector::from_column_slice(y), &design)
}

/// Hedge ratio β from regressing `a` on `[1, b]`.
///
/// Rows with a missing value in either series are ignored.
///
/// # Errors
/// Returns [`QuantLensError::ShapeError`] for unequal lengths and
/// [`QuantLensError::DataError`] for fewer than [`MIN_OBSERVATIONS`] usable
/// rows.
pub fn hedge_ratio(a: &[f64], b: &[f64]) -> crate::error::Result<f64> {
    validate_same_len(a.len(), b.len(), "hedge ratio inputs")?;
    let (a, b) = complete_pairs(a, b);
    if a.len() < MIN_OBSERVATIONS {
        return Err(QuantLensError::data(format!(
            "need at least {MIN_OBSERVATIONS} aligned observations, got {}",
            a.len()
        )));
    }
    Ok(ols_with_intercept(&a, &b)?.coefficients[1])
}

/// Mean-reversion half-life of a spread in periods.
///
/// Fits `Δs_t = θ·s_{t−1}` without intercept and sets `λ = θ + 1`. The
/// half-life `−ln 2 / ln λ` is clamped to `[1, 252]`. Returns
/// [`DEFAULT_HALF_LIFE`] with fewer than 10 usable rows or when `λ ∉ (0, 1)`.
pub fn half_life(spread: &[f64]) -> f64 {
    let (lagged, diff): (Vec<f64>, Vec<f64>) = spread
        .windows(2)
        .filter(|w| w[0].is_finite() && w[1].is_finite())
        .map(|w| (w[0], w[1] - w[0]))
        .unzip();
    if lagged.len() < MIN_HALF_LIFE_ROWS {
        return DEFAULT_HALF_LIFE;
    }
    let sxx: f64 = lagged.iter().map(|x| x * x).sum();
    if sxx <= 0.0 {
        return DEFAULT_HALF_LIFE;
    }
    let theta = lagged.iter().zip(&diff).map(|(x, y)| x * y).sum::<f64>() / sxx;
    let lambda = theta + 1.0;
    if lambda.is_nan() || lambda <= 0.0 || lambda >= 1.0 {
        return DEFAULT_HALF_LIFE;
    }
    (-std::f64::consts::LN_2 / lambda.ln()).clamp(1.0, TRADING_DAYS_PER_YEAR)
}
