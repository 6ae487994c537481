//! Black-Scholes-Merton pricing and Vega.
//!
//! # Formula
//! ```text
//! d1 = [ln(S/K) + (r − q + σ²/2)·T] / (σ√T)
//! d2 = d1 − σ√T
//! C  = S·e^{−qT}·Φ(d1) − K·e^{−rT}·Φ(d2)
//! P  = K·e^{−rT}·Φ(−d2) − S·e^{−qT}·Φ(−d1)
//! ```
//!
//! # References
//! - Black, F. & Scholes, M. "The Pricing of Options and Corporate Liabilities" (1973)
//! - Hull, J. "Options, Futures, and Other Derivatives" (2018)

use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use crate::error::QuantLensError;
use crate::types::OptionType;
use crate::validate::validate_finite;

/// Standard normal cumulative distribution Φ(x).
pub(crate) fn norm_cdf(x: f64) -> f64 {
    Normal::standard().cdf(x)
}

/// Standard normal density φ(x).
pub(crate) fn norm_pdf(x: f64) -> f64 {
    Normal::standard().pdf(x)
}

fn d1_d2(spot: f64, strike: f64, expiry: f64, rate: f64, vol: f64, div_yield: f64) -> (f64, f64) {
    let vol_sqrt_t = vol * expiry.sqrt();
    let d1 = ((spot / strike).ln() + (rate - div_yield + 0.5 * vol * vol) * expiry) / vol_sqrt_t;
    (d1, d1 - vol_sqrt_t)
}

fn validate_prices(spot: f64, strike: f64) -> crate::error::Result<()> {
    if !(spot > 0.0 && strike > 0.0 && spot.is_finite() && strike.is_finite()) {
        return Err(QuantLensError::ConfigurationError {
            message: format!("spot and strike must be positive, got S={spot}, K={strike}"),
        });
    }
    Ok(())
}

fn validate_vol(vol: f64) -> crate::error::Result<()> {
    if vol.is_nan() || vol <= 0.0 {
        return Err(QuantLensError::ConfigurationError {
            message: format!("volatility must be positive, got {vol}"),
        });
    }
    Ok(())
}

/// Black-Scholes-Merton price of a European option.
///
/// At or past expiry (`expiry ≤ 0`) the intrinsic value is returned without
/// touching `vol`. The result is floored at zero.
///
/// # Arguments
/// * `spot` — Underlying price S (must be > 0)
/// * `strike` — Strike K (must be > 0)
/// * `expiry` — Time to expiry in years
/// * `rate` — Continuously compounded risk-free rate
/// * `vol` — Volatility σ (must be > 0 when `expiry > 0`)
/// * `option_type` — Call or Put
/// * `div_yield` — Continuous dividend yield q
///
/// # Errors
/// Returns [`QuantLensError::ConfigurationError`] for non-positive spot,
/// strike, or volatility, or a non-finite rate / yield.
///
/// # Examples
/// ```
/// use quantlens::implied::black_price;
/// use quantlens::types::OptionType;
///
/// let call = black_price(100.0, 100.0, 1.0, 0.05, 0.20, OptionType::Call, 0.0)?;
/// assert!((call - 10.4506).abs() < 1e-3);
/// # Ok::<(), quantlens::QuantLensError>(())
/// ```
pub fn black_price(
    spot: f64,
    strike: f64,
    expiry: f64,
    rate: f64,
    vol: f64,
    option_type: OptionType,
    div_yield: f64,
) -> crate::error::Result<f64> {
    validate_prices(spot, strike)?;
    if expiry <= 0.0 {
        return Ok(option_type.intrinsic(spot, strike));
    }
    validate_vol(vol)?;
    validate_finite(rate, "rate")?;
    validate_finite(div_yield, "dividend yield")?;

    let (d1, d2) = d1_d2(spot, strike, expiry, rate, vol, div_yield);
    let disc_spot = spot * (-div_yield * expiry).exp();
    let disc_strike = strike * (-rate * expiry).exp();
    let price = match option_type {
        OptionType::Call => disc_spot * norm_cdf(d1) - disc_strike * norm_cdf(d2),
        OptionType::Put => disc_strike * norm_cdf(-d2) - disc_spot * norm_cdf(-d1),
    };
    Ok(price.max(0.0))
}

/// Vega ∂V/∂σ, identical for calls and puts: `S·e^{−qT}·φ(d1)·√T`.
///
/// Returns 0 at or past expiry.
///
/// # Errors
/// Returns [`QuantLensError::ConfigurationError`] for non-positive spot,
/// strike, or volatility.
pub fn black_vega(
    spot: f64,
    strike: f64,
    expiry: f64,
    rate: f64,
    vol: f64,
    div_yield: f64,
) -> crate::error::Result<f64> {
    if expiry <= 0.0 {
        return Ok(0.0);
    }
    validate_prices(spot, strike)?;
    validate_vol(vol)?;
    let (d1, _) = d1_d2(spot, strike, expiry, rate, vol, div_yield);
    Ok(spot * (-div_yield * expiry).exp() * norm_pdf(d1) * expiry.sqrt())
}
