//! Market conventions shared by the engines.
//!
//! Calendar conventions (actual/365 for option expiries, 252 trading days for
//! half-life bounds) and the simple moneyness used to bucket option contracts.

use chrono::NaiveDate;

/// Calendar days per year used to annualize time to expiry.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Trading days per year; upper bound for a mean-reversion half-life.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Convert a strike to simple moneyness: m = K / S.
pub fn moneyness(strike: f64, spot: f64) -> f64 {
    strike / spot
}

/// Time to expiry in years on an actual/365 basis.
///
/// Expiries on or before `as_of` are floored to one day so that same-day
/// contracts still carry a strictly positive tenor.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use quantlens::conventions::time_to_expiry;
///
/// let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
/// let expiry = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
/// assert!((time_to_expiry(today, expiry) - 90.0 / 365.0).abs() < 1e-12);
/// ```
pub fn time_to_expiry(as_of: NaiveDate, expiration: NaiveDate) -> f64 {
    let days = (expiration - as_of).num_days().max(1);
    days as f64 / DAYS_PER_YEAR
}
