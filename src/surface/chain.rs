//! Option chain cleaning, filtering and batch implied-vol solving.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::conventions::{self, DAYS_PER_YEAR};
use crate::error::QuantLensError;
use crate::implied::NewtonRaphsonSolver;
use crate::types::OptionType;
use crate::validate::validate_positive;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Contracts expiring within this many calendar days count as near term.
pub const NEAR_TERM_DAYS: f64 = 90.0;

/// A quoted contract as received from a market-data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawContract {
    pub strike: f64,
    pub bid: f64,
    pub ask: f64,
    pub volume: u64,
    #[serde(default)]
    pub open_interest: u64,
    pub expiration: NaiveDate,
}

/// A cleaned contract with derived mid price, tenor and moneyness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    pub strike: f64,
    pub bid: f64,
    pub ask: f64,
    pub mid_price: f64,
    pub volume: u64,
    pub open_interest: u64,
    pub expiration: NaiveDate,
    /// Years to expiry, actual/365, floored at one day.
    pub time_to_expiry: f64,
    /// Strike over spot.
    pub moneyness: f64,
}

/// One point of the implied volatility surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfacePoint {
    #[serde(flatten)]
    pub contract: OptionContract,
    /// `None` when the solver found no volatility.
    pub implied_volatility: Option<f64>,
}

/// Clean a raw chain.
///
/// Rows with a non-finite or non-positive bid or ask, or zero volume, are
/// dropped. The result is sorted by expiration, then strike.
///
/// # Errors
/// Returns [`QuantLensError::ConfigurationError`] if `spot` is not positive.
pub fn clean_chain(
    raw: &[RawContract],
    spot: f64,
    as_of: NaiveDate,
) -> crate::error::Result<Vec<OptionContract>> {
    validate_positive(spot, "spot")?;

    let mut chain: Vec<OptionContract> = raw
        .iter()
        .filter(|c| {
            c.bid.is_finite()
                && c.ask.is_finite()
                && c.bid > 0.0
                && c.ask > 0.0
                && c.strike.is_finite()
                && c.volume > 0
        })
        .map(|c| OptionContract {
            strike: c.strike,
            bid: c.bid,
            ask: c.ask,
            mid_price: 0.5 * (c.bid + c.ask),
            volume: c.volume,
            open_interest: c.open_interest,
            expiration: c.expiration,
            time_to_expiry: conventions::time_to_expiry(as_of, c.expiration),
            moneyness: conventions::moneyness(c.strike, spot),
        })
        .collect();
    chain.sort_by(|a, b| {
        a.expiration
            .cmp(&b.expiration)
            .then(a.strike.total_cmp(&b.strike))
    });

    #[cfg(feature = "logging")]
    tracing::debug!(
        raw = raw.len(),
        kept = chain.len(),
        "cleaned option chain"
    );

    Ok(chain)
}

/// Which expirations of a chain to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirationFilter {
    /// Earliest expiration only.
    #[default]
    First,
    /// Expirations within [`NEAR_TERM_DAYS`].
    NearTerm,
    /// Every expiration.
    All,
}

impl fmt::Display for ExpirationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::First => "first",
            Self::NearTerm => "near_term",
            Self::All => "all",
        })
    }
}

impl FromStr for ExpirationFilter {
    type Err = QuantLensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "near_term" | "near-term" | "nearterm" => Ok(Self::NearTerm),
            "all" => Ok(Self::All),
            other => Err(QuantLensError::config(format!(
                "unknown expiration filter '{other}' (expected first, near_term or all)"
            ))),
        }
    }
}

/// Volume and expiration filter applied to a cleaned chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainFilter {
    pub expiration: ExpirationFilter,
    pub min_volume: u64,
}

impl Default for ChainFilter {
    fn default() -> Self {
        Self {
            expiration: ExpirationFilter::First,
            min_volume: 10,
        }
    }
}

impl ChainFilter {
    /// Keep contracts meeting the expiration rule, then the volume floor.
    ///
    /// For [`ExpirationFilter::First`] the earliest expiration is taken over
    /// the whole chain, so an illiquid front expiry yields an empty result.
    pub fn apply(&self, chain: &[OptionContract]) -> Vec<OptionContract> {
        let first = chain.iter().map(|c| c.expiration).min();
        chain
            .iter()
            .filter(|c| match self.expiration {
                ExpirationFilter::All => true,
                ExpirationFilter::NearTerm => {
                    c.time_to_expiry <= NEAR_TERM_DAYS / DAYS_PER_YEAR
                }
                ExpirationFilter::First => Some(c.expiration) == first,
            })
            .filter(|c| c.volume >= self.min_volume)
            .cloned()
            .collect()
    }
}

/// Solve implied volatility for every contract of one side of a chain.
///
/// Contracts are solved independently, in parallel under the `parallel`
/// feature. Output order matches input order.
pub fn batch_solve(
    chain: &[OptionContract],
    spot: f64,
    rate: f64,
    option_type: OptionType,
    solver: &NewtonRaphsonSolver,
) -> Vec<SurfacePoint> {
    batch_solve_with_dividend(chain, spot, rate, 0.0, option_type, solver)
}

/// [`batch_solve`] with a continuous dividend yield.
pub fn batch_solve_with_dividend(
    chain: &[OptionContract],
    spot: f64,
    rate: f64,
    div_yield: f64,
    option_type: OptionType,
    solver: &NewtonRaphsonSolver,
) -> Vec<SurfacePoint> {
    let solve_one = |contract: &OptionContract| SurfacePoint {
        implied_volatility: solver
            .solve(
                contract.mid_price,
                spot,
                contract.strike,
                contract.time_to_expiry,
                rate,
                option_type,
                div_yield,
            )
            .vol(),
        contract: contract.clone(),
    };

    #[cfg(feature = "parallel")]
    let points: Vec<SurfacePoint> = chain.par_iter().map(solve_one).collect();
    #[cfg(not(feature = "parallel"))]
    let points: Vec<SurfacePoint> = chain.iter().map(solve_one).collect();

    #[cfg(feature = "logging")]
    tracing::info!(
        option_type = %option_type,
        solved = points.iter().filter(|p| p.implied_volatility.is_some()).count(),
        total = points.len(),
        "batch implied vol"
    );

    points
}
