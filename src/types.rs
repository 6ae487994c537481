//! Shared value types.
//!
//! # Why no `Eq` or `Ord` on [`Vol`]?
//! It wraps `f64`, which does not implement `Eq` or `Ord` because `NaN`
//! breaks total ordering. We derive `PartialEq` and `PartialOrd` only.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QuantLensError;

/// Implied volatility `σ`, measured as annualized standard deviation.
///
/// A vol of 0.20 represents 20% annualized volatility.
///
/// # Examples
/// ```
/// use quantlens::types::Vol;
/// let vol = Vol(0.20);
/// assert_eq!(vol.0, 0.20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Vol(pub f64);

/// Option type: call or put.
///
/// Determines the pricing formula branch and the intrinsic value used by the
/// no-arbitrage precheck of the implied volatility solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    /// Right to buy at strike price.
    Call,
    /// Right to sell at strike price.
    Put,
}

impl OptionType {
    /// Payoff at expiry for a given spot and strike.
    pub fn intrinsic(self, spot: f64, strike: f64) -> f64 {
        match self {
            Self::Call => (spot - strike).max(0.0),
            Self::Put => (strike - spot).max(0.0),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call => f.write_str("call"),
            Self::Put => f.write_str("put"),
        }
    }
}

impl FromStr for OptionType {
    type Err = QuantLensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" | "c" => Ok(Self::Call),
            "put" | "p" => Ok(Self::Put),
            other => Err(QuantLensError::ConfigurationError {
                message: format!("unknown option type '{other}', expected 'call' or 'put'"),
            }),
        }
    }
}

/// Pair-trading signal derived from a spread z-score.
///
/// The absence of a signal is represented as `None` in a signal series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    /// Spread is unusually low: buy the spread.
    Long,
    /// Spread is unusually high: sell the spread.
    Short,
    /// Spread has reverted close to its mean.
    Exit,
}
