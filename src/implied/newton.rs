//! Newton-Raphson implied volatility under Black-Scholes-Merton.
//!
//! Iterates `σ ← clamp(σ − (BSM(σ) − price) / Vega(σ))` until the price
//! residual falls below tolerance. Failing to converge is an expected outcome
//! for deep in- or out-of-the-money contracts (Vega vanishes there), so the
//! solver returns an [`IvSolution`] rather than an error.

use serde::{Deserialize, Serialize};

use crate::error::QuantLensError;
use crate::implied::black::{black_price, black_vega};
use crate::types::{OptionType, Vol};

/// Fraction of intrinsic value a quote may undershoot before it is treated
/// as inconsistent with no-arbitrage (absorbs bid/ask noise).
const INTRINSIC_TOLERANCE: f64 = 0.99;
/// Vega below this is a flat region: the Newton step is meaningless.
const MIN_VEGA: f64 = 1e-8;
/// Minimum step size; smaller steps mean the iteration is pinned.
const MIN_STEP: f64 = 1e-8;

/// Why the solver produced no implied volatility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoSolutionReason {
    /// Market price is zero or negative.
    NonPositivePrice,
    /// Spot or strike is zero or negative.
    NonPositiveInput,
    /// Time to expiry is zero or negative.
    Expired,
    /// Market price is below 99% of intrinsic value.
    BelowIntrinsic,
    /// Vega collapsed below 1e-8.
    FlatVega,
    /// The clamped update moved by less than 1e-8.
    Stalled,
    /// The residual converged at a volatility outside the configured bounds.
    OutOfBounds,
    /// Iteration cap reached without convergence.
    MaxIterations,
}

/// Outcome of an implied volatility solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IvSolution {
    /// Residual within tolerance.
    Converged {
        /// Solved volatility.
        vol: Vol,
        /// Newton iterations used.
        iterations: usize,
    },
    /// No admissible volatility.
    NoSolution {
        /// Diagnostic reason.
        reason: NoSolutionReason,
    },
}

impl IvSolution {
    fn none(reason: NoSolutionReason) -> Self {
        Self::NoSolution { reason }
    }

    /// Solved volatility, if any.
    pub fn vol(&self) -> Option<f64> {
        match self {
            Self::Converged { vol, .. } => Some(vol.0),
            Self::NoSolution { .. } => None,
        }
    }

    /// Whether the solver converged.
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }
}

/// Iteration limits, tolerance and volatility bounds for the solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Maximum Newton iterations.
    pub max_iterations: usize,
    /// Absolute price residual accepted as converged.
    pub tolerance: f64,
    /// Lower volatility bound.
    pub min_vol: f64,
    /// Upper volatility bound.
    pub max_vol: f64,
    /// Starting volatility.
    pub initial_guess: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
            min_vol: 0.001,
            max_vol: 5.0,
            initial_guess: 0.25,
        }
    }
}

impl SolverConfig {
    /// Check that the settings describe a usable solver.
    ///
    /// # Errors
    /// Returns [`QuantLensError::ConfigurationError`] for a zero iteration
    /// cap, a non-positive tolerance, or inverted / non-positive bounds.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.max_iterations == 0 {
            return Err(QuantLensError::config("max_iterations must be at least 1"));
        }
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(QuantLensError::config(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if !(self.min_vol > 0.0 && self.min_vol < self.max_vol && self.max_vol.is_finite()) {
            return Err(QuantLensError::config(format!(
                "volatility bounds must satisfy 0 < min < max, got [{}, {}]",
                self.min_vol, self.max_vol
            )));
        }
        Ok(())
    }
}

/// Newton-Raphson implied volatility solver.
///
/// # Examples
/// ```
/// use quantlens::implied::{black_price, NewtonRaphsonSolver};
/// use quantlens::types::OptionType;
///
/// let price = black_price(100.0, 110.0, 0.5, 0.03, 0.32, OptionType::Call, 0.0)?;
/// let solution = NewtonRaphsonSolver::default()
///     .solve(price, 100.0, 110.0, 0.5, 0.03, OptionType::Call, 0.0);
/// assert!((solution.vol().unwrap() - 0.32).abs() < 1e-4);
/// # Ok::<(), quantlens::QuantLensError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NewtonRaphsonSolver {
    config: SolverConfig,
}

impl NewtonRaphsonSolver {
    /// Create a solver with custom settings.
    ///
    /// # Errors
    /// Returns [`QuantLensError::ConfigurationError`] if `config` is invalid.
    pub fn new(config: SolverConfig) -> crate::error::Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active settings.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve for σ such that `BSM(σ) = market_price`.
    #[allow(clippy::too_many_arguments)]
    pub fn solve(
        &self,
        market_price: f64,
        spot: f64,
        strike: f64,
        expiry: f64,
        rate: f64,
        option_type: OptionType,
        div_yield: f64,
    ) -> IvSolution {
        self.solve_from(
            market_price,
            spot,
            strike,
            expiry,
            rate,
            option_type,
            div_yield,
            self.config.initial_guess,
        )
    }

    /// Solve starting from an explicit guess.
    ///
    /// A non-positive or non-finite guess falls back to the configured one.
    #[allow(clippy::too_many_arguments)]
    pub fn solve_from(
        &self,
        market_price: f64,
        spot: f64,
        strike: f64,
        expiry: f64,
        rate: f64,
        option_type: OptionType,
        div_yield: f64,
        initial_guess: f64,
    ) -> IvSolution {
        let cfg = &self.config;

        if market_price.is_nan() || market_price <= 0.0 {
            #[cfg(feature = "logging")]
            tracing::debug!(market_price, "market price must be positive");
            return IvSolution::none(NoSolutionReason::NonPositivePrice);
        }
        if !(spot > 0.0 && strike > 0.0) {
            #[cfg(feature = "logging")]
            tracing::debug!(spot, strike, "spot and strike must be positive");
            return IvSolution::none(NoSolutionReason::NonPositiveInput);
        }
        if expiry.is_nan() || expiry <= 0.0 {
            #[cfg(feature = "logging")]
            tracing::debug!(expiry, "time to expiry must be positive");
            return IvSolution::none(NoSolutionReason::Expired);
        }
        let intrinsic = option_type.intrinsic(spot, strike);
        if market_price < intrinsic * INTRINSIC_TOLERANCE {
            #[cfg(feature = "logging")]
            tracing::debug!(market_price, intrinsic, "market price below intrinsic value");
            return IvSolution::none(NoSolutionReason::BelowIntrinsic);
        }

        let mut sigma = if initial_guess.is_finite() && initial_guess > 0.0 {
            initial_guess
        } else {
            cfg.initial_guess
        };

        for iteration in 0..cfg.max_iterations {
            let (model, vega) = match (
                black_price(spot, strike, expiry, rate, sigma, option_type, div_yield),
                black_vega(spot, strike, expiry, rate, sigma, div_yield),
            ) {
                (Ok(p), Ok(v)) => (p, v),
                _ => return IvSolution::none(NoSolutionReason::NonPositiveInput),
            };
            let residual = model - market_price;

            if residual.abs() < cfg.tolerance {
                if (cfg.min_vol..=cfg.max_vol).contains(&sigma) {
                    return IvSolution::Converged {
                        vol: Vol(sigma),
                        iterations: iteration,
                    };
                }
                #[cfg(feature = "logging")]
                tracing::warn!(sigma, "converged to out-of-range volatility");
                return IvSolution::none(NoSolutionReason::OutOfBounds);
            }

            if vega.abs() < MIN_VEGA {
                return IvSolution::none(NoSolutionReason::FlatVega);
            }

            let next = (sigma - residual / vega).clamp(cfg.min_vol, cfg.max_vol);
            if (next - sigma).abs() < MIN_STEP {
                #[cfg(feature = "logging")]
                tracing::debug!(sigma, "newton iteration stalled");
                return IvSolution::none(NoSolutionReason::Stalled);
            }
            sigma = next;
        }

        #[cfg(feature = "logging")]
        tracing::debug!(
            max_iterations = cfg.max_iterations,
            sigma,
            "implied vol did not converge"
        );
        IvSolution::none(NoSolutionReason::MaxIterations)
    }
}

/// Solve implied volatility with default solver settings.
///
/// Convenience wrapper around [`NewtonRaphsonSolver::solve`].
pub fn implied_vol(
    market_price: f64,
    spot: f64,
    strike: f64,
    expiry: f64,
    rate: f64,
    option_type: OptionType,
) -> IvSolution {
    NewtonRaphsonSolver::default().solve(market_price, spot, strike, expiry, rate, option_type, 0.0)
}
