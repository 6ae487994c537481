//! Builder API for implied volatility surface extraction.
//!
//! ```
//! use chrono::NaiveDate;
//! use quantlens::implied::black_price;
//! use quantlens::surface::{clean_chain, IvSurfaceBuilder, RawContract};
//! use quantlens::types::OptionType;
//!
//! let as_of = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
//! let expiration = NaiveDate::from_ymd_opt(2025, 4, 2).unwrap();
//! let t = 90.0 / 365.0;
//! let quote = |k: f64, ty: OptionType| {
//!     let p = black_price(100.0, k, t, 0.045, 0.25, ty, 0.0).unwrap();
//!     RawContract { strike: k, bid: p, ask: p, volume: 50, open_interest: 0, expiration }
//! };
//! let calls = clean_chain(&[quote(100.0, OptionType::Call), quote(110.0, OptionType::Call)], 100.0, as_of)?;
//! let puts = clean_chain(&[quote(90.0, OptionType::Put), quote(100.0, OptionType::Put)], 100.0, as_of)?;
//!
//! let surface = IvSurfaceBuilder::new()
//!     .spot(100.0)
//!     .rate(0.045)
//!     .calls(calls)
//!     .puts(puts)
//!     .build()?;
//!
//! let atm = surface.metrics.atm_iv_avg.unwrap();
//! assert!((atm - 0.25).abs() < 1e-4);
//! # Ok::<(), quantlens::QuantLensError>(())
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::VolatilityConfig;
use crate::error::QuantLensError;
use crate::implied::NewtonRaphsonSolver;
use crate::source::RawChain;
use crate::surface::chain::{
    batch_solve_with_dividend, clean_chain, OptionContract, SurfacePoint,
};
use crate::surface::metrics::{surface_metrics, SurfaceMetrics};
use crate::types::OptionType;
use crate::validate::{validate_finite, validate_positive};

/// Solved calls and puts of one underlying with their summary metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IvSurface {
    pub spot: f64,
    pub rate: f64,
    pub calls: Vec<SurfacePoint>,
    pub puts: Vec<SurfacePoint>,
    pub metrics: SurfaceMetrics,
}

impl IvSurface {
    /// Start building a surface.
    pub fn builder() -> IvSurfaceBuilder {
        IvSurfaceBuilder::new()
    }

    /// Clean, filter and solve a raw chain as quoted on `as_of`.
    ///
    /// The chain's own rate is used when it carries a finite one, otherwise
    /// `config.risk_free_rate`.
    ///
    /// # Errors
    /// As [`IvSurfaceBuilder::build`]; also returns
    /// [`QuantLensError::ConfigurationError`] for invalid solver settings and
    /// [`QuantLensError::DataError`] if the filter leaves no contracts.
    pub fn from_chain(
        chain: &RawChain,
        as_of: NaiveDate,
        config: &VolatilityConfig,
    ) -> crate::error::Result<Self> {
        let solver = NewtonRaphsonSolver::new(config.solver)?;
        let filter = &config.filter;
        let rate = chain.rate_or(config.risk_free_rate);
        let calls = filter.apply(&clean_chain(&chain.calls, chain.spot, as_of)?);
        let puts = filter.apply(&clean_chain(&chain.puts, chain.spot, as_of)?);

        #[cfg(feature = "logging")]
        tracing::debug!(
            ticker = %chain.ticker,
            calls = calls.len(),
            puts = puts.len(),
            expiration = %filter.expiration,
            rate,
            "filtered option chain"
        );

        IvSurfaceBuilder::new()
            .spot(chain.spot)
            .rate(rate)
            .solver(solver)
            .calls(calls)
            .puts(puts)
            .build()
    }
}

/// Builder for an [`IvSurface`] from cleaned calls and puts.
#[derive(Debug, Default)]
pub struct IvSurfaceBuilder {
    spot: Option<f64>,
    rate: Option<f64>,
    dividend_yield: Option<f64>,
    solver: NewtonRaphsonSolver,
    calls: Vec<OptionContract>,
    puts: Vec<OptionContract>,
}

impl IvSurfaceBuilder {
    /// Create a builder with the default solver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the spot price.
    pub fn spot(mut self, spot: f64) -> Self {
        self.spot = Some(spot);
        self
    }

    /// Set the risk-free rate.
    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Set the continuous dividend yield. Default is 0.
    pub fn dividend_yield(mut self, q: f64) -> Self {
        self.dividend_yield = Some(q);
        self
    }

    /// Use a custom solver.
    pub fn solver(mut self, solver: NewtonRaphsonSolver) -> Self {
        self.solver = solver;
        self
    }

    /// Set the call side of the chain.
    pub fn calls(mut self, calls: Vec<OptionContract>) -> Self {
        self.calls = calls;
        self
    }

    /// Set the put side of the chain.
    pub fn puts(mut self, puts: Vec<OptionContract>) -> Self {
        self.puts = puts;
        self
    }

    /// Solve both sides and compute metrics.
    ///
    /// # Errors
    /// Returns [`QuantLensError::ConfigurationError`] if spot or rate is
    /// missing or invalid, and [`QuantLensError::DataError`] if both sides
    /// are empty.
    pub fn build(self) -> crate::error::Result<IvSurface> {
        let spot = self
            .spot
            .ok_or_else(|| QuantLensError::config("spot price is required"))?;
        let rate = self
            .rate
            .ok_or_else(|| QuantLensError::config("risk-free rate is required"))?;
        let q = self.dividend_yield.unwrap_or(0.0);

        validate_positive(spot, "spot")?;
        validate_finite(rate, "rate")?;
        validate_finite(q, "dividend_yield")?;
        if self.calls.is_empty() && self.puts.is_empty() {
            return Err(QuantLensError::data("no valid options data after filtering"));
        }

        #[cfg(feature = "logging")]
        tracing::debug!(
            calls = self.calls.len(),
            puts = self.puts.len(),
            spot,
            rate,
            "surface build started"
        );

        let calls =
            batch_solve_with_dividend(&self.calls, spot, rate, q, OptionType::Call, &self.solver);
        let puts =
            batch_solve_with_dividend(&self.puts, spot, rate, q, OptionType::Put, &self.solver);
        let metrics = surface_metrics(&calls, &puts);

        #[cfg(feature = "logging")]
        tracing::debug!(
            successful_calls = metrics.successful_call_ivs,
            successful_puts = metrics.successful_put_ivs,
            "surface build complete"
        );

        Ok(IvSurface {
            spot,
            rate,
            calls,
            puts,
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::implied::black_price;
    use crate::surface::chain::{ChainFilter, ExpirationFilter, RawContract};
    use approx::assert_abs_diff_eq;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn quote(
        k: f64,
        vol: f64,
        option_type: OptionType,
        expiration: NaiveDate,
        as_of: NaiveDate,
    ) -> RawContract {
        let t = crate::conventions::time_to_expiry(as_of, expiration);
        let p = black_price(100.0, k, t, 0.045, vol, option_type, 0.0).unwrap();
        RawContract {
            strike: k,
            bid: p,
            ask: p,
            volume: 25,
            open_interest: 10,
            expiration,
        }
    }

    fn sample_chain() -> RawChain {
        let as_of = date(1, 2);
        let near = date(2, 21);
        let far = date(6, 20);
        let smile = |k: f64| 0.2 + 0.5 * (k / 100.0 - 1.0).powi(2);
        let strikes = [80.0, 90.0, 100.0, 110.0, 120.0];
        let mut calls = Vec::new();
        let mut puts = Vec::new();
        for exp in [near, far] {
            for &k in &strikes {
                calls.push(quote(k, smile(k), OptionType::Call, exp, as_of));
                puts.push(quote(k, smile(k), OptionType::Put, exp, as_of));
            }
        }
        RawChain {
            ticker: "SPY".into(),
            spot: 100.0,
            risk_free_rate: Some(0.045),
            calls,
            puts,
            expirations: vec![near, far],
        }
    }

    fn with_filter(expiration: ExpirationFilter, min_volume: u64) -> VolatilityConfig {
        VolatilityConfig {
            filter: ChainFilter {
                expiration,
                min_volume,
            },
            ..VolatilityConfig::default()
        }
    }

    #[test]
    fn from_chain_solves_first_expiration() {
        let surface =
            IvSurface::from_chain(&sample_chain(), date(1, 2), &VolatilityConfig::default())
                .unwrap();
        assert_eq!(surface.calls.len(), 5);
        assert_eq!(surface.metrics.expiration_dates, vec![date(2, 21)]);
        assert_abs_diff_eq!(surface.metrics.atm_call_iv.unwrap(), 0.2, epsilon = 1e-4);
        assert_abs_diff_eq!(surface.metrics.atm_put_iv.unwrap(), 0.2, epsilon = 1e-4);
        // Symmetric smile: OTM puts and calls carry the same vols.
        assert_abs_diff_eq!(surface.metrics.put_call_skew.unwrap(), 0.0, epsilon = 1e-3);
    }

    #[test]
    fn from_chain_all_expirations() {
        let config = with_filter(ExpirationFilter::All, 10);
        let surface = IvSurface::from_chain(&sample_chain(), date(1, 2), &config).unwrap();
        assert_eq!(surface.metrics.total_call_contracts, 10);
        assert_eq!(surface.metrics.expiration_dates.len(), 2);
    }

    #[test]
    fn volume_floor_can_empty_the_chain() {
        let config = with_filter(ExpirationFilter::All, 1000);
        let err = IvSurface::from_chain(&sample_chain(), date(1, 2), &config).unwrap_err();
        assert!(matches!(err, QuantLensError::DataError { .. }));
    }

    #[test]
    fn chain_rate_takes_precedence() {
        let mut chain = sample_chain();
        chain.risk_free_rate = Some(0.03);
        let surface =
            IvSurface::from_chain(&chain, date(1, 2), &VolatilityConfig::default()).unwrap();
        assert_eq!(surface.rate, 0.03);
    }

    #[test]
    fn missing_chain_rate_falls_back_to_config() {
        let mut chain = sample_chain();
        chain.risk_free_rate = None;
        let surface =
            IvSurface::from_chain(&chain, date(1, 2), &VolatilityConfig::default()).unwrap();
        assert_eq!(surface.rate, 0.045);
        // Quotes were priced at 0.045, so the fallback recovers the smile.
        assert_abs_diff_eq!(surface.metrics.atm_call_iv.unwrap(), 0.2, epsilon = 1e-4);

        chain.risk_free_rate = Some(f64::NAN);
        let config = VolatilityConfig {
            risk_free_rate: 0.05,
            ..VolatilityConfig::default()
        };
        let surface = IvSurface::from_chain(&chain, date(1, 2), &config).unwrap();
        assert_eq!(surface.rate, 0.05);
    }

    #[test]
    fn invalid_solver_config_is_rejected() {
        let mut config = VolatilityConfig::default();
        config.solver.max_iterations = 0;
        let err = IvSurface::from_chain(&sample_chain(), date(1, 2), &config).unwrap_err();
        assert!(matches!(err, QuantLensError::ConfigurationError { .. }));
    }

    // --- Builder validation ---

    #[test]
    fn missing_spot_is_configuration_error() {
        let err = IvSurfaceBuilder::new().rate(0.05).build().unwrap_err();
        assert!(matches!(err, QuantLensError::ConfigurationError { .. }));
    }

    #[test]
    fn missing_rate_is_configuration_error() {
        let err = IvSurfaceBuilder::new().spot(100.0).build().unwrap_err();
        assert!(matches!(err, QuantLensError::ConfigurationError { .. }));
    }

    #[test]
    fn nan_rate_is_configuration_error() {
        let err = IvSurfaceBuilder::new()
            .spot(100.0)
            .rate(f64::NAN)
            .build()
            .unwrap_err();
        assert!(matches!(err, QuantLensError::ConfigurationError { .. }));
    }

    #[test]
    fn empty_chain_is_data_error() {
        let err = IvSurface::builder()
            .spot(100.0)
            .rate(0.05)
            .build()
            .unwrap_err();
        assert!(matches!(err, QuantLensError::DataError { .. }));
    }

    #[test]
    fn one_sided_chain_builds() {
        let as_of = date(1, 2);
        let calls = clean_chain(
            &[quote(100.0, 0.3, OptionType::Call, date(3, 21), as_of)],
            100.0,
            as_of,
        )
        .unwrap();
        let surface = IvSurfaceBuilder::new()
            .spot(100.0)
            .rate(0.045)
            .calls(calls)
            .build()
            .unwrap();
        assert!(surface.puts.is_empty());
        assert_abs_diff_eq!(surface.metrics.atm_iv_avg.unwrap(), 0.3, epsilon = 1e-4);
        assert_eq!(surface.metrics.put_call_skew, None);
    }
}
