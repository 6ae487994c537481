//! Analytics configuration.
//!
//! Every engine parameter with a default lives here. Configuration is loaded
//! from JSON (missing fields take their defaults) and then optionally
//! overridden from `QUANTLENS_*` environment variables:
//!
//! | Variable | Field |
//! |---|---|
//! | `QUANTLENS_LINKAGE_METHOD` | `clustering.linkage_method` |
//! | `QUANTLENS_MIN_CORRELATION_PERIODS` | `clustering.min_correlation_periods` |
//! | `QUANTLENS_SIGNIFICANCE_LEVEL` | `pairs.significance_level` |
//! | `QUANTLENS_ZSCORE_WINDOW` | `pairs.window` |
//! | `QUANTLENS_ENTRY_THRESHOLD` | `pairs.entry_threshold` |
//! | `QUANTLENS_EXIT_THRESHOLD` | `pairs.exit_threshold` |
//! | `QUANTLENS_RISK_FREE_RATE` | `volatility.risk_free_rate` |
//! | `QUANTLENS_MIN_VOLUME` | `volatility.filter.min_volume` |
//! | `QUANTLENS_EXPIRATION_FILTER` | `volatility.filter.expiration` |
//! | `QUANTLENS_SOLVER_MAX_ITERATIONS` | `volatility.solver.max_iterations` |
//! | `QUANTLENS_SOLVER_TOLERANCE` | `volatility.solver.tolerance` |

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cluster::LinkageMethod;
use crate::error::QuantLensError;
use crate::implied::SolverConfig;
use crate::surface::ChainFilter;
use crate::validate::{validate_finite, validate_unit_interval};

const ENV_PREFIX: &str = "QUANTLENS_";

/// Correlation clustering settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub linkage_method: LinkageMethod,
    /// Fraction of return rows each asset pair must overlap on.
    pub min_correlation_periods: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            linkage_method: LinkageMethod::Ward,
            min_correlation_periods: 0.8,
        }
    }
}

/// Cointegration and spread signal settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairsConfig {
    /// p-value below which a pair counts as cointegrated.
    pub significance_level: f64,
    /// Rolling z-score window.
    pub window: usize,
    pub entry_threshold: f64,
    pub exit_threshold: f64,
}

impl Default for PairsConfig {
    fn default() -> Self {
        Self {
            significance_level: 0.05,
            window: 20,
            entry_threshold: 2.0,
            exit_threshold: 0.0,
        }
    }
}

impl PairsConfig {
    /// # Errors
    /// Returns [`QuantLensError::ConfigurationError`] for a significance level
    /// outside `(0, 1)`, a window below 2, or a negative threshold.
    pub fn validate(&self) -> crate::error::Result<()> {
        validate_unit_interval(self.significance_level, "significance_level")?;
        if self.window < 2 {
            return Err(QuantLensError::config(format!(
                "window must be at least 2, got {}",
                self.window
            )));
        }
        for (value, name) in [
            (self.entry_threshold, "entry_threshold"),
            (self.exit_threshold, "exit_threshold"),
        ] {
            if validate_finite(value, name)? < 0.0 {
                return Err(QuantLensError::config(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        #[cfg(feature = "logging")]
        {
            if self.exit_threshold >= self.entry_threshold && self.exit_threshold > 0.0 {
                tracing::warn!(
                    entry = self.entry_threshold,
                    exit = self.exit_threshold,
                    "exit threshold at or above entry threshold: exits override every entry"
                );
            }
        }
        Ok(())
    }
}

/// Implied volatility settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityConfig {
    /// Used when a chain carries no finite rate of its own.
    pub risk_free_rate: f64,
    pub filter: ChainFilter,
    pub solver: SolverConfig,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.045,
            filter: ChainFilter::default(),
            solver: SolverConfig::default(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub clustering: ClusteringConfig,
    pub pairs: PairsConfig,
    pub volatility: VolatilityConfig,
}

fn parse<T: FromStr>(name: &str, raw: &str) -> crate::error::Result<T> {
    raw.trim().parse().map_err(|_| {
        QuantLensError::config(format!("{ENV_PREFIX}{name}: cannot parse '{raw}'"))
    })
}

impl AnalyticsConfig {
    /// Parse configuration from a JSON string.
    ///
    /// # Errors
    /// Returns [`QuantLensError::ConfigurationError`] for malformed JSON or
    /// invalid values.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| QuantLensError::config(format!("invalid configuration JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    ///
    /// # Errors
    /// Returns [`QuantLensError::ConfigurationError`] if the file cannot be
    /// read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            QuantLensError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Defaults overridden by `QUANTLENS_*` environment variables.
    ///
    /// # Errors
    /// Returns [`QuantLensError::ConfigurationError`] for an unparsable or
    /// invalid value.
    pub fn from_env() -> crate::error::Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `QUANTLENS_*` environment variables on top of `self`.
    ///
    /// # Errors
    /// As [`from_env`](Self::from_env).
    pub fn with_env_overrides(self) -> crate::error::Result<Self> {
        self.with_overrides(|name| std::env::var(format!("{ENV_PREFIX}{name}")).ok())
    }

    /// Apply overrides from `lookup`, which maps an unprefixed variable name
    /// (e.g. `ZSCORE_WINDOW`) to its value.
    ///
    /// # Errors
    /// As [`from_env`](Self::from_env).
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> crate::error::Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("LINKAGE_METHOD") {
            self.clustering.linkage_method = v.parse()?;
        }
        if let Some(v) = get("MIN_CORRELATION_PERIODS") {
            self.clustering.min_correlation_periods = parse("MIN_CORRELATION_PERIODS", &v)?;
        }
        if let Some(v) = get("SIGNIFICANCE_LEVEL") {
            self.pairs.significance_level = parse("SIGNIFICANCE_LEVEL", &v)?;
        }
        if let Some(v) = get("ZSCORE_WINDOW") {
            self.pairs.window = parse("ZSCORE_WINDOW", &v)?;
        }
        if let Some(v) = get("ENTRY_THRESHOLD") {
            self.pairs.entry_threshold = parse("ENTRY_THRESHOLD", &v)?;
        }
        if let Some(v) = get("EXIT_THRESHOLD") {
            self.pairs.exit_threshold = parse("EXIT_THRESHOLD", &v)?;
        }
        if let Some(v) = get("RISK_FREE_RATE") {
            self.volatility.risk_free_rate = parse("RISK_FREE_RATE", &v)?;
        }
        if let Some(v) = get("MIN_VOLUME") {
            self.volatility.filter.min_volume = parse("MIN_VOLUME", &v)?;
        }
        if let Some(v) = get("EXPIRATION_FILTER") {
            self.volatility.filter.expiration = v.parse()?;
        }
        if let Some(v) = get("SOLVER_MAX_ITERATIONS") {
            self.volatility.solver.max_iterations = parse("SOLVER_MAX_ITERATIONS", &v)?;
        }
        if let Some(v) = get("SOLVER_TOLERANCE") {
            self.volatility.solver.tolerance = parse("SOLVER_TOLERANCE", &v)?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Check every section.
    ///
    /// # Errors
    /// Returns [`QuantLensError::ConfigurationError`] naming the first
    /// invalid field.
    pub fn validate(&self) -> crate::error::Result<()> {
        validate_unit_interval(
            self.clustering.min_correlation_periods,
            "min_correlation_periods",
        )?;
        self.pairs.validate()?;
        validate_finite(self.volatility.risk_free_rate, "risk_free_rate")?;
        self.volatility.solver.validate()?;
        Ok(())
    }
}
