//! Cointegration testing and spread analysis for pair trading.
//!
//! - [`ols`] / [`hedge_ratio`] / [`half_life`] — regression utilities
//! - [`engle_granger`] — residual ADF test with MacKinnon p-values
//! - [`test_pair`] — validated single-pair test returning a [`CointegrationResult`]
//! - [`spread`] / [`zscore`] / [`signals`] / [`analyze_spread`] — signal generation
//! - [`scan_pairs`] — every pair of a [`PriceTable`](crate::series::PriceTable)

pub mod adf;
pub mod engine;
pub mod regression;
pub mod scan;
pub mod spread;

pub use adf::{engle_granger, AdfResult, CriticalValues, EngleGranger};
pub use engine::{test_pair, CointegrationResult};
pub use regression::{half_life, hedge_ratio, ols, OlsFit};
pub use scan::{scan_pairs, CointegratedPair, PairScan};
pub use spread::{
    analyze_pair, analyze_spread, signals, spread, zscore, SpreadAnalysis, SpreadPoint,
    SpreadStatistics,
};
