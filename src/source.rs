//! Market-data seam.
//!
//! The engines never fetch data themselves; a [`MarketData`] implementation
//! supplies aligned price history and raw option chains. Network adapters
//! live outside this crate. [`InMemoryMarketData`] serves tests and offline
//! analysis.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::QuantLensError;
use crate::series::{PriceSeries, PriceTable};
use crate::surface::RawContract;

/// An unprocessed option chain for one underlying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawChain {
    pub ticker: String,
    pub spot: f64,
    /// Rate quoted alongside the chain, if the source supplies one.
    #[serde(default)]
    pub risk_free_rate: Option<f64>,
    pub calls: Vec<RawContract>,
    pub puts: Vec<RawContract>,
    pub expirations: Vec<NaiveDate>,
}

impl RawChain {
    /// The chain's own rate when present and finite, otherwise `fallback`.
    pub fn rate_or(&self, fallback: f64) -> f64 {
        self.risk_free_rate
            .filter(|r| r.is_finite())
            .unwrap_or(fallback)
    }
}

/// Source of price history and option chains.
pub trait MarketData: Send + Sync {
    /// Prices for `tickers` between `start` and `end` inclusive, aligned on
    /// common dates.
    ///
    /// # Errors
    /// Returns [`QuantLensError::DataError`] if no data is available.
    fn price_history(
        &self,
        tickers: &[&str],
        start: NaiveDate,
        end: NaiveDate,
    ) -> crate::error::Result<PriceTable>;

    /// Current option chain for `ticker`.
    ///
    /// # Errors
    /// Returns [`QuantLensError::DataError`] if the chain is unavailable.
    fn options_chain(&self, ticker: &str) -> crate::error::Result<RawChain>;
}

/// A [`MarketData`] backed by series and chains held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMarketData {
    series: HashMap<String, PriceSeries>,
    chains: HashMap<String, RawChain>,
}

impl InMemoryMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a price series, keyed by its label.
    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.series.insert(series.label().to_owned(), series);
        self
    }

    /// Add or replace an option chain, keyed by its ticker.
    pub fn with_chain(mut self, chain: RawChain) -> Self {
        self.chains.insert(chain.ticker.clone(), chain);
        self
    }
}

impl MarketData for InMemoryMarketData {
    fn price_history(
        &self,
        tickers: &[&str],
        start: NaiveDate,
        end: NaiveDate,
    ) -> crate::error::Result<PriceTable> {
        if start > end {
            return Err(QuantLensError::config(format!(
                "start date {start} is after end date {end}"
            )));
        }
        let mut windowed = Vec::with_capacity(tickers.len());
        for &ticker in tickers {
            let Some(series) = self.series.get(ticker) else {
                #[cfg(feature = "logging")]
                tracing::warn!(ticker, "no price history");
                continue;
            };
            let points = series
                .points()
                .iter()
                .filter(|(d, _)| (start..=end).contains(d))
                .copied()
                .collect();
            windowed.push(PriceSeries::new(ticker, points)?);
        }
        if windowed.is_empty() {
            return Err(QuantLensError::data(format!(
                "no price history for any of {tickers:?}"
            )));
        }
        PriceTable::align(&windowed)
    }

    fn options_chain(&self, ticker: &str) -> crate::error::Result<RawChain> {
        self.chains
            .get(ticker)
            .cloned()
            .ok_or_else(|| QuantLensError::data(format!("no options data available for {ticker}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn series(label: &str, days: &[u32]) -> PriceSeries {
        PriceSeries::new(
            label,
            days.iter().map(|&d| (day(d), 100.0 + f64::from(d))).collect(),
        )
        .unwrap()
    }

    fn source() -> InMemoryMarketData {
        InMemoryMarketData::new()
            .with_series(series("AAA", &[1, 2, 3, 4, 5]))
            .with_series(series("BBB", &[2, 3, 4, 5, 6]))
    }

    #[test]
    fn price_history_windows_and_aligns() {
        let table = source()
            .price_history(&["AAA", "BBB"], day(1), day(4))
            .unwrap();
        assert_eq!(table.dates(), &[day(2), day(3), day(4)]);
        assert_eq!(table.n_assets(), 2);
    }

    #[test]
    fn unknown_tickers_are_reported_missing() {
        let table = source()
            .price_history(&["AAA", "ZZZ"], day(1), day(6))
            .unwrap();
        assert_eq!(table.missing_labels(&["AAA", "ZZZ"]), vec!["ZZZ".to_string()]);
    }

    #[test]
    fn no_data_is_an_error() {
        let err = source().price_history(&["ZZZ"], day(1), day(6)).unwrap_err();
        assert!(matches!(err, QuantLensError::DataError { .. }));
    }

    #[test]
    fn reversed_range_is_rejected() {
        let err = source().price_history(&["AAA"], day(6), day(1)).unwrap_err();
        assert!(matches!(err, QuantLensError::ConfigurationError { .. }));
    }

    #[test]
    fn chain_without_rate_uses_fallback() {
        let chain: RawChain = serde_json::from_str(
            r#"{"ticker":"XYZ","spot":100.0,"calls":[],"puts":[],"expirations":[]}"#,
        )
        .unwrap();
        assert_eq!(chain.risk_free_rate, None);
        assert_eq!(chain.rate_or(0.045), 0.045);

        let quoted = RawChain {
            risk_free_rate: Some(0.02),
            ..chain.clone()
        };
        assert_eq!(quoted.rate_or(0.045), 0.02);
        let broken = RawChain {
            risk_free_rate: Some(f64::INFINITY),
            ..chain
        };
        assert_eq!(broken.rate_or(0.045), 0.045);
    }

    #[test]
    fn missing_chain_is_data_error() {
        assert!(matches!(
            source().options_chain("AAA"),
            Err(QuantLensError::DataError { .. })
        ));
    }
}
