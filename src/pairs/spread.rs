//! Spread construction, rolling z-scores and trading signals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::PairsConfig;
use crate::error::QuantLensError;
use crate::pairs::engine::{test_pair, CointegrationResult};
use crate::series::{stats, PriceTable};
use crate::types::Signal;
use crate::validate::{validate_finite, validate_same_len};

/// `a − β·b` elementwise. Missing inputs give missing spread values.
///
/// # Errors
/// Returns [`QuantLensError::ShapeError`] for unequal lengths.
pub fn spread(a: &[f64], b: &[f64], hedge_ratio: f64) -> crate::error::Result<Vec<f64>> {
    validate_same_len(a.len(), b.len(), "spread inputs")?;
    validate_finite(hedge_ratio, "hedge ratio")?;
    Ok(a.iter().zip(b).map(|(x, y)| x - hedge_ratio * y).collect())
}

/// Rolling z-score over `window` observations.
///
/// The first `window − 1` entries are `None`, as is any window containing a
/// missing value or with zero standard deviation.
///
/// # Errors
/// Returns [`QuantLensError::ConfigurationError`] if `window < 2`.
pub fn zscore(spread: &[f64], window: usize) -> crate::error::Result<Vec<Option<f64>>> {
    if window < 2 {
        return Err(QuantLensError::config(format!(
            "z-score window must be at least 2, got {window}"
        )));
    }
    let mut out = vec![None; spread.len().min(window - 1)];
    out.extend(spread.windows(window).map(|w| {
        if w.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let std = stats::sample_std(w);
        if std.is_nan() || std <= 0.0 {
            return None;
        }
        Some((w[window - 1] - stats::mean(w)) / std)
    }));
    Ok(out)
}

/// Entry and exit signals from z-scores.
///
/// `Short` where `z > entry`, `Long` where `z < −entry`; afterwards `Exit`
/// replaces any entry where `0 < |z| ≤ exit`. With `exit ≥ entry` exits
/// therefore override every entry signal.
///
/// # Errors
/// Returns [`QuantLensError::ConfigurationError`] for a negative or
/// non-finite threshold.
pub fn signals(
    zscores: &[Option<f64>],
    entry: f64,
    exit: f64,
) -> crate::error::Result<Vec<Option<Signal>>> {
    for (value, name) in [(entry, "entry threshold"), (exit, "exit threshold")] {
        if !value.is_finite() || value < 0.0 {
            return Err(QuantLensError::config(format!(
                "{name} must be finite and non-negative, got {value}"
            )));
        }
    }
    Ok(zscores
        .iter()
        .map(|z| {
            let z = (*z)?;
            let mut signal = if z > entry {
                Some(Signal::Short)
            } else if z < -entry {
                Some(Signal::Long)
            } else {
                None
            };
            if z.abs() > 0.0 && z.abs() <= exit {
                signal = Some(Signal::Exit);
            }
            signal
        })
        .collect())
}

/// One row of a spread analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadPoint {
    pub date: NaiveDate,
    pub spread: f64,
    pub zscore: Option<f64>,
    pub signal: Option<Signal>,
}

/// Summary of a spread series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadStatistics {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Spread, z-scores and signals of a pair with its cointegration test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadAnalysis {
    pub hedge_ratio: f64,
    pub half_life: f64,
    pub cointegration: CointegrationResult,
    pub points: Vec<SpreadPoint>,
    pub statistics: SpreadStatistics,
}

/// Test a pair, then build its spread, z-scores and signals.
///
/// Dates where either price is missing are dropped.
///
/// # Errors
/// Returns [`QuantLensError::ShapeError`] if `dates`, `a` and `b` differ in
/// length, plus the errors of [`test_pair`], [`zscore`] and [`signals`].
pub fn analyze_spread(
    dates: &[NaiveDate],
    a: &[f64],
    b: &[f64],
    config: &PairsConfig,
) -> crate::error::Result<SpreadAnalysis> {
    validate_same_len(dates.len(), a.len(), "dates and series A")?;
    validate_same_len(a.len(), b.len(), "series A and series B")?;
    config.validate()?;

    let cointegration = test_pair(a, b, config.significance_level)?;
    let hedge_ratio = cointegration.hedge_ratio;

    let rows: Vec<(NaiveDate, f64)> = dates
        .iter()
        .zip(a.iter().zip(b))
        .filter(|(_, (x, y))| x.is_finite() && y.is_finite())
        .map(|(d, (x, y))| (*d, x - hedge_ratio * y))
        .collect();
    let values: Vec<f64> = rows.iter().map(|(_, s)| *s).collect();
    let z = zscore(&values, config.window)?;
    let sig = signals(&z, config.entry_threshold, config.exit_threshold)?;

    let (min, max) = stats::min_max(&values);
    let statistics = SpreadStatistics {
        mean: stats::mean(&values),
        std: stats::sample_std(&values),
        min,
        max,
    };

    #[cfg(feature = "logging")]
    tracing::debug!(
        hedge_ratio,
        half_life = cointegration.half_life,
        signals = sig.iter().filter(|s| s.is_some()).count(),
        "spread analysis"
    );

    let points = rows
        .into_iter()
        .zip(z.into_iter().zip(sig))
        .map(|((date, spread), (zscore, signal))| SpreadPoint {
            date,
            spread,
            zscore,
            signal,
        })
        .collect();

    Ok(SpreadAnalysis {
        hedge_ratio,
        half_life: cointegration.half_life,
        cointegration,
        points,
        statistics,
    })
}

/// [`analyze_spread`] for two labelled columns of a price table.
///
/// # Errors
/// Returns [`QuantLensError::DataError`] if either label is absent.
pub fn analyze_pair(
    table: &PriceTable,
    asset_a: &str,
    asset_b: &str,
    config: &PairsConfig,
) -> crate::error::Result<SpreadAnalysis> {
    let column = |label: &str| {
        table
            .column(label)
            .ok_or_else(|| QuantLensError::data(format!("no price data for '{label}'")))
    };
    analyze_spread(table.dates(), column(asset_a)?, column(asset_b)?, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    // --- spread ---

    #[test]
    fn spread_subtracts_hedged_leg() {
        let s = spread(&[10.0, 12.0, f64::NAN], &[4.0, 5.0, 1.0], 2.0).unwrap();
        assert_eq!(s[..2], [2.0, 2.0]);
        assert!(s[2].is_nan());
        assert!(matches!(
            spread(&[1.0], &[1.0, 2.0], 1.0),
            Err(QuantLensError::ShapeError { .. })
        ));
    }

    // --- zscore ---

    #[test]
    fn zscore_warm_up_is_none() {
        let s: Vec<f64> = (0..10).map(|i| (i * i) as f64).collect();
        let z = zscore(&s, 4).unwrap();
        assert_eq!(z.len(), 10);
        assert!(z[..3].iter().all(Option::is_none));
        assert!(z[3..].iter().all(Option::is_some));
    }

    #[test]
    fn zscore_uses_sample_std() {
        let z = zscore(&[1.0, 2.0, 3.0], 3).unwrap();
        // mean 2, sample std 1.
        assert_abs_diff_eq!(z[2].unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn zscore_gaps_and_flat_windows_are_none() {
        let z = zscore(&[1.0, f64::NAN, 3.0, 4.0, 5.0, 5.0, 5.0], 3).unwrap();
        assert_eq!(z[2], None);
        assert_eq!(z[3], None);
        assert!(z[4].is_some());
        assert_eq!(z[6], None);
    }

    #[test]
    fn zscore_shorter_than_window() {
        assert_eq!(zscore(&[1.0, 2.0], 5).unwrap(), vec![None, None]);
    }

    #[test]
    fn zscore_window_must_be_two() {
        assert!(matches!(zscore(&[1.0], 1), Err(QuantLensError::ConfigurationError { .. })));
    }

    // --- signals ---

    #[test]
    fn signals_on_reference_segments() {
        let z = [Some(0.5), Some(2.5), Some(-2.5), Some(0.1), None, Some(0.0)];
        let s = signals(&z, 2.0, 0.2).unwrap();
        assert_eq!(
            s,
            vec![None, Some(Signal::Short), Some(Signal::Long), Some(Signal::Exit), None, None]
        );
    }

    #[test]
    fn signals_with_half_unit_exit_band() {
        let z = [Some(0.5), Some(2.5), Some(-2.5), Some(0.1)];
        let s = signals(&z, 2.0, 0.5).unwrap();
        // 0.5 sits on the exit boundary, and exits override entries.
        assert_eq!(
            s,
            vec![Some(Signal::Exit), Some(Signal::Short), Some(Signal::Long), Some(Signal::Exit)]
        );
    }

    #[test]
    fn zero_exit_threshold_never_exits() {
        let z = [Some(0.5), Some(2.5), Some(-2.5), Some(0.1)];
        let s = signals(&z, 2.0, 0.0).unwrap();
        assert_eq!(s, vec![None, Some(Signal::Short), Some(Signal::Long), None]);
    }

    #[test]
    fn exit_at_or_above_entry_overrides_entries() {
        let z = [Some(2.5), Some(-2.5), Some(3.5)];
        let s = signals(&z, 2.0, 3.0).unwrap();
        assert_eq!(s, vec![Some(Signal::Exit), Some(Signal::Exit), Some(Signal::Short)]);
    }

    #[test]
    fn negative_threshold_is_rejected() {
        assert!(matches!(
            signals(&[Some(1.0)], -1.0, 0.0),
            Err(QuantLensError::ConfigurationError { .. })
        ));
    }
}
