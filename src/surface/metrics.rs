//! Summary metrics over a solved chain.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::series::stats;
use crate::surface::chain::SurfacePoint;

/// Moneyness below which a put counts as out of the money for skew.
pub const OTM_PUT_MONEYNESS: f64 = 0.95;

/// Moneyness above which a call counts as out of the money for skew.
pub const OTM_CALL_MONEYNESS: f64 = 1.05;

/// Spread of solved implied vols on one side of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IvRange {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation; 0 with a single solved contract.
    pub std: f64,
}

impl IvRange {
    fn from_vols(vols: &[f64]) -> Option<Self> {
        if vols.is_empty() {
            return None;
        }
        let (min, max) = stats::min_max(vols);
        let std = stats::sample_std(vols);
        Some(Self {
            min,
            max,
            mean: stats::mean(vols),
            std: if std.is_finite() { std } else { 0.0 },
        })
    }
}

/// Surface-level summary of solved calls and puts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SurfaceMetrics {
    pub atm_call_iv: Option<f64>,
    pub atm_put_iv: Option<f64>,
    pub atm_iv_avg: Option<f64>,
    /// Mean OTM put IV minus mean OTM call IV.
    pub put_call_skew: Option<f64>,
    pub iv_range_calls: Option<IvRange>,
    pub iv_range_puts: Option<IvRange>,
    pub total_call_contracts: usize,
    pub total_put_contracts: usize,
    pub successful_call_ivs: usize,
    pub successful_put_ivs: usize,
    pub expiration_dates: Vec<NaiveDate>,
}

fn solved(points: &[SurfacePoint]) -> Vec<(f64, f64)> {
    points
        .iter()
        .filter_map(|p| p.implied_volatility.map(|iv| (p.contract.moneyness, iv)))
        .collect()
}

/// IV of the contract closest to the money; the first one wins ties.
fn atm_iv(solved: &[(f64, f64)]) -> Option<f64> {
    let mut best: Option<(f64, f64)> = None;
    for &(m, iv) in solved {
        let dist = (m - 1.0).abs();
        if best.is_none_or(|(d, _)| dist < d) {
            best = Some((dist, iv));
        }
    }
    best.map(|(_, iv)| iv)
}

fn mean_where(solved: &[(f64, f64)], keep: impl Fn(f64) -> bool) -> Option<f64> {
    let vols: Vec<f64> = solved
        .iter()
        .filter(|(m, _)| keep(*m))
        .map(|(_, iv)| *iv)
        .collect();
    (!vols.is_empty()).then(|| stats::mean(&vols))
}

/// Compute [`SurfaceMetrics`] for solved calls and puts.
pub fn surface_metrics(calls: &[SurfacePoint], puts: &[SurfacePoint]) -> SurfaceMetrics {
    let solved_calls = solved(calls);
    let solved_puts = solved(puts);

    let atm_call_iv = atm_iv(&solved_calls);
    let atm_put_iv = atm_iv(&solved_puts);
    let atm_iv_avg = match (atm_call_iv, atm_put_iv) {
        (Some(c), Some(p)) => Some(0.5 * (c + p)),
        (one, other) => one.or(other),
    };

    let put_call_skew = match (
        mean_where(&solved_puts, |m| m < OTM_PUT_MONEYNESS),
        mean_where(&solved_calls, |m| m > OTM_CALL_MONEYNESS),
    ) {
        (Some(put), Some(call)) => Some(put - call),
        _ => None,
    };

    let call_vols: Vec<f64> = solved_calls.iter().map(|(_, iv)| *iv).collect();
    let put_vols: Vec<f64> = solved_puts.iter().map(|(_, iv)| *iv).collect();

    let expiration_dates: BTreeSet<NaiveDate> = calls
        .iter()
        .chain(puts)
        .map(|p| p.contract.expiration)
        .collect();

    SurfaceMetrics {
        atm_call_iv,
        atm_put_iv,
        atm_iv_avg,
        put_call_skew,
        iv_range_calls: IvRange::from_vols(&call_vols),
        iv_range_puts: IvRange::from_vols(&put_vols),
        total_call_contracts: calls.len(),
        total_put_contracts: puts.len(),
        successful_call_ivs: solved_calls.len(),
        successful_put_ivs: solved_puts.len(),
        expiration_dates: expiration_dates.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::chain::OptionContract;
    use approx::assert_abs_diff_eq;

    fn point(moneyness: f64, iv: Option<f64>, expiration: NaiveDate) -> SurfacePoint {
        SurfacePoint {
            contract: OptionContract {
                strike: 100.0 * moneyness,
                bid: 1.0,
                ask: 1.2,
                mid_price: 1.1,
                volume: 10,
                open_interest: 0,
                expiration,
                time_to_expiry: 0.25,
                moneyness,
            },
            implied_volatility: iv,
        }
    }

    fn exp(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn atm_picks_closest_solved_contract() {
        let calls = vec![
            point(0.90, Some(0.30), exp(21)),
            point(1.00, None, exp(21)),
            point(1.02, Some(0.22), exp(21)),
            point(0.98, Some(0.24), exp(21)),
        ];
        let m = surface_metrics(&calls, &[]);
        // 1.02 and 0.98 tie; the first solved one wins.
        assert_eq!(m.atm_call_iv, Some(0.22));
        assert_eq!(m.atm_put_iv, None);
        assert_eq!(m.atm_iv_avg, Some(0.22));
        assert_eq!(m.successful_call_ivs, 3);
        assert_eq!(m.total_call_contracts, 4);
    }

    #[test]
    fn skew_is_otm_put_minus_otm_call() {
        let calls = vec![
            point(1.00, Some(0.20), exp(21)),
            point(1.10, Some(0.18), exp(21)),
            point(1.20, Some(0.16), exp(21)),
        ];
        let puts = vec![
            point(0.80, Some(0.30), exp(21)),
            point(0.90, Some(0.26), exp(21)),
            point(1.00, Some(0.21), exp(21)),
        ];
        let m = surface_metrics(&calls, &puts);
        assert_abs_diff_eq!(m.put_call_skew.unwrap(), 0.28 - 0.17, epsilon = 1e-12);
        assert_abs_diff_eq!(m.atm_iv_avg.unwrap(), 0.205, epsilon = 1e-12);
    }

    #[test]
    fn skew_absent_without_otm_contracts() {
        let calls = vec![point(1.00, Some(0.20), exp(21))];
        let puts = vec![point(0.80, Some(0.30), exp(21))];
        assert_eq!(surface_metrics(&calls, &puts).put_call_skew, None);
    }

    #[test]
    fn single_vol_range_has_zero_std() {
        let calls = vec![point(1.0, Some(0.2), exp(21))];
        let range = surface_metrics(&calls, &[]).iv_range_calls.unwrap();
        assert_eq!(range.std, 0.0);
        assert_eq!(range.min, 0.2);
        assert_eq!(range.max, 0.2);
    }

    #[test]
    fn range_statistics() {
        let puts = vec![
            point(0.9, Some(0.2), exp(21)),
            point(1.0, Some(0.3), exp(21)),
            point(1.1, Some(0.4), exp(21)),
        ];
        let range = surface_metrics(&[], &puts).iv_range_puts.unwrap();
        assert_abs_diff_eq!(range.mean, 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(range.std, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn expirations_are_sorted_and_unique() {
        let calls = vec![point(1.0, None, exp(21)), point(1.0, None, exp(7))];
        let puts = vec![point(1.0, None, exp(21)), point(1.0, None, exp(14))];
        let m = surface_metrics(&calls, &puts);
        assert_eq!(m.expiration_dates, vec![exp(7), exp(14), exp(21)]);
        assert!(m.iv_range_calls.is_none());
        assert!(m.atm_iv_avg.is_none());
    }
}
