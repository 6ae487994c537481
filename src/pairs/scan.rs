//! Cointegration scan over every pair of a price table.

use serde::{Deserialize, Serialize};

use crate::error::QuantLensError;
use crate::pairs::engine::{test_pair, CointegrationResult};
use crate::series::PriceTable;
use crate::validate::validate_unit_interval;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A pair that passed the scan threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CointegratedPair {
    pub asset_a: String,
    pub asset_b: String,
    #[serde(flatten)]
    pub result: CointegrationResult,
}

/// Outcome of [`scan_pairs`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairScan {
    /// Pairs with `p < threshold`, ascending by p-value.
    pub pairs: Vec<CointegratedPair>,
    pub total_tested: usize,
    /// Pairs whose test returned an error.
    pub failures: usize,
    pub count: usize,
}

/// Test all unordered pairs `(i < j)` and keep those with `p < p_threshold`.
///
/// Each pair is tested independently; a failing pair is logged and counted
/// without affecting the others.
///
/// # Errors
/// Returns [`QuantLensError::DataError`] for fewer than two assets and
/// [`QuantLensError::ConfigurationError`] if `p_threshold ∉ (0, 1)`.
pub fn scan_pairs(table: &PriceTable, p_threshold: f64) -> crate::error::Result<PairScan> {
    validate_unit_interval(p_threshold, "p-value threshold")?;
    let n = table.n_assets();
    if n < 2 {
        return Err(QuantLensError::data(format!(
            "need at least 2 assets to scan pairs, got {n}"
        )));
    }

    let combos: Vec<(usize, usize)> = (0..n)
        .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
        .collect();
    let columns = table.columns();
    let labels = table.labels();

    let run = |&(i, j): &(usize, usize)| (i, j, test_pair(&columns[i], &columns[j], p_threshold));

    #[cfg(feature = "parallel")]
    let outcomes: Vec<_> = combos.par_iter().map(run).collect();
    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<_> = combos.iter().map(run).collect();

    let mut failures = 0;
    let mut pairs = Vec::new();
    for (i, j, outcome) in outcomes {
        match outcome {
            Ok(result) if result.p_value < p_threshold => pairs.push(CointegratedPair {
                asset_a: labels[i].clone(),
                asset_b: labels[j].clone(),
                result,
            }),
            Ok(_) => {}
            Err(_err) => {
                #[cfg(feature = "logging")]
                tracing::warn!(
                    asset_a = %labels[i],
                    asset_b = %labels[j],
                    error = %_err,
                    "pair test failed"
                );
                failures += 1;
            }
        }
    }
    pairs.sort_by(|a, b| a.result.p_value.total_cmp(&b.result.p_value));

    #[cfg(feature = "logging")]
    tracing::info!(
        total = combos.len(),
        cointegrated = pairs.len(),
        failures,
        "pair scan complete"
    );

    Ok(PairScan {
        count: pairs.len(),
        pairs,
        total_tested: combos.len(),
        failures,
    })
}
