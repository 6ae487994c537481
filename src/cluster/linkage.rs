//! Agglomerative hierarchical clustering.
//!
//! Starts from N singleton clusters and repeatedly merges the closest active
//! pair. After each merge the distances to the new cluster follow the
//! Lance-Williams recurrence of the chosen [`LinkageMethod`]:
//!
//! ```text
//! single    d(u, v) = min(d(s, v), d(t, v))
//! complete  d(u, v) = max(d(s, v), d(t, v))
//! average   d(u, v) = (|s|·d(s, v) + |t|·d(t, v)) / (|s| + |t|)
//! ward      d(u, v) = √(((|v|+|s|)·d(s, v)² + (|v|+|t|)·d(t, v)² − |v|·d(s, t)²) / (|s|+|t|+|v|))
//! ```
//!
//! where `u = s ∪ t`. Ties are broken by the lowest slot index in row-major
//! order, and the merged cluster occupies the lower of the two slots.
//!
//! # References
//! - Müllner, D. "Modern hierarchical, agglomerative clustering algorithms" (2011)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cluster::matrix::DistanceMatrix;
use crate::cluster::tree::{LinkageTree, Merge};
use crate::error::QuantLensError;

/// Inter-cluster distance update rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkageMethod {
    /// Nearest neighbour.
    Single,
    /// Farthest neighbour.
    Complete,
    /// UPGMA.
    Average,
    /// Minimum variance.
    #[default]
    Ward,
}

impl LinkageMethod {
    /// Distance from the merged cluster `s ∪ t` to another cluster `v`.
    fn update(self, d_sv: f64, d_tv: f64, d_st: f64, n_s: f64, n_t: f64, n_v: f64) -> f64 {
        match self {
            Self::Single => d_sv.min(d_tv),
            Self::Complete => d_sv.max(d_tv),
            Self::Average => (n_s * d_sv + n_t * d_tv) / (n_s + n_t),
            Self::Ward => {
                let t = n_s + n_t + n_v;
                (((n_v + n_s) * d_sv * d_sv + (n_v + n_t) * d_tv * d_tv - n_v * d_st * d_st) / t)
                    .max(0.0)
                    .sqrt()
            }
        }
    }
}

impl fmt::Display for LinkageMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Single => "single",
            Self::Complete => "complete",
            Self::Average => "average",
            Self::Ward => "ward",
        })
    }
}

impl FromStr for LinkageMethod {
    type Err = QuantLensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "complete" => Ok(Self::Complete),
            "average" => Ok(Self::Average),
            "ward" => Ok(Self::Ward),
            other => Err(QuantLensError::config(format!(
                "unknown linkage method '{other}' (expected single, complete, average or ward)"
            ))),
        }
    }
}

/// Cluster a distance matrix.
///
/// # Errors
/// Returns [`QuantLensError::DataError`] for fewer than two items or any
/// non-finite distance.
///
/// # Examples
/// ```
/// use nalgebra::DMatrix;
/// use quantlens::cluster::{linkage, DistanceMatrix, LinkageMethod};
///
/// let d = DMatrix::from_row_slice(3, 3, &[
///     0.0, 1.0, 4.0,
///     1.0, 0.0, 3.0,
///     4.0, 3.0, 0.0,
/// ]);
/// let labels = vec!["a".into(), "b".into(), "c".into()];
/// let tree = linkage(&DistanceMatrix::new(labels, d)?, LinkageMethod::Single)?;
/// assert_eq!(tree.merges()[0].height, 1.0);
/// assert_eq!(tree.merges()[1].height, 3.0);
/// assert_eq!(tree.leaf_order(), vec![2, 0, 1]);
/// # Ok::<(), quantlens::QuantLensError>(())
/// ```
pub fn linkage(
    distance: &DistanceMatrix,
    method: LinkageMethod,
) -> crate::error::Result<LinkageTree> {
    let n = distance.len();
    if n < 2 {
        return Err(QuantLensError::data(format!(
            "need at least 2 items to cluster, got {n}"
        )));
    }
    let values = distance.values();
    if values.iter().any(|v| !v.is_finite()) {
        return Err(QuantLensError::data("distance matrix contains non-finite values"));
    }

    let mut d: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| values[(i, j)]).collect())
        .collect();
    let mut active = vec![true; n];
    let mut ids: Vec<usize> = (0..n).collect();
    let mut sizes = vec![1usize; n];
    let mut merges = Vec::with_capacity(n - 1);

    for k in 0..n - 1 {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in (0..n).filter(|&i| active[i]) {
            for j in ((i + 1)..n).filter(|&j| active[j]) {
                if best.is_none_or(|(_, _, min)| d[i][j] < min) {
                    best = Some((i, j, d[i][j]));
                }
            }
        }
        let Some((s, t, height)) = best else {
            break;
        };

        let (n_s, n_t) = (sizes[s] as f64, sizes[t] as f64);
        for v in (0..n).filter(|&v| active[v] && v != s && v != t) {
            let updated = method.update(d[s][v], d[t][v], height, n_s, n_t, sizes[v] as f64);
            d[s][v] = updated;
            d[v][s] = updated;
        }

        merges.push(Merge {
            left: ids[s].min(ids[t]),
            right: ids[s].max(ids[t]),
            height,
            size: sizes[s] + sizes[t],
        });
        active[t] = false;
        ids[s] = n + k;
        sizes[s] += sizes[t];
    }

    #[cfg(feature = "logging")]
    tracing::debug!(
        n_items = n,
        method = %method,
        root_height = merges.last().map(|m| m.height),
        "linkage complete"
    );

    Ok(LinkageTree::from_merges(n, merges))
}
