//! End-to-end hierarchical clustering of asset correlations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cluster::linkage::{linkage, LinkageMethod};
use crate::cluster::matrix::{CorrelationMatrix, HeatmapCell};
use crate::cluster::tree::{DendrogramNode, LinkageTree};
use crate::error::QuantLensError;
use crate::series::PriceTable;

/// Minimum number of assets for a price-based cluster analysis.
pub const MIN_ASSETS: usize = 3;

/// Clustering of a correlation matrix with its seriated view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAnalysis {
    pub method: LinkageMethod,
    pub tree: LinkageTree,
    /// Leaf indices in dendrogram order.
    pub order: Vec<usize>,
    pub ordered_labels: Vec<String>,
    /// Correlations with rows and columns in dendrogram order.
    pub seriated: CorrelationMatrix,
    pub dendrogram: DendrogramNode,
    pub cluster_map: BTreeMap<usize, Vec<String>>,
    pub heatmap: Vec<HeatmapCell>,
}

impl ClusterAnalysis {
    /// Distance → linkage → leaf order → seriation → dendrogram → cluster map.
    ///
    /// # Errors
    /// Propagates [`linkage`] errors.
    pub fn run(corr: &CorrelationMatrix, method: LinkageMethod) -> crate::error::Result<Self> {
        let tree = linkage(&corr.to_distance(), method)?;
        let order = tree.leaf_order();
        let seriated = corr.seriate(&order)?;
        let dendrogram = tree.dendrogram(corr.labels())?;
        let cluster_map = tree.cluster_map(corr.labels())?;
        let heatmap = seriated.heatmap_cells();

        #[cfg(feature = "logging")]
        tracing::info!(
            n_assets = corr.len(),
            method = %method,
            "cluster analysis complete"
        );

        Ok(Self {
            method,
            tree,
            ordered_labels: seriated.labels().to_vec(),
            order,
            seriated,
            dendrogram,
            cluster_map,
            heatmap,
        })
    }
}

/// Cluster analysis of a price table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceClusterReport {
    /// Correlations in the table's original asset order.
    pub correlation: CorrelationMatrix,
    pub analysis: ClusterAnalysis,
    /// Number of return rows behind the correlations.
    pub data_points: usize,
}

/// Returns → correlation → [`ClusterAnalysis`].
///
/// `min_correlation_periods` is the fraction of return rows every asset pair
/// must overlap on.
///
/// # Errors
/// - [`QuantLensError::DataError`] — fewer than [`MIN_ASSETS`] assets, too
///   few return rows, or an unresolvable correlation
/// - [`QuantLensError::ConfigurationError`] — `min_correlation_periods`
///   outside `(0, 1)`
pub fn analyze_prices(
    table: &PriceTable,
    method: LinkageMethod,
    min_correlation_periods: f64,
) -> crate::error::Result<PriceClusterReport> {
    if table.n_assets() < MIN_ASSETS {
        return Err(QuantLensError::data(format!(
            "need at least {MIN_ASSETS} assets with valid data, got {}",
            table.n_assets()
        )));
    }
    let returns = table.returns()?;
    let correlation = returns.correlation_with_coverage(min_correlation_periods)?;
    let analysis = ClusterAnalysis::run(&correlation, method)?;
    Ok(PriceClusterReport {
        correlation,
        analysis,
        data_points: returns.n_rows(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn block_corr() -> CorrelationMatrix {
        // A and C move together, B and D move together.
        let v = [
            1.0, 0.1, 0.9, 0.0, //
            0.1, 1.0, 0.2, 0.8, //
            0.9, 0.2, 1.0, 0.1, //
            0.0, 0.8, 0.1, 1.0,
        ];
        let labels = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        CorrelationMatrix::new(labels, DMatrix::from_row_slice(4, 4, &v)).unwrap()
    }

    #[test]
    fn groups_correlated_blocks() {
        let analysis = ClusterAnalysis::run(&block_corr(), LinkageMethod::Average).unwrap();
        assert_eq!(analysis.ordered_labels, vec!["A", "C", "B", "D"]);
        assert_eq!(analysis.cluster_map[&4], vec!["A", "C"]);
        assert_eq!(analysis.cluster_map[&5], vec!["B", "D"]);
        assert_eq!(analysis.cluster_map.len(), 3);
    }

    #[test]
    fn seriated_matrix_follows_order() {
        let corr = block_corr();
        let analysis = ClusterAnalysis::run(&corr, LinkageMethod::Ward).unwrap();
        for (i, &oi) in analysis.order.iter().enumerate() {
            for (j, &oj) in analysis.order.iter().enumerate() {
                assert_eq!(analysis.seriated.values()[(i, j)], corr.values()[(oi, oj)]);
            }
        }
        assert_eq!(analysis.heatmap.len(), 16);
        assert_eq!(analysis.heatmap[0].x, analysis.ordered_labels[0]);
    }

    #[test]
    fn analyze_prices_needs_three_assets() {
        let table = PriceTable::new(
            vec!["A".into(), "B".into()],
            Vec::new(),
            vec![Vec::new(), Vec::new()],
        )
        .unwrap();
        let err = analyze_prices(&table, LinkageMethod::Ward, 0.8).unwrap_err();
        assert!(matches!(err, QuantLensError::DataError { .. }));
    }
}
