//! Hierarchical clustering of asset correlations.
//!
//! - [`CorrelationMatrix`] / [`DistanceMatrix`] — validated labelled matrices
//! - [`linkage`] — agglomerative clustering into a [`LinkageTree`]
//! - [`LinkageTree`] — leaf order, dendrogram and cluster map
//! - [`ClusterAnalysis`] / [`analyze_prices`] — the full pipeline

pub mod hrp;
pub mod linkage;
pub mod matrix;
pub mod tree;

pub use hrp::{analyze_prices, ClusterAnalysis, PriceClusterReport};
pub use linkage::{linkage, LinkageMethod};
pub use matrix::{heatmap_cells, seriate, to_distance, CorrelationMatrix, DistanceMatrix, HeatmapCell};
pub use tree::{DendrogramNode, LinkageTree, Merge};
