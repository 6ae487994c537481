//! Arena representation of a clustering tree.
//!
//! Node ids `0..n` are leaves; id `n + k` is the cluster created by the k-th
//! merge. The root is `2n − 2`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::QuantLensError;

/// One agglomeration step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Merge {
    /// Smaller child id.
    pub left: usize,
    /// Larger child id.
    pub right: usize,
    /// Inter-cluster distance at which the merge happened.
    pub height: f64,
    /// Number of leaves under the new cluster.
    pub size: usize,
}

/// Nested dendrogram node for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DendrogramNode {
    pub name: String,
    pub height: f64,
    pub children: Option<Vec<DendrogramNode>>,
}

/// Immutable result of [`linkage`](crate::cluster::linkage).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkageTree {
    n_leaves: usize,
    merges: Vec<Merge>,
}

impl LinkageTree {
    pub(crate) fn from_merges(n_leaves: usize, merges: Vec<Merge>) -> Self {
        Self { n_leaves, merges }
    }

    pub fn n_leaves(&self) -> usize {
        self.n_leaves
    }

    /// Merges in creation order; `merges()[k]` created node `n + k`.
    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Root node id.
    pub fn root(&self) -> usize {
        self.n_leaves + self.merges.len() - 1
    }

    /// Children of an internal node, `None` for leaves and unknown ids.
    pub fn children(&self, id: usize) -> Option<(usize, usize)> {
        let k = id.checked_sub(self.n_leaves)?;
        self.merges.get(k).map(|m| (m.left, m.right))
    }

    /// Leaf indices in left-then-right traversal order from the root.
    pub fn leaf_order(&self) -> Vec<usize> {
        self.leaves_under(self.root())
    }

    /// Leaf indices under `id` in left-then-right order.
    pub fn leaves_under(&self, id: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            match self.children(node) {
                Some((left, right)) => {
                    stack.push(right);
                    stack.push(left);
                }
                None if node < self.n_leaves => out.push(node),
                None => {}
            }
        }
        out
    }

    fn check_labels(&self, labels: &[String]) -> crate::error::Result<()> {
        if labels.len() != self.n_leaves {
            return Err(QuantLensError::shape(format!(
                "{} labels for a tree with {} leaves",
                labels.len(),
                self.n_leaves
            )));
        }
        Ok(())
    }

    /// Nested dendrogram; internal nodes are named `cluster_<id>`.
    ///
    /// # Errors
    /// Returns [`QuantLensError::ShapeError`] if the label count differs from
    /// the leaf count.
    pub fn dendrogram(&self, labels: &[String]) -> crate::error::Result<DendrogramNode> {
        self.check_labels(labels)?;
        Ok(self.node(self.root(), labels))
    }

    fn node(&self, id: usize, labels: &[String]) -> DendrogramNode {
        match self.children(id) {
            Some((left, right)) => DendrogramNode {
                name: format!("cluster_{id}"),
                height: self.merges[id - self.n_leaves].height,
                children: Some(vec![self.node(left, labels), self.node(right, labels)]),
            },
            None => DendrogramNode {
                name: labels[id].clone(),
                height: 0.0,
                children: None,
            },
        }
    }

    /// Leaf labels under every internal node, keyed by node id.
    ///
    /// # Errors
    /// Returns [`QuantLensError::ShapeError`] if the label count differs from
    /// the leaf count.
    pub fn cluster_map(&self, labels: &[String]) -> crate::error::Result<BTreeMap<usize, Vec<String>>> {
        self.check_labels(labels)?;
        let n = self.n_leaves;
        let mut members: Vec<Vec<usize>> = Vec::with_capacity(self.merges.len());
        for m in &self.merges {
            let side = |id: usize| -> Vec<usize> {
                if id < n { vec![id] } else { members[id - n].clone() }
            };
            let mut leaves = side(m.left);
            leaves.extend(side(m.right));
            members.push(leaves);
        }
        Ok(members
            .into_iter()
            .enumerate()
            .map(|(k, leaves)| (n + k, leaves.into_iter().map(|i| labels[i].clone()).collect()))
            .collect())
    }
}
