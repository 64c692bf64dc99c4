//! Adapter types for the external density-clustering library
//!
//! Node ids follow the condensed-tree convention: ids below `n_items`
//! are individual items (leaves), ids at or above it are merge events
//! (cluster-forming nodes). The structure is supposed to be a tree, but
//! it arrives from an external library and is never trusted to be one —
//! every traversal in this crate defends against cycles.

use std::collections::HashMap;

use analytics_core::{AnalyticsError, CorpusSnapshot, Result};
use serde::{Deserialize, Serialize};

/// Sentinel cluster label meaning "did not fit any cluster"
pub const NOISE_LABEL: i64 = -1;

/// One row of the condensed tree: a child absorbed into a parent node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CondensedTreeRow {
    /// Merge node the child was absorbed into
    pub parent: u64,
    /// Item (`< n_items`) or merge node (`>= n_items`) being absorbed
    pub child: u64,
    /// Density threshold at which the merge occurred
    pub lambda_val: f64,
    /// Members absorbed at this merge
    pub child_size: u64,
}

/// The condensed merge hierarchy, as a flat arena of integer-id rows
///
/// Serializes as its rows; rebuild via [`CondensedTree::new`] so the
/// parent map is derived again.
#[derive(Debug, Clone, Serialize)]
pub struct CondensedTree {
    rows: Vec<CondensedTreeRow>,
    n_items: u64,
    #[serde(skip)]
    parent: HashMap<u64, u64>,
}

impl CondensedTree {
    /// Build from the external library's row output
    ///
    /// Duplicate child rows keep the last parent seen; the simplifier's
    /// traversal guards handle anything stranger.
    pub fn new(rows: Vec<CondensedTreeRow>, n_items: u64) -> Self {
        let parent = rows.iter().map(|r| (r.child, r.parent)).collect();
        Self {
            rows,
            n_items,
            parent,
        }
    }

    /// Number of items (leaves); ids at or above this are merge nodes
    pub fn n_items(&self) -> u64 {
        self.n_items
    }

    /// All rows, in the order the library produced them
    pub fn rows(&self) -> &[CondensedTreeRow] {
        &self.rows
    }

    /// The parent of `node`, if it has one
    pub fn parent_of(&self, node: u64) -> Option<u64> {
        self.parent.get(&node).copied()
    }

    /// True when `node` is a merge event rather than an item leaf
    pub fn is_cluster_node(&self, node: u64) -> bool {
        node >= self.n_items
    }

    /// Estimated member count of a merge node
    ///
    /// Sum of `child_size` over rows whose parent is this node; 1 when no
    /// such rows exist (a leaf, or a node the library never expanded).
    pub fn aggregate_child_size(&self, node: u64) -> u64 {
        let sum: u64 = self
            .rows
            .iter()
            .filter(|r| r.parent == node)
            .map(|r| r.child_size)
            .sum();
        if sum == 0 {
            1
        } else {
            sum
        }
    }
}

/// The read-only product of one clustering run
#[derive(Debug, Clone, Serialize)]
pub struct ClusteringOutput {
    /// Flat cluster label per item; [`NOISE_LABEL`] marks noise
    pub labels: Vec<i64>,
    /// The condensed merge hierarchy
    pub tree: CondensedTree,
    /// Stability score per cluster label, where the library supplies one
    pub persistence: HashMap<i64, f64>,
}

impl ClusteringOutput {
    /// Validate the label array against the tree's leaf count
    pub fn new(
        labels: Vec<i64>,
        tree: CondensedTree,
        persistence: HashMap<i64, f64>,
    ) -> Result<Self> {
        if labels.len() as u64 != tree.n_items() {
            return Err(AnalyticsError::internal(format!(
                "clustering output inconsistent: {} labels for {} items",
                labels.len(),
                tree.n_items()
            )));
        }
        Ok(Self {
            labels,
            tree,
            persistence,
        })
    }

    /// Distinct non-noise labels present, sorted
    pub fn cluster_labels(&self) -> Vec<i64> {
        let mut labels: Vec<i64> = self
            .labels
            .iter()
            .copied()
            .filter(|&l| l != NOISE_LABEL)
            .collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }
}

/// Seam for the external density-clustering library
///
/// Implementations hand the normalized corpus to the library and adapt its
/// output into [`ClusteringOutput`]. The engine never re-runs clustering
/// itself; a cached output can be fed back in without re-deriving it.
pub trait DensityClusterer {
    fn cluster(&self, corpus: &CorpusSnapshot) -> Result<ClusteringOutput>;
}
