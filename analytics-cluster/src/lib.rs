//! Density-clustering integration for the analytics pipeline
//!
//! The clustering algorithm itself is an external library; this crate owns
//! the adapter types its output flows through (flat labels, the condensed
//! merge tree, per-cluster persistence) and the tree simplifier that
//! compresses a condensed tree with thousands of nodes into a small,
//! labeled subtree a renderer can display.

pub mod simplify;
pub mod types;

pub use simplify::{
    simplify, AncestorFailure, NodeKind, SelectionMode, SimplifiedNode, SimplifiedTree,
    SimplifyConfig,
};
pub use types::{
    ClusteringOutput, CondensedTree, CondensedTreeRow, DensityClusterer, NOISE_LABEL,
};
