//! Embedding-space primitives for the analytics pipeline
//!
//! This crate owns everything that touches raw embedding vectors:
//! - Cosine similarity and distance
//! - Nearest-neighbor indexes (exact, and an approximate clustered index
//!   for large corpora)
//! - The novelty scorer: mean dissimilarity to the k nearest neighbors
//! - Local Outlier Factor over the same neighborhoods

pub mod index;
pub mod novelty;
pub mod outlier;
pub mod similarity;

pub use index::{build_index, ClusteredIndex, ExactIndex, IndexConfig, Neighbor, NeighborIndex};
pub use novelty::NoveltyScorer;
pub use outlier::local_outlier_factor;
pub use similarity::{cosine_distance, cosine_similarity};
