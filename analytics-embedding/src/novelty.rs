//! Novelty scoring: mean dissimilarity to the k nearest neighbors
//!
//! An item surrounded by near-duplicates scores close to 0; an item far
//! from everything scores toward 2. Scores are plain per-item numbers so
//! downstream metric passes can reuse them without touching the index.

use analytics_core::{AnalyticsError, CorpusSnapshot, Result};
use tracing::{debug, instrument};

use crate::index::{build_index, IndexConfig, Neighbor};

/// Computes per-item novelty scores over a corpus snapshot
#[derive(Debug, Clone, Default)]
pub struct NoveltyScorer {
    config: IndexConfig,
}

impl NoveltyScorer {
    pub fn new(config: IndexConfig) -> Self {
        Self { config }
    }

    /// Full neighbor lists for every item, k per item
    ///
    /// Builds the index once and fans out queries; metric passes that need
    /// several neighborhood sizes call this with the largest k and slice.
    #[instrument(skip(self, corpus), fields(n_items = corpus.len()))]
    pub fn neighborhoods(&self, corpus: &CorpusSnapshot, k: usize) -> Result<Vec<Vec<Neighbor>>> {
        if k == 0 {
            return Err(AnalyticsError::invalid_parameter(
                "k",
                "neighbor count must be at least 1",
            ));
        }
        let index = build_index(corpus, &self.config);
        let neighborhoods: Vec<Vec<Neighbor>> = (0..corpus.len())
            .map(|i| index.k_nearest(i, k))
            .collect();
        debug!(k, "neighborhoods computed");
        Ok(neighborhoods)
    }

    /// Novelty score per item: mean cosine distance to the k nearest
    ///
    /// Scores are in [0, 2]. Items with no other items to compare against
    /// (a single-item corpus) score 0.
    pub fn score(&self, corpus: &CorpusSnapshot, k: usize) -> Result<Vec<f64>> {
        let neighborhoods = self.neighborhoods(corpus, k)?;
        Ok(scores_from_neighborhoods(&neighborhoods, k))
    }
}

/// Mean distance over the first `k` neighbors of each precomputed list
pub fn scores_from_neighborhoods(neighborhoods: &[Vec<Neighbor>], k: usize) -> Vec<f64> {
    neighborhoods
        .iter()
        .map(|hits| {
            let take = hits.len().min(k);
            if take == 0 {
                return 0.0;
            }
            hits[..take].iter().map(|h| h.distance).sum::<f64>() / take as f64
        })
        .collect()
}

/// Distance to the k-th nearest neighbor per item (0.0 when fewer exist)
pub fn kth_neighbor_distances(neighborhoods: &[Vec<Neighbor>], k: usize) -> Vec<f64> {
    neighborhoods
        .iter()
        .map(|hits| {
            if k == 0 || hits.len() < k {
                hits.last().map(|h| h.distance).unwrap_or(0.0)
            } else {
                hits[k - 1].distance
            }
        })
        .collect()
}
