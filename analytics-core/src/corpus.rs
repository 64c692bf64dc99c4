//! Validated corpus snapshot
//!
//! Every pipeline stage reads from one [`CorpusSnapshot`]: the full item
//! set, loaded once per run, with embeddings validated for consistent
//! width and L2-normalized up front. Nothing mutates the snapshot after
//! construction; a new run builds a new one.

use crate::error::{AnalyticsError, Result};
use crate::item::MarketItem;
use crate::platform::Platform;

/// Immutable, validated item set for one analytics run
#[derive(Debug, Clone)]
pub struct CorpusSnapshot {
    items: Vec<MarketItem>,
    dimension: usize,
}

impl CorpusSnapshot {
    /// Build a snapshot from loaded items
    ///
    /// Fails with [`AnalyticsError::EmptyInput`] on an empty item set and
    /// [`AnalyticsError::DimensionMismatch`] when embedding widths differ.
    /// Embeddings are L2-normalized in place; zero vectors are left as-is
    /// (their cosine similarity to anything is 0 by the downstream guard).
    pub fn new(mut items: Vec<MarketItem>) -> Result<Self> {
        if items.is_empty() {
            return Err(AnalyticsError::EmptyInput);
        }

        let dimension = items[0].embedding.len();
        if dimension == 0 {
            return Err(AnalyticsError::EmptyInput);
        }

        for item in &items {
            if item.embedding.len() != dimension {
                return Err(AnalyticsError::DimensionMismatch {
                    expected: dimension,
                    actual: item.embedding.len(),
                });
            }
        }

        for item in &mut items {
            normalize(&mut item.embedding);
        }

        Ok(Self { items, dimension })
    }

    /// Number of items in the corpus
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the snapshot holds no items (never, post-construction)
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Embedding width shared by every item
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// The normalized embedding of item `i`
    pub fn embedding(&self, i: usize) -> &[f32] {
        &self.items[i].embedding
    }

    /// All items, in load order
    pub fn items(&self) -> &[MarketItem] {
        &self.items
    }

    /// The item at index `i`
    pub fn item(&self, i: usize) -> &MarketItem {
        &self.items[i]
    }

    /// Distinct platforms present in the corpus, sorted
    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<Platform> = self.items.iter().map(|m| m.platform).collect();
        platforms.sort();
        platforms.dedup();
        platforms
    }
}

/// L2-normalize a vector in place; zero vectors are left untouched
fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
