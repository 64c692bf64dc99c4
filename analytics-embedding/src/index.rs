//! Nearest-neighbor indexes over the corpus embedding matrix
//!
//! Two implementations behind one trait: an exhaustive scan for small
//! corpora, and an inverted-list index over k-means centroids for large
//! ones. The accuracy/speed trade-off belongs to the caller via
//! [`IndexConfig`]; nothing in here picks thresholds silently.

use analytics_core::CorpusSnapshot;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use tracing::debug;

use crate::similarity::cosine_distance;

/// One neighbor hit: corpus index plus cosine distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index of the neighbor in the corpus
    pub index: usize,
    /// Cosine distance to the query item, in [0, 2]
    pub distance: f64,
}

/// Nearest-neighbor lookup over a fixed corpus
///
/// Queries are by corpus index; the query item itself is never returned.
/// Results come back ascending by distance, ties broken by index so that
/// repeated runs are identical.
pub trait NeighborIndex {
    /// The k nearest other items to item `query`
    fn k_nearest(&self, query: usize, k: usize) -> Vec<Neighbor>;

    /// The k nearest other items satisfying `filter`
    ///
    /// Used for cross-platform lookups (e.g. "nearest items belonging to
    /// any other platform").
    fn k_nearest_filtered(
        &self,
        query: usize,
        k: usize,
        filter: &dyn Fn(usize) -> bool,
    ) -> Vec<Neighbor>;
}

/// Configuration for index construction
#[derive(Debug, Clone, Copy)]
pub struct IndexConfig {
    /// Corpus size at and above which the approximate index is used
    pub approximate_threshold: usize,
    /// Number of centroid lists probed per query (approximate index only)
    pub n_probe: usize,
    /// Seed for centroid initialization (approximate index only)
    pub seed: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            approximate_threshold: 5000,
            n_probe: 8,
            seed: 42,
        }
    }
}

/// Build the appropriate index for the corpus size
pub fn build_index<'a>(
    corpus: &'a CorpusSnapshot,
    config: &IndexConfig,
) -> Box<dyn NeighborIndex + 'a> {
    if corpus.len() >= config.approximate_threshold {
        debug!(
            n_items = corpus.len(),
            n_probe = config.n_probe,
            "building approximate clustered index"
        );
        Box::new(ClusteredIndex::build(corpus, config))
    } else {
        debug!(n_items = corpus.len(), "building exact index");
        Box::new(ExactIndex::new(corpus))
    }
}

/// Exhaustive-scan index; exact results, O(n) per query
pub struct ExactIndex<'a> {
    corpus: &'a CorpusSnapshot,
}

impl<'a> ExactIndex<'a> {
    pub fn new(corpus: &'a CorpusSnapshot) -> Self {
        Self { corpus }
    }
}

impl NeighborIndex for ExactIndex<'_> {
    fn k_nearest(&self, query: usize, k: usize) -> Vec<Neighbor> {
        self.k_nearest_filtered(query, k, &|_| true)
    }

    fn k_nearest_filtered(
        &self,
        query: usize,
        k: usize,
        filter: &dyn Fn(usize) -> bool,
    ) -> Vec<Neighbor> {
        let q = self.corpus.embedding(query);
        let mut hits: Vec<Neighbor> = (0..self.corpus.len())
            .filter(|&i| i != query && filter(i))
            .map(|i| Neighbor {
                index: i,
                distance: cosine_distance(q, self.corpus.embedding(i)),
            })
            .collect();
        sort_and_truncate(&mut hits, k);
        hits
    }
}

/// Inverted-list approximate index over k-means centroids
///
/// Centroids are seeded from the corpus with a fixed-seed RNG and refined
/// with two assignment/update passes; each query scans only the `n_probe`
/// nearest lists. Recall is high on normalized embeddings but not exact.
pub struct ClusteredIndex<'a> {
    corpus: &'a CorpusSnapshot,
    centroids: Vec<Vec<f32>>,
    lists: Vec<Vec<usize>>,
    n_probe: usize,
}

impl<'a> ClusteredIndex<'a> {
    /// Build the index; `⌈√n⌉` centroids, two refinement passes
    pub fn build(corpus: &'a CorpusSnapshot, config: &IndexConfig) -> Self {
        let n = corpus.len();
        let n_centroids = (n as f64).sqrt().ceil() as usize;
        let n_centroids = n_centroids.clamp(1, n);

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut centroids: Vec<Vec<f32>> = sample(&mut rng, n, n_centroids)
            .iter()
            .map(|i| corpus.embedding(i).to_vec())
            .collect();

        let mut assignments = vec![0usize; n];
        for _ in 0..2 {
            // Assign each item to its nearest centroid
            for (i, slot) in assignments.iter_mut().enumerate() {
                *slot = nearest_centroid(corpus.embedding(i), &centroids);
            }
            // Recompute centroids as member means
            let dim = corpus.dimension();
            let mut sums = vec![vec![0.0f32; dim]; centroids.len()];
            let mut counts = vec![0usize; centroids.len()];
            for (i, &c) in assignments.iter().enumerate() {
                counts[c] += 1;
                for (s, &x) in sums[c].iter_mut().zip(corpus.embedding(i)) {
                    *s += x;
                }
            }
            for (c, sum) in sums.into_iter().enumerate() {
                if counts[c] > 0 {
                    centroids[c] = sum.into_iter().map(|s| s / counts[c] as f32).collect();
                }
            }
        }

        let mut lists = vec![Vec::new(); centroids.len()];
        for (i, &c) in assignments.iter().enumerate() {
            lists[c].push(i);
        }

        debug!(
            n_items = n,
            n_centroids = centroids.len(),
            "clustered index built"
        );

        Self {
            corpus,
            centroids,
            lists,
            n_probe: config.n_probe.max(1),
        }
    }

    /// Centroid list ids ordered by distance to the query vector
    fn probe_order(&self, q: &[f32]) -> Vec<usize> {
        let mut order: Vec<(usize, f64)> = self
            .centroids
            .iter()
            .enumerate()
            .map(|(c, centroid)| (c, cosine_distance(q, centroid)))
            .collect();
        order.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        order.into_iter().map(|(c, _)| c).collect()
    }
}

impl NeighborIndex for ClusteredIndex<'_> {
    fn k_nearest(&self, query: usize, k: usize) -> Vec<Neighbor> {
        self.k_nearest_filtered(query, k, &|_| true)
    }

    fn k_nearest_filtered(
        &self,
        query: usize,
        k: usize,
        filter: &dyn Fn(usize) -> bool,
    ) -> Vec<Neighbor> {
        let q = self.corpus.embedding(query);
        let order = self.probe_order(q);

        let mut hits: Vec<Neighbor> = Vec::new();
        let mut probed = 0;
        for &c in &order {
            // Keep probing past n_probe until enough candidates surface
            if probed >= self.n_probe && hits.len() >= k {
                break;
            }
            for &i in &self.lists[c] {
                if i != query && filter(i) {
                    hits.push(Neighbor {
                        index: i,
                        distance: cosine_distance(q, self.corpus.embedding(i)),
                    });
                }
            }
            probed += 1;
        }

        sort_and_truncate(&mut hits, k);
        hits
    }
}

fn nearest_centroid(q: &[f32], centroids: &[Vec<f32>]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (c, centroid) in centroids.iter().enumerate() {
        let d = cosine_distance(q, centroid);
        if d < best_dist {
            best = c;
            best_dist = d;
        }
    }
    best
}

fn sort_and_truncate(hits: &mut Vec<Neighbor>, k: usize) {
    hits.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });
    hits.truncate(k);
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics_core::{MarketItem, Platform};

    fn corpus(embeddings: Vec<Vec<f32>>) -> CorpusSnapshot {
        let items = embeddings
            .into_iter()
            .enumerate()
            .map(|(i, e)| MarketItem::new(format!("m{}", i), Platform::Kalshi, "t", e))
            .collect();
        CorpusSnapshot::new(items).unwrap()
    }

    #[test]
    fn test_exact_index_excludes_self() {
        let corpus = corpus(vec![
            vec![1.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
        ]);
        let index = ExactIndex::new(&corpus);
        let hits = index.k_nearest(0, 2);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.index != 0), "query must be excluded");
        assert_eq!(hits[0].index, 1, "duplicate item is nearest");
        assert!(hits[0].distance.abs() < 1e-6);
    }

    #[test]
    fn test_exact_index_filter() {
        let corpus = corpus(vec![
            vec![1.0, 0.0],
            vec![1.0, 0.1],
            vec![0.9, 0.1],
        ]);
        let index = ExactIndex::new(&corpus);
        let hits = index.k_nearest_filtered(0, 5, &|i| i != 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].index, 2);
    }

    #[test]
    fn test_clustered_index_finds_duplicates() {
        // 40 points in 4 tight groups; duplicates must surface as nearest
        let mut embs = Vec::new();
        for g in 0..4 {
            let base = match g {
                0 => vec![1.0, 0.0, 0.0],
                1 => vec![0.0, 1.0, 0.0],
                2 => vec![0.0, 0.0, 1.0],
                _ => vec![1.0, 1.0, 0.0],
            };
            for j in 0..10 {
                let mut v = base.clone();
                v[0] += j as f32 * 1e-3;
                embs.push(v);
            }
        }
        let corpus = corpus(embs);
        let config = IndexConfig {
            approximate_threshold: 0,
            n_probe: 2,
            seed: 7,
        };
        let index = ClusteredIndex::build(&corpus, &config);
        let hits = index.k_nearest(0, 3);
        assert_eq!(hits.len(), 3);
        for h in &hits {
            assert!(h.distance < 0.01, "neighbors should come from the same group");
        }
    }

    #[test]
    fn test_build_index_picks_exact_below_threshold() {
        let corpus = corpus(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let index = build_index(&corpus, &IndexConfig::default());
        let hits = index.k_nearest(0, 1);
        assert_eq!(hits[0].index, 1);
    }

    #[test]
    fn test_deterministic_results() {
        let corpus = corpus(vec![
            vec![1.0, 0.0],
            vec![0.9, 0.1],
            vec![0.8, 0.2],
            vec![0.0, 1.0],
        ]);
        let index = ExactIndex::new(&corpus);
        let a = index.k_nearest(3, 3);
        let b = index.k_nearest(3, 3);
        assert_eq!(a, b, "repeated queries must be identical");
    }
}
