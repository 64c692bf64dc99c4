//! Read-only snapshot the metric families compute over
//!
//! One [`MetricsSnapshot`] borrows the corpus, the flat cluster labels,
//! and the precomputed k-neighborhoods, and derives the shared tables
//! every family pass reads: per-cluster platform counts, cluster sizes,
//! cluster centroids, and per-platform item lists. The families never
//! share mutable state; each pass takes `&MetricsSnapshot` and returns
//! its own result map.

use std::collections::{BTreeMap, HashMap};

use analytics_cluster::NOISE_LABEL;
use analytics_core::{AnalyticsError, CorpusSnapshot, Platform, Result};
use analytics_embedding::Neighbor;
use tracing::debug;

/// Borrowed inputs plus derived lookup tables for one metrics run
pub struct MetricsSnapshot<'a> {
    pub corpus: &'a CorpusSnapshot,
    pub labels: &'a [i64],
    /// k-nearest neighborhoods per item (largest k any family needs)
    pub neighborhoods: &'a [Vec<Neighbor>],
    /// Soft cluster-assignment confidence per item, when available
    pub membership: Option<&'a [f64]>,
    /// Cluster stability scores, when available
    pub persistence: Option<&'a HashMap<i64, f64>>,

    /// Non-noise cluster sizes
    pub cluster_sizes: BTreeMap<i64, usize>,
    /// Item count per platform per cluster
    pub cluster_platform_counts: BTreeMap<i64, BTreeMap<Platform, usize>>,
    /// Total item count per platform (noise included)
    pub platform_totals: BTreeMap<Platform, usize>,
    /// Item indices per platform, in corpus order
    pub platform_items: BTreeMap<Platform, Vec<usize>>,
    /// Mean embedding per non-noise cluster
    pub centroids: BTreeMap<i64, Vec<f32>>,
}

impl<'a> MetricsSnapshot<'a> {
    /// Derive the shared tables; validates input lengths against the corpus
    pub fn new(
        corpus: &'a CorpusSnapshot,
        labels: &'a [i64],
        neighborhoods: &'a [Vec<Neighbor>],
        membership: Option<&'a [f64]>,
        persistence: Option<&'a HashMap<i64, f64>>,
    ) -> Result<Self> {
        if labels.len() != corpus.len() {
            return Err(AnalyticsError::internal(format!(
                "{} labels for {} items",
                labels.len(),
                corpus.len()
            )));
        }
        if neighborhoods.len() != corpus.len() {
            return Err(AnalyticsError::internal(format!(
                "{} neighborhoods for {} items",
                neighborhoods.len(),
                corpus.len()
            )));
        }
        if let Some(m) = membership {
            if m.len() != corpus.len() {
                return Err(AnalyticsError::internal(format!(
                    "{} membership probabilities for {} items",
                    m.len(),
                    corpus.len()
                )));
            }
        }

        let mut cluster_sizes: BTreeMap<i64, usize> = BTreeMap::new();
        let mut cluster_platform_counts: BTreeMap<i64, BTreeMap<Platform, usize>> =
            BTreeMap::new();
        let mut platform_totals: BTreeMap<Platform, usize> = BTreeMap::new();
        let mut platform_items: BTreeMap<Platform, Vec<usize>> = BTreeMap::new();

        for (i, &label) in labels.iter().enumerate() {
            let platform = corpus.item(i).platform;
            *platform_totals.entry(platform).or_insert(0) += 1;
            platform_items.entry(platform).or_default().push(i);
            if label != NOISE_LABEL {
                *cluster_sizes.entry(label).or_insert(0) += 1;
                *cluster_platform_counts
                    .entry(label)
                    .or_default()
                    .entry(platform)
                    .or_insert(0) += 1;
            }
        }

        // Centroid = mean of member embeddings
        let dim = corpus.dimension();
        let mut sums: BTreeMap<i64, Vec<f32>> = BTreeMap::new();
        for (i, &label) in labels.iter().enumerate() {
            if label == NOISE_LABEL {
                continue;
            }
            let sum = sums.entry(label).or_insert_with(|| vec![0.0; dim]);
            for (s, &x) in sum.iter_mut().zip(corpus.embedding(i)) {
                *s += x;
            }
        }
        let centroids: BTreeMap<i64, Vec<f32>> = sums
            .into_iter()
            .map(|(label, sum)| {
                let n = cluster_sizes[&label] as f32;
                (label, sum.into_iter().map(|s| s / n).collect())
            })
            .collect();

        debug!(
            n_items = corpus.len(),
            n_clusters = cluster_sizes.len(),
            n_platforms = platform_totals.len(),
            "metrics snapshot derived"
        );

        Ok(Self {
            corpus,
            labels,
            neighborhoods,
            membership,
            persistence,
            cluster_sizes,
            cluster_platform_counts,
            platform_totals,
            platform_items,
            centroids,
        })
    }

    /// Platforms present in the corpus, sorted
    pub fn platforms(&self) -> Vec<Platform> {
        self.platform_totals.keys().copied().collect()
    }

    /// A platform's share of a cluster, 0 when it has no items there
    pub fn share(&self, label: i64, platform: Platform) -> f64 {
        let size = match self.cluster_sizes.get(&label) {
            Some(&s) if s > 0 => s as f64,
            _ => return 0.0,
        };
        self.cluster_platform_counts
            .get(&label)
            .and_then(|counts| counts.get(&platform))
            .map(|&c| c as f64 / size)
            .unwrap_or(0.0)
    }

    /// Clusters a platform has at least one item in, sorted
    pub fn participated_clusters(&self, platform: Platform) -> Vec<i64> {
        self.cluster_platform_counts
            .iter()
            .filter(|(_, counts)| counts.contains_key(&platform))
            .map(|(&label, _)| label)
            .collect()
    }
}
