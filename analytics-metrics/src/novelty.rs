//! Novelty family: how far a platform's items sit from the corpus bulk
//!
//! Mean novelty at several neighborhood sizes, frontier counts against
//! global 20th-neighbor-distance percentiles, LOF-based outlier counts,
//! and a coverage score that double-weights the sparsest fifth of the
//! embedding space.

use std::collections::{BTreeMap, BTreeSet};

use analytics_core::Platform;
use analytics_embedding::novelty::{kth_neighbor_distances, scores_from_neighborhoods};
use analytics_embedding::{local_outlier_factor, Neighbor};
use tracing::debug;

use crate::report::NoveltyMetrics;
use crate::snapshot::MetricsSnapshot;
use crate::stats::percentile;

/// Neighborhood sizes the mean-novelty variants are reported at
const NOVELTY_KS: [usize; 3] = [10, 20, 25];

/// Global percentile thresholds for the frontier counts
const FRONTIER_PERCENTILES: [u32; 4] = [80, 90, 95, 98];

/// Neighborhood size for the 20th-neighbor distance and LOF
const FRONTIER_K: usize = 20;

/// LOF thresholds the outlier counts are reported at
const LOF_THRESHOLDS: [f64; 2] = [1.5, 2.0];

/// Fraction of the corpus counted as the sparse region
const SPARSE_FRACTION: f64 = 0.20;

pub(crate) fn compute(snapshot: &MetricsSnapshot) -> BTreeMap<Platform, NoveltyMetrics> {
    // Global per-item series, computed once
    let novelty_by_k: Vec<Vec<f64>> = NOVELTY_KS
        .iter()
        .map(|&k| scores_from_neighborhoods(snapshot.neighborhoods, k))
        .collect();
    let d20 = kth_neighbor_distances(snapshot.neighborhoods, FRONTIER_K);
    let thresholds: Vec<(u32, f64)> = FRONTIER_PERCENTILES
        .iter()
        .map(|&q| (q, percentile(&d20, q as f64)))
        .collect();

    // LOF over the 20-neighborhoods (lists may be longer; truncate)
    let truncated: Vec<Vec<Neighbor>> = snapshot
        .neighborhoods
        .iter()
        .map(|hits| hits.iter().copied().take(FRONTIER_K).collect())
        .collect();
    let lof = local_outlier_factor(&truncated);

    // Sparse region: the top 20% of 20th-neighbor distances
    let sparse_cut = percentile(&d20, 100.0 * (1.0 - SPARSE_FRACTION));

    let mut result = BTreeMap::new();
    for platform in snapshot.platforms() {
        let items = &snapshot.platform_items[&platform];

        let means: Vec<f64> = novelty_by_k
            .iter()
            .map(|scores| mean_over(scores, items))
            .collect();

        let frontier_counts: BTreeMap<u32, usize> = thresholds
            .iter()
            .map(|&(q, threshold)| {
                let count = items.iter().filter(|&&i| d20[i] > threshold).count();
                (q, count)
            })
            .collect();

        let lof_outliers_1_5 = items.iter().filter(|&&i| lof[i] > LOF_THRESHOLDS[0]).count();
        let lof_outliers_2_0 = items.iter().filter(|&&i| lof[i] > LOF_THRESHOLDS[1]).count();
        let mean_lof = mean_over(&lof, items);

        let novelty_weighted_coverage =
            coverage(snapshot, platform, &d20, sparse_cut);

        result.insert(
            platform,
            NoveltyMetrics {
                mean_novelty_k10: means[0],
                mean_novelty_k20: means[1],
                mean_novelty_k25: means[2],
                frontier_counts,
                lof_outliers_1_5,
                lof_outliers_2_0,
                mean_lof,
                novelty_weighted_coverage,
            },
        );
    }
    debug!(n_platforms = result.len(), "novelty family computed");
    result
}

fn mean_over(series: &[f64], items: &[usize]) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    items.iter().map(|&i| series[i]).sum::<f64>() / items.len() as f64
}

/// Sum of sparsity weights over the platform's items inside clusters the
/// platform holds a majority (>50%) share of; items in the sparsest fifth
/// of the corpus count double
fn coverage(
    snapshot: &MetricsSnapshot,
    platform: Platform,
    d20: &[f64],
    sparse_cut: f64,
) -> f64 {
    let majority_clusters: BTreeSet<i64> = snapshot
        .cluster_sizes
        .keys()
        .filter(|&&label| snapshot.share(label, platform) > 0.5)
        .copied()
        .collect();

    snapshot.platform_items[&platform]
        .iter()
        .filter(|&&i| majority_clusters.contains(&snapshot.labels[i]))
        .map(|&i| if d20[i] > sparse_cut { 2.0 } else { 1.0 })
        .sum()
}
