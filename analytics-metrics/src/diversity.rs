//! Diversity family: how widely a platform covers the topic space
//!
//! Entropy, reach, majority/exclusivity, concentration, noise share,
//! isolation from other platforms, and the spatial spread of the
//! platform's own items. A pure pass over the snapshot; platforms with
//! too little data get individual metrics skipped, never the whole pass.

use std::collections::BTreeMap;

use analytics_cluster::NOISE_LABEL;
use analytics_core::Platform;
use analytics_embedding::{cosine_distance, NeighborIndex};
use tracing::debug;

use crate::report::{DiversityMetrics, MajorityMetrics, MetricSkip, SpreadMetrics};
use crate::snapshot::MetricsSnapshot;
use crate::stats::{convex_hull_area, entropy, gini, pca_project_2d, trimmed_mean};
use crate::MetricsConfig;

/// Share and count thresholds for the effective-reach variants
const REACH_SHARES: [f64; 3] = [0.05, 0.10, 0.20];
const REACH_COUNTS: [usize; 3] = [1, 5, 10];

/// Majority thresholds, in percent
pub(crate) const MAJORITY_THRESHOLDS: [u32; 6] = [50, 70, 75, 80, 90, 95];

pub(crate) fn compute(
    snapshot: &MetricsSnapshot,
    index: &dyn NeighborIndex,
    config: &MetricsConfig,
    skips: &mut Vec<MetricSkip>,
) -> BTreeMap<Platform, DiversityMetrics> {
    let mut result = BTreeMap::new();
    for platform in snapshot.platforms() {
        result.insert(
            platform,
            platform_diversity(snapshot, index, config, platform, skips),
        );
    }
    debug!(n_platforms = result.len(), "diversity family computed");
    result
}

fn platform_diversity(
    snapshot: &MetricsSnapshot,
    index: &dyn NeighborIndex,
    config: &MetricsConfig,
    platform: Platform,
    skips: &mut Vec<MetricSkip>,
) -> DiversityMetrics {
    let total_items = snapshot.platform_totals[&platform];
    let items = &snapshot.platform_items[&platform];

    // Per-cluster item counts for this platform
    let cluster_counts: BTreeMap<i64, usize> = snapshot
        .cluster_platform_counts
        .iter()
        .filter_map(|(&label, counts)| counts.get(&platform).map(|&c| (label, c)))
        .collect();
    let counts: Vec<f64> = cluster_counts.values().map(|&c| c as f64).collect();

    let cluster_entropy = entropy(&counts);

    // Weighted variant: membership confidence replaces the unit count
    let weighted_cluster_entropy = snapshot.membership.map(|probs| {
        let mut weighted: BTreeMap<i64, f64> = BTreeMap::new();
        for &i in items {
            let label = snapshot.labels[i];
            if label != NOISE_LABEL {
                *weighted.entry(label).or_insert(0.0) += probs[i];
            }
        }
        let weights: Vec<f64> = weighted.values().copied().collect();
        entropy(&weights)
    });

    // Effective reach
    let mut reach_share = [0usize; 3];
    let mut reach_count = [0usize; 3];
    for (&label, &count) in &cluster_counts {
        let share = snapshot.share(label, platform);
        for (slot, &threshold) in reach_share.iter_mut().zip(REACH_SHARES.iter()) {
            if share >= threshold {
                *slot += 1;
            }
        }
        for (slot, &threshold) in reach_count.iter_mut().zip(REACH_COUNTS.iter()) {
            if count >= threshold {
                *slot += 1;
            }
        }
    }

    // Majority / exclusivity
    let mut majority = BTreeMap::new();
    for &pct in &MAJORITY_THRESHOLDS {
        let threshold = pct as f64 / 100.0;
        let mut majority_clusters = 0usize;
        let mut own_items_in_majority = 0usize;
        let mut exclusivity_index = 0.0;
        for (&label, &count) in &cluster_counts {
            let share = snapshot.share(label, platform);
            if share > threshold {
                majority_clusters += 1;
                own_items_in_majority += count;
            }
            exclusivity_index += (share - threshold).max(0.0);
        }
        let unique_topic_proportion = if total_items > 0 {
            own_items_in_majority as f64 / total_items as f64
        } else {
            0.0
        };
        majority.insert(
            pct,
            MajorityMetrics {
                majority_clusters,
                unique_topic_proportion,
                exclusivity_index,
            },
        );
    }

    let noise_count = items
        .iter()
        .filter(|&&i| snapshot.labels[i] == NOISE_LABEL)
        .count();
    let noise_proportion = if total_items > 0 {
        noise_count as f64 / total_items as f64
    } else {
        0.0
    };

    let isolation = isolation_distance(snapshot, index, config, platform, skips);

    // Spread and hull need a minimum of points
    let (spread, hull_area) = if items.len() < config.min_spread_items {
        skips.push(MetricSkip::platform_metric(
            platform,
            "spread",
            format!("platform has {} items", items.len()),
        ));
        skips.push(MetricSkip::platform_metric(
            platform,
            "hull_area",
            format!("platform has {} items", items.len()),
        ));
        (None, None)
    } else {
        let sample: Vec<usize> = items.iter().copied().take(config.spread_sample).collect();
        let spread = Some(spread_metrics(snapshot, &sample));
        let hull = if items.len() < config.min_hull_items {
            skips.push(MetricSkip::platform_metric(
                platform,
                "hull_area",
                format!(
                    "platform has {} items, hull needs at least {}",
                    items.len(),
                    config.min_hull_items
                ),
            ));
            None
        } else {
            Some(hull_area_for(snapshot, &sample, config))
        };
        (spread, hull)
    };

    DiversityMetrics {
        cluster_entropy,
        weighted_cluster_entropy,
        reach_share_5pct: reach_share[0],
        reach_share_10pct: reach_share[1],
        reach_share_20pct: reach_share[2],
        reach_count_1: reach_count[0],
        reach_count_5: reach_count[1],
        reach_count_10: reach_count[2],
        majority,
        gini: gini(&counts),
        noise_count,
        noise_proportion,
        isolation,
        spread,
        hull_area,
    }
}

/// Mean distance from a bounded sample of the platform's items to their
/// 10 nearest items on *other* platforms
fn isolation_distance(
    snapshot: &MetricsSnapshot,
    index: &dyn NeighborIndex,
    config: &MetricsConfig,
    platform: Platform,
    skips: &mut Vec<MetricSkip>,
) -> Option<f64> {
    let other_exists = snapshot
        .platform_totals
        .keys()
        .any(|&p| p != platform);
    if !other_exists {
        skips.push(MetricSkip::platform_metric(
            platform,
            "isolation",
            "no other platforms in the corpus",
        ));
        return None;
    }

    let items = &snapshot.platform_items[&platform];
    let corpus = snapshot.corpus;
    let mut distances: Vec<f64> = Vec::new();
    for &i in items.iter().take(config.isolation_sample) {
        let hits = index.k_nearest_filtered(i, config.isolation_neighbors, &|j| {
            corpus.item(j).platform != platform
        });
        distances.extend(hits.iter().map(|h| h.distance));
    }
    if distances.is_empty() {
        skips.push(MetricSkip::platform_metric(
            platform,
            "isolation",
            "no cross-platform neighbors found",
        ));
        return None;
    }
    Some(distances.iter().sum::<f64>() / distances.len() as f64)
}

fn spread_metrics(snapshot: &MetricsSnapshot, sample: &[usize]) -> SpreadMetrics {
    let mut distances: Vec<f64> = Vec::new();
    for (a, &i) in sample.iter().enumerate() {
        for &j in &sample[a + 1..] {
            distances.push(cosine_distance(
                snapshot.corpus.embedding(i),
                snapshot.corpus.embedding(j),
            ));
        }
    }
    let mean = if distances.is_empty() {
        0.0
    } else {
        distances.iter().sum::<f64>() / distances.len() as f64
    };
    SpreadMetrics {
        mean,
        trimmed_mean_10: trimmed_mean(&distances, 0.1),
        trimmed_mean_90: trimmed_mean(&distances, 0.9),
    }
}

fn hull_area_for(snapshot: &MetricsSnapshot, sample: &[usize], config: &MetricsConfig) -> f64 {
    let rows: Vec<&[f32]> = sample
        .iter()
        .map(|&i| snapshot.corpus.embedding(i))
        .collect();
    let projected = pca_project_2d(&rows, config.hull_max_input_dims);
    let points: Vec<(f64, f64)> = (0..projected.nrows())
        .map(|i| (projected[[i, 0]], projected[[i, 1]]))
        .collect();
    convex_hull_area(&points)
}
