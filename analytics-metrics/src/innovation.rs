//! Innovation family: which platform opens topics first
//!
//! Everything here hangs off per-item creation timestamps: cluster
//! founders, founding quality weighted by centroid proximity, growth
//! catalysis in the days after a founding, and temporal-precedence
//! fractions. When timestamps are missing the whole family is omitted
//! and recorded as a skip; nothing here fails the report.

use std::collections::BTreeMap;

use analytics_cluster::NOISE_LABEL;
use analytics_core::Platform;
use analytics_embedding::cosine_distance;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::report::{InnovationMetrics, MetricSkip};
use crate::snapshot::MetricsSnapshot;
use crate::MetricsConfig;

/// Day windows the growth-catalyst score is computed over
const GROWTH_WINDOWS: [u32; 4] = [3, 7, 14, 30];

/// How many earliest items count for the "among first five" fraction
const FIRST_N: usize = 5;

pub(crate) fn compute(
    snapshot: &MetricsSnapshot,
    config: &MetricsConfig,
    skips: &mut Vec<MetricSkip>,
) -> Option<BTreeMap<Platform, InnovationMetrics>> {
    // The family needs a timestamp on every clustered item
    let missing = snapshot
        .labels
        .iter()
        .enumerate()
        .filter(|&(i, &label)| label != NOISE_LABEL && snapshot.corpus.item(i).created_at.is_none())
        .count();
    if missing > 0 {
        skips.push(MetricSkip::global(
            "innovation",
            format!("{missing} clustered items lack creation timestamps"),
        ));
        return None;
    }

    let unweighted_persistence = snapshot.persistence.is_none();
    if unweighted_persistence {
        skips.push(MetricSkip::global(
            "growth_catalyst",
            "persistence unavailable, catalyst scores are unweighted",
        ));
    }

    // Founder of each cluster: earliest item, ties to the lower index
    let mut founders: BTreeMap<i64, (usize, Platform, DateTime<Utc>)> = BTreeMap::new();
    for (i, &label) in snapshot.labels.iter().enumerate() {
        if label == NOISE_LABEL {
            continue;
        }
        let ts = timestamp(snapshot, i);
        let replace = match founders.get(&label) {
            Some(&(_, _, current)) => ts < current,
            None => true,
        };
        if replace {
            founders.insert(label, (i, snapshot.corpus.item(i).platform, ts));
        }
    }

    let mut result = BTreeMap::new();
    for platform in snapshot.platforms() {
        result.insert(
            platform,
            platform_innovation(snapshot, config, platform, &founders, unweighted_persistence),
        );
    }
    debug!(
        n_platforms = result.len(),
        n_founded_clusters = founders.len(),
        "innovation family computed"
    );
    Some(result)
}

fn timestamp(snapshot: &MetricsSnapshot, i: usize) -> DateTime<Utc> {
    // Presence is pre-checked for every clustered item in compute()
    snapshot
        .corpus
        .item(i)
        .created_at
        .expect("clustered item timestamps verified before the pass")
}

fn platform_innovation(
    snapshot: &MetricsSnapshot,
    config: &MetricsConfig,
    platform: Platform,
    founders: &BTreeMap<i64, (usize, Platform, DateTime<Utc>)>,
    unweighted_persistence: bool,
) -> InnovationMetrics {
    let founded: Vec<i64> = founders
        .iter()
        .filter(|(_, &(_, p, _))| p == platform)
        .map(|(&label, _)| label)
        .collect();

    // Centrality-weighted founding: closeness to the centroid scaled by
    // the (log) size of what grew around the founding
    let weighted_founding_score: f64 = founded
        .iter()
        .map(|label| {
            let (item, _, _) = founders[label];
            let d = centroid_distance(snapshot, item, *label);
            let size = snapshot.cluster_sizes[label] as f64;
            1.0 / (1.0 + d) * (1.0 + size).ln()
        })
        .sum();

    let growth_catalyst = growth_catalyst(
        snapshot,
        config,
        platform,
        founders,
        unweighted_persistence,
    );

    // (founded clusters / total items) × mean persistence of founded
    let total_items = snapshot.platform_totals[&platform];
    let founded_persistence: Vec<f64> = founded
        .iter()
        .filter_map(|label| snapshot.persistence.and_then(|p| p.get(label)).copied())
        .collect();
    let mean_persistence = if founded_persistence.is_empty() {
        0.0
    } else {
        founded_persistence.iter().sum::<f64>() / founded_persistence.len() as f64
    };
    let innovation_index = if total_items > 0 {
        (founded.len() as f64 / total_items as f64) * mean_persistence
    } else {
        0.0
    };

    let (first_by_earliest, first_by_median, among_first_five) =
        precedence_fractions(snapshot, platform);

    InnovationMetrics {
        founded_clusters: founded.len(),
        weighted_founding_score,
        growth_catalyst,
        innovation_index,
        first_by_earliest,
        first_by_median,
        among_first_five,
    }
}

/// Σ over the platform's items created within `window` days of their
/// cluster's founding: centroid proximity × cluster persistence
fn growth_catalyst(
    snapshot: &MetricsSnapshot,
    config: &MetricsConfig,
    platform: Platform,
    founders: &BTreeMap<i64, (usize, Platform, DateTime<Utc>)>,
    unweighted_persistence: bool,
) -> BTreeMap<u32, f64> {
    let mut scores: BTreeMap<u32, f64> = GROWTH_WINDOWS.iter().map(|&w| (w, 0.0)).collect();
    for &i in &snapshot.platform_items[&platform] {
        let label = snapshot.labels[i];
        if label == NOISE_LABEL {
            continue;
        }
        if snapshot.cluster_sizes[&label] < config.growth_min_cluster_size {
            continue;
        }
        let founding_ts = founders[&label].2;
        let ts = timestamp(snapshot, i);
        if ts < founding_ts {
            continue;
        }
        let persistence = if unweighted_persistence {
            1.0
        } else {
            snapshot
                .persistence
                .and_then(|p| p.get(&label))
                .copied()
                .unwrap_or(0.0)
        };
        let proximity = 1.0 / (1.0 + centroid_distance(snapshot, i, label));
        for &window in &GROWTH_WINDOWS {
            if ts - founding_ts <= Duration::days(window as i64) {
                *scores.entry(window).or_insert(0.0) += proximity * persistence;
            }
        }
    }
    scores
}

/// Fractions of participated clusters where the platform came first
fn precedence_fractions(snapshot: &MetricsSnapshot, platform: Platform) -> (f64, f64, f64) {
    let participated = snapshot.participated_clusters(platform);
    if participated.is_empty() {
        return (0.0, 0.0, 0.0);
    }

    let mut first_earliest = 0usize;
    let mut first_median = 0usize;
    let mut in_first_five = 0usize;

    for &label in &participated {
        // Timestamps per platform within this cluster
        let mut by_platform: BTreeMap<Platform, Vec<DateTime<Utc>>> = BTreeMap::new();
        let mut all: Vec<(DateTime<Utc>, usize)> = Vec::new();
        for (i, &l) in snapshot.labels.iter().enumerate() {
            if l == label {
                let ts = timestamp(snapshot, i);
                by_platform
                    .entry(snapshot.corpus.item(i).platform)
                    .or_default()
                    .push(ts);
                all.push((ts, i));
            }
        }
        for timestamps in by_platform.values_mut() {
            timestamps.sort_unstable();
        }

        let own_earliest = by_platform[&platform][0];
        if by_platform.values().all(|ts| own_earliest <= ts[0]) {
            first_earliest += 1;
        }

        let own_median = median(&by_platform[&platform]);
        if by_platform.values().all(|ts| own_median <= median(ts)) {
            first_median += 1;
        }

        all.sort_unstable();
        if all
            .iter()
            .take(FIRST_N)
            .any(|&(_, i)| snapshot.corpus.item(i).platform == platform)
        {
            in_first_five += 1;
        }
    }

    let n = participated.len() as f64;
    (
        first_earliest as f64 / n,
        first_median as f64 / n,
        in_first_five as f64 / n,
    )
}

fn median(sorted: &[DateTime<Utc>]) -> DateTime<Utc> {
    sorted[sorted.len() / 2]
}

fn centroid_distance(snapshot: &MetricsSnapshot, item: usize, label: i64) -> f64 {
    match snapshot.centroids.get(&label) {
        Some(centroid) => cosine_distance(snapshot.corpus.embedding(item), centroid),
        None => 0.0,
    }
}
