//! Competition family: who follows whom into topics, and who crowds whom
//!
//! A directed topic-flow graph over first-entry order, Jaccard and
//! weighted overlap between platform cluster sets, and the HHI
//! concentration of every cluster.

use std::collections::BTreeMap;

use analytics_core::Platform;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use tracing::debug;

use crate::report::{ClusterBreakdown, CompetitionMetrics, GlobalAggregates, MetricSkip};
use crate::snapshot::MetricsSnapshot;

pub(crate) fn compute(
    snapshot: &MetricsSnapshot,
    skips: &mut Vec<MetricSkip>,
) -> BTreeMap<Platform, CompetitionMetrics> {
    let platforms = snapshot.platforms();

    let (in_degree, out_degree) = topic_flow_degrees(snapshot, skips);

    // Participated-cluster sets and per-cluster counts per platform
    let participated: BTreeMap<Platform, Vec<i64>> = platforms
        .iter()
        .map(|&p| (p, snapshot.participated_clusters(p)))
        .collect();

    let mut result = BTreeMap::new();
    for &platform in &platforms {
        let mut overlap = BTreeMap::new();
        let mut weighted_overlap = BTreeMap::new();
        for &other in platforms.iter().filter(|&&p| p != platform) {
            overlap.insert(other, jaccard(&participated[&platform], &participated[&other]));
            weighted_overlap.insert(other, weighted_jaccard(snapshot, platform, other));
        }

        let flow_in = in_degree.get(&platform).copied().unwrap_or(0);
        let flow_out = out_degree.get(&platform).copied().unwrap_or(0);
        result.insert(
            platform,
            CompetitionMetrics {
                flow_in_degree: flow_in,
                flow_out_degree: flow_out,
                // +1 smoothing keeps platforms nobody follows finite
                flow_ratio: flow_out as f64 / (flow_in + 1) as f64,
                overlap,
                weighted_overlap,
            },
        );
    }
    debug!(n_platforms = result.len(), "competition family computed");
    result
}

/// Platform composition, dominant platform, and HHI per cluster, plus the
/// corpus-level HHI aggregates; computed for every report
pub(crate) fn cluster_breakdowns(
    snapshot: &MetricsSnapshot,
) -> (Vec<ClusterBreakdown>, GlobalAggregates) {
    let mut breakdowns = Vec::new();
    let mut hhi_sum = 0.0;
    let mut weighted_sum = 0.0;
    let mut total_size = 0usize;

    for (&label, counts) in &snapshot.cluster_platform_counts {
        let size = snapshot.cluster_sizes[&label];
        let shares: BTreeMap<Platform, f64> = counts
            .iter()
            .map(|(&p, &c)| (p, c as f64 / size as f64))
            .collect();
        let hhi: f64 = shares.values().map(|s| s * s).sum();
        // Largest share wins; ties break toward the first platform in order
        let mut dominant_entry: Option<(Platform, f64)> = None;
        for (&p, &share) in &shares {
            if dominant_entry.map(|(_, s)| share > s).unwrap_or(true) {
                dominant_entry = Some((p, share));
            }
        }
        let dominant = dominant_entry
            .map(|(p, _)| p)
            .expect("clusters always have at least one platform");

        hhi_sum += hhi;
        weighted_sum += hhi * size as f64;
        total_size += size;
        breakdowns.push(ClusterBreakdown {
            label,
            size,
            shares,
            dominant,
            hhi,
        });
    }

    let n = breakdowns.len();
    let global = GlobalAggregates {
        mean_hhi: if n > 0 { hhi_sum / n as f64 } else { 0.0 },
        weighted_mean_hhi: if total_size > 0 {
            weighted_sum / total_size as f64
        } else {
            0.0
        },
    };
    (breakdowns, global)
}

/// Directed edges from each platform to the next by first entry time,
/// accumulated over every multi-platform cluster
fn topic_flow_degrees(
    snapshot: &MetricsSnapshot,
    skips: &mut Vec<MetricSkip>,
) -> (BTreeMap<Platform, usize>, BTreeMap<Platform, usize>) {
    let mut in_degree: BTreeMap<Platform, usize> = BTreeMap::new();
    let mut out_degree: BTreeMap<Platform, usize> = BTreeMap::new();

    let mut missing_timestamps = false;
    for (&label, counts) in &snapshot.cluster_platform_counts {
        if counts.len() < 2 {
            continue;
        }
        // First entry time per platform in this cluster
        let mut first_entry: BTreeMap<Platform, DateTime<Utc>> = BTreeMap::new();
        let mut complete = true;
        for (i, &l) in snapshot.labels.iter().enumerate() {
            if l != label {
                continue;
            }
            match snapshot.corpus.item(i).created_at {
                Some(ts) => {
                    let platform = snapshot.corpus.item(i).platform;
                    let entry = first_entry.entry(platform).or_insert(ts);
                    if ts < *entry {
                        *entry = ts;
                    }
                }
                None => {
                    complete = false;
                    break;
                }
            }
        }
        if !complete {
            missing_timestamps = true;
            continue;
        }

        let ordered: Vec<Platform> = first_entry
            .iter()
            .sorted_by_key(|(&p, &ts)| (ts, p))
            .map(|(&p, _)| p)
            .collect();
        for pair in ordered.windows(2) {
            *out_degree.entry(pair[0]).or_insert(0) += 1;
            *in_degree.entry(pair[1]).or_insert(0) += 1;
        }
    }

    if missing_timestamps {
        skips.push(MetricSkip::global(
            "topic_flow",
            "clusters with missing timestamps excluded from the flow graph",
        ));
    }
    (in_degree, out_degree)
}

fn jaccard(a: &[i64], b: &[i64]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let set_a: std::collections::BTreeSet<i64> = a.iter().copied().collect();
    let set_b: std::collections::BTreeSet<i64> = b.iter().copied().collect();
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Σ min(countₐ, countᵦ) / Σ max(countₐ, countᵦ) over all clusters
fn weighted_jaccard(snapshot: &MetricsSnapshot, a: Platform, b: Platform) -> f64 {
    let mut min_sum = 0.0;
    let mut max_sum = 0.0;
    for counts in snapshot.cluster_platform_counts.values() {
        let ca = counts.get(&a).copied().unwrap_or(0) as f64;
        let cb = counts.get(&b).copied().unwrap_or(0) as f64;
        min_sum += ca.min(cb);
        max_sum += ca.max(cb);
    }
    if max_sum == 0.0 {
        0.0
    } else {
        min_sum / max_sum
    }
}
