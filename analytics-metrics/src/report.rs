//! Report structures produced by the metrics engine
//!
//! Everything here is plain serializable data: nested maps of metric name
//! to number, per-cluster breakdowns, and an explicit record of every
//! metric that was skipped or defaulted. Report generators downstream
//! consume these as-is.

use std::collections::BTreeMap;

use analytics_core::Platform;
use serde::{Deserialize, Serialize};

/// The full comparative report across platforms
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformMetricsReport {
    /// Per-platform metric families (absent families were not requested
    /// or could not be computed; see `skips`)
    pub platforms: BTreeMap<Platform, PlatformReport>,
    /// Per-cluster platform composition
    pub clusters: Vec<ClusterBreakdown>,
    /// Corpus-level aggregates
    pub global: GlobalAggregates,
    /// Every metric that degraded to a default or was omitted, and why
    pub skips: Vec<MetricSkip>,
}

/// The four metric families for one platform
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diversity: Option<DiversityMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub novelty: Option<NoveltyMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub innovation: Option<InnovationMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competition: Option<CompetitionMetrics>,
}

/// How a platform's items spread across the cluster structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiversityMetrics {
    /// Shannon entropy over the platform's non-noise cluster distribution
    pub cluster_entropy: f64,
    /// Membership-probability-weighted entropy, when confidences exist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weighted_cluster_entropy: Option<f64>,
    /// Clusters where the platform holds at least 5/10/20% share
    pub reach_share_5pct: usize,
    pub reach_share_10pct: usize,
    pub reach_share_20pct: usize,
    /// Clusters where the platform has at least 1/5/10 items
    pub reach_count_1: usize,
    pub reach_count_5: usize,
    pub reach_count_10: usize,
    /// Majority/exclusivity metrics keyed by threshold percent
    pub majority: BTreeMap<u32, MajorityMetrics>,
    /// Gini coefficient over the platform's per-cluster item counts
    pub gini: f64,
    /// Items labeled noise
    pub noise_count: usize,
    pub noise_proportion: f64,
    /// Mean distance to the 10 nearest other-platform items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isolation: Option<f64>,
    /// Pairwise-distance spread among the platform's own items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spread: Option<SpreadMetrics>,
    /// Convex-hull area of the platform's items in reduced space
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hull_area: Option<f64>,
}

/// Majority-share metrics at one threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MajorityMetrics {
    /// Clusters where the platform's share exceeds the threshold
    pub majority_clusters: usize,
    /// Fraction of the platform's own items landing in such clusters
    pub unique_topic_proportion: f64,
    /// Summed excess share over the threshold
    pub exclusivity_index: f64,
}

/// Pairwise-distance spread among a platform's items
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadMetrics {
    /// Untrimmed mean pairwise distance
    pub mean: f64,
    /// Mean with 10% of the distance mass trimmed (5% per tail)
    pub trimmed_mean_10: f64,
    /// Mean of the central decile (45% trimmed per tail)
    pub trimmed_mean_90: f64,
}

/// How novel a platform's items are relative to the whole corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoveltyMetrics {
    /// Mean novelty score at three neighborhood sizes
    pub mean_novelty_k10: f64,
    pub mean_novelty_k20: f64,
    pub mean_novelty_k25: f64,
    /// Items whose 20th-neighbor distance exceeds the global percentile,
    /// keyed by percentile (80, 90, 95, 98)
    pub frontier_counts: BTreeMap<u32, usize>,
    /// Local-outlier-factor counts and mean
    pub lof_outliers_1_5: usize,
    pub lof_outliers_2_0: usize,
    pub mean_lof: f64,
    /// Sparse-region-weighted coverage over majority-share clusters
    pub novelty_weighted_coverage: f64,
}

/// Which platform opens new topics, and how those topics grow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InnovationMetrics {
    /// Clusters whose earliest item belongs to this platform
    pub founded_clusters: usize,
    /// Foundings weighted by centroid proximity and cluster size
    pub weighted_founding_score: f64,
    /// Growth-catalyst score per window, keyed by window days
    pub growth_catalyst: BTreeMap<u32, f64>,
    /// (founded / total items) × mean persistence of founded clusters
    pub innovation_index: f64,
    /// Fraction of participated clusters where this platform was first
    /// by earliest item timestamp
    pub first_by_earliest: f64,
    /// ... first by median member timestamp
    pub first_by_median: f64,
    /// ... present among the cluster's first five items
    pub among_first_five: f64,
}

/// Directed topic flow and overlap against the other platforms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitionMetrics {
    /// Topic-flow edges pointing at this platform
    pub flow_in_degree: usize,
    /// Topic-flow edges leaving this platform
    pub flow_out_degree: usize,
    /// out / (in + 1); the +1 keeps never-followed platforms finite
    pub flow_ratio: f64,
    /// Jaccard similarity of participated-cluster sets, per other platform
    pub overlap: BTreeMap<Platform, f64>,
    /// min/max-count-weighted overlap, per other platform
    pub weighted_overlap: BTreeMap<Platform, f64>,
}

/// Platform composition of one cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterBreakdown {
    pub label: i64,
    pub size: usize,
    /// Per-platform share of the cluster; shares sum to 1
    pub shares: BTreeMap<Platform, f64>,
    /// Platform holding the largest share
    pub dominant: Platform,
    /// Herfindahl-Hirschman index of the share distribution
    pub hhi: f64,
}

/// Corpus-level aggregates
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GlobalAggregates {
    /// Mean HHI across clusters
    pub mean_hhi: f64,
    /// Cluster-size-weighted mean HHI
    pub weighted_mean_hhi: f64,
}

/// One degraded or omitted metric, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSkip {
    /// The affected platform, when the skip is platform-scoped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    /// Metric name, e.g. "hull_area"
    pub metric: String,
    /// Human-readable reason, e.g. "platform has 2 items"
    pub reason: String,
}

impl MetricSkip {
    pub fn platform_metric(
        platform: Platform,
        metric: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            platform: Some(platform),
            metric: metric.into(),
            reason: reason.into(),
        }
    }

    pub fn global(metric: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            platform: None,
            metric: metric.into(),
            reason: reason.into(),
        }
    }
}
