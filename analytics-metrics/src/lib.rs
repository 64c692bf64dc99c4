//! Cross-platform analytic indices over clustered market corpora
//!
//! The final pipeline stage: consumes the corpus snapshot, flat cluster
//! labels, and precomputed neighborhoods, and produces a comparative
//! [`PlatformMetricsReport`] across platforms in four independent
//! families (diversity, novelty, innovation, competition). Each family is
//! a pure pass over the same read-only snapshot; a caller may request any
//! subset. Missing data degrades individual metrics with an annotation in
//! the report, never the run.

mod competition;
mod diversity;
mod innovation;
mod novelty;

pub mod report;
pub mod snapshot;
pub mod stats;

use analytics_embedding::{build_index, IndexConfig};
use tracing::{info, instrument};

pub use report::{
    ClusterBreakdown, CompetitionMetrics, DiversityMetrics, GlobalAggregates, InnovationMetrics,
    MajorityMetrics, MetricSkip, NoveltyMetrics, PlatformMetricsReport, PlatformReport,
    SpreadMetrics,
};
pub use snapshot::MetricsSnapshot;

/// Tuning knobs for the metric passes
#[derive(Debug, Clone, Copy)]
pub struct MetricsConfig {
    /// Neighbor-index construction (isolation metric)
    pub index: IndexConfig,
    /// Items sampled per platform for the isolation metric
    pub isolation_sample: usize,
    /// Other-platform neighbors averaged per sampled item
    pub isolation_neighbors: usize,
    /// Items sampled per platform for spread and hull
    pub spread_sample: usize,
    /// Below this many items, spread metrics are skipped
    pub min_spread_items: usize,
    /// Below this many items, the hull is skipped
    pub min_hull_items: usize,
    /// Embedding columns fed into the hull projection
    pub hull_max_input_dims: usize,
    /// Clusters smaller than this are ignored by the growth catalyst
    pub growth_min_cluster_size: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            index: IndexConfig::default(),
            isolation_sample: 200,
            isolation_neighbors: 10,
            spread_sample: 200,
            min_spread_items: 3,
            min_hull_items: 4,
            hull_max_input_dims: 300,
            growth_min_cluster_size: 3,
        }
    }
}

/// Which metric families to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilySelection {
    pub diversity: bool,
    pub novelty: bool,
    pub innovation: bool,
    pub competition: bool,
}

impl FamilySelection {
    pub fn all() -> Self {
        Self {
            diversity: true,
            novelty: true,
            innovation: true,
            competition: true,
        }
    }

    pub fn none() -> Self {
        Self {
            diversity: false,
            novelty: false,
            innovation: false,
            competition: false,
        }
    }
}

impl Default for FamilySelection {
    fn default() -> Self {
        Self::all()
    }
}

/// Computes the comparative cross-platform report
pub struct PlatformMetricsEngine<'a> {
    snapshot: MetricsSnapshot<'a>,
    config: MetricsConfig,
}

impl<'a> PlatformMetricsEngine<'a> {
    pub fn new(snapshot: MetricsSnapshot<'a>, config: MetricsConfig) -> Self {
        Self { snapshot, config }
    }

    /// Run the requested family passes and assemble the report
    ///
    /// Per-cluster breakdowns and the global HHI aggregates are part of
    /// every report regardless of the selection; they cost one pass over
    /// tables the snapshot already holds.
    #[instrument(skip(self), fields(n_items = self.snapshot.corpus.len()))]
    pub fn compute(&self, families: FamilySelection) -> PlatformMetricsReport {
        let mut skips: Vec<MetricSkip> = Vec::new();

        let (clusters, global) = competition::cluster_breakdowns(&self.snapshot);

        let diversity = if families.diversity {
            let index = build_index(self.snapshot.corpus, &self.config.index);
            Some(diversity::compute(
                &self.snapshot,
                index.as_ref(),
                &self.config,
                &mut skips,
            ))
        } else {
            None
        };
        let novelty = if families.novelty {
            Some(novelty::compute(&self.snapshot))
        } else {
            None
        };
        let innovation = if families.innovation {
            innovation::compute(&self.snapshot, &self.config, &mut skips)
        } else {
            None
        };
        let competition = if families.competition {
            Some(competition::compute(&self.snapshot, &mut skips))
        } else {
            None
        };

        let mut report = PlatformMetricsReport {
            clusters,
            global,
            skips,
            ..Default::default()
        };
        for platform in self.snapshot.platforms() {
            let entry = report.platforms.entry(platform).or_default();
            entry.diversity = diversity.as_ref().and_then(|m| m.get(&platform).cloned());
            entry.novelty = novelty.as_ref().and_then(|m| m.get(&platform).cloned());
            entry.innovation = innovation.as_ref().and_then(|m| m.get(&platform).cloned());
            entry.competition = competition.as_ref().and_then(|m| m.get(&platform).cloned());
        }

        info!(
            n_platforms = report.platforms.len(),
            n_clusters = report.clusters.len(),
            n_skips = report.skips.len(),
            "platform metrics report assembled"
        );
        report
    }
}
