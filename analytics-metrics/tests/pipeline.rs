//! End-to-end pipeline scenarios over synthetic corpora
//!
//! Exercises the stage chain the way a batch run does: corpus snapshot →
//! neighborhoods → (external) cluster labels → simplified tree → platform
//! metrics report.

use std::collections::HashMap;

use analytics_cluster::{simplify, CondensedTree, CondensedTreeRow, SimplifyConfig};
use analytics_core::{CorpusSnapshot, MarketItem, Platform};
use analytics_embedding::{Neighbor, NoveltyScorer};
use analytics_metrics::{
    FamilySelection, MetricsConfig, MetricsSnapshot, PlatformMetricsEngine,
};
use chrono::{TimeZone, Utc};

/// Build an item sitting near the axis of its cluster, with a small
/// deterministic offset so no two embeddings coincide unless asked to
fn item(id: usize, platform: Platform, cluster_axis: usize, jitter: usize) -> MarketItem {
    let mut embedding = vec![0.0f32; 4];
    embedding[cluster_axis] = 1.0;
    embedding[(cluster_axis + 1) % 4] = 0.01 * jitter as f32;
    MarketItem::new(format!("m{}", id), platform, format!("Market {}", id), embedding)
}

fn neighborhoods(corpus: &CorpusSnapshot) -> Vec<Vec<Neighbor>> {
    NoveltyScorer::default()
        .neighborhoods(corpus, 25.min(corpus.len() - 1))
        .unwrap()
}

#[test]
fn cluster_shares_sum_to_one() {
    let items = vec![
        item(0, Platform::Kalshi, 0, 0),
        item(1, Platform::Kalshi, 0, 1),
        item(2, Platform::Polymarket, 0, 2),
        item(3, Platform::Polymarket, 1, 0),
        item(4, Platform::Manifold, 1, 1),
    ];
    let corpus = CorpusSnapshot::new(items).unwrap();
    let labels = vec![0, 0, 0, 1, 1];
    let hoods = neighborhoods(&corpus);
    let snapshot = MetricsSnapshot::new(&corpus, &labels, &hoods, None, None).unwrap();
    let report = PlatformMetricsEngine::new(snapshot, MetricsConfig::default())
        .compute(FamilySelection::all());

    for cluster in &report.clusters {
        let total: f64 = cluster.shares.values().sum();
        assert!(
            (total - 1.0).abs() < 1e-9,
            "shares of cluster {} sum to {}, expected 1",
            cluster.label,
            total
        );
    }
}

#[test]
fn hhi_single_platform_and_even_four_way_split() {
    let items = vec![
        // Cluster 0: Kalshi only
        item(0, Platform::Kalshi, 0, 0),
        item(1, Platform::Kalshi, 0, 1),
        // Cluster 1: one item per platform
        item(2, Platform::Kalshi, 1, 0),
        item(3, Platform::Polymarket, 1, 1),
        item(4, Platform::Metaculus, 1, 2),
        item(5, Platform::Manifold, 1, 3),
    ];
    let corpus = CorpusSnapshot::new(items).unwrap();
    let labels = vec![0, 0, 1, 1, 1, 1];
    let hoods = neighborhoods(&corpus);
    let snapshot = MetricsSnapshot::new(&corpus, &labels, &hoods, None, None).unwrap();
    let report = PlatformMetricsEngine::new(snapshot, MetricsConfig::default())
        .compute(FamilySelection::all());

    let single = report.clusters.iter().find(|c| c.label == 0).unwrap();
    assert!((single.hhi - 1.0).abs() < 1e-9, "single platform → HHI 1.0");
    assert_eq!(single.dominant, Platform::Kalshi);

    let split = report.clusters.iter().find(|c| c.label == 1).unwrap();
    assert!(
        (split.hhi - 0.25).abs() < 1e-9,
        "even 4-way split → HHI 0.25, got {}",
        split.hhi
    );
}

#[test]
fn majority_share_scenario() {
    // Cluster 0: 2× Kalshi, 1× Polymarket → Kalshi share 0.667
    let items = vec![
        item(0, Platform::Kalshi, 0, 0),
        item(1, Platform::Kalshi, 0, 1),
        item(2, Platform::Polymarket, 0, 2),
    ];
    let corpus = CorpusSnapshot::new(items).unwrap();
    let labels = vec![0, 0, 0];
    let hoods = neighborhoods(&corpus);
    let snapshot = MetricsSnapshot::new(&corpus, &labels, &hoods, None, None).unwrap();
    let report = PlatformMetricsEngine::new(snapshot, MetricsConfig::default())
        .compute(FamilySelection::all());

    let kalshi = report.platforms[&Platform::Kalshi]
        .diversity
        .as_ref()
        .unwrap();
    assert_eq!(
        kalshi.majority[&50].majority_clusters, 1,
        "Kalshi holds 2/3 > 50%"
    );
    let poly = report.platforms[&Platform::Polymarket]
        .diversity
        .as_ref()
        .unwrap();
    assert_eq!(
        poly.majority[&50].majority_clusters, 0,
        "Polymarket holds 1/3 < 50%"
    );
}

#[test]
fn entropy_concentrated_and_even() {
    let mut items = Vec::new();
    // Kalshi: everything in cluster 0
    for j in 0..4 {
        items.push(item(j, Platform::Kalshi, 0, j));
    }
    // Polymarket: split evenly between clusters 0 and 1
    for j in 0..2 {
        items.push(item(10 + j, Platform::Polymarket, 0, j + 4));
    }
    for j in 0..2 {
        items.push(item(20 + j, Platform::Polymarket, 1, j));
    }
    let corpus = CorpusSnapshot::new(items).unwrap();
    let labels = vec![0, 0, 0, 0, 0, 0, 1, 1];
    let hoods = neighborhoods(&corpus);
    let snapshot = MetricsSnapshot::new(&corpus, &labels, &hoods, None, None).unwrap();
    let report = PlatformMetricsEngine::new(snapshot, MetricsConfig::default())
        .compute(FamilySelection::all());

    let kalshi = report.platforms[&Platform::Kalshi]
        .diversity
        .as_ref()
        .unwrap();
    assert!(
        kalshi.cluster_entropy.abs() < 1e-9,
        "one cluster → entropy 0"
    );

    let poly = report.platforms[&Platform::Polymarket]
        .diversity
        .as_ref()
        .unwrap();
    assert!(
        (poly.cluster_entropy - 2.0f64.ln()).abs() < 1e-9,
        "even split over 2 clusters → ln 2, got {}",
        poly.cluster_entropy
    );
}

#[test]
fn innovation_omitted_without_timestamps() {
    let items = vec![
        item(0, Platform::Kalshi, 0, 0),
        item(1, Platform::Polymarket, 0, 1),
    ];
    let corpus = CorpusSnapshot::new(items).unwrap();
    let labels = vec![0, 0];
    let hoods = neighborhoods(&corpus);
    let snapshot = MetricsSnapshot::new(&corpus, &labels, &hoods, None, None).unwrap();
    let report = PlatformMetricsEngine::new(snapshot, MetricsConfig::default())
        .compute(FamilySelection::all());

    assert!(
        report.platforms[&Platform::Kalshi].innovation.is_none(),
        "no timestamps → family omitted"
    );
    assert!(
        report.skips.iter().any(|s| s.metric == "innovation"),
        "omission must be recorded in skips"
    );
}

#[test]
fn founders_and_topic_flow() {
    let t = |day| Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0).unwrap();
    let items = vec![
        // Cluster 0: Kalshi enters day 1, Polymarket day 3
        item(0, Platform::Kalshi, 0, 0).with_created_at(t(1)),
        item(1, Platform::Kalshi, 0, 1).with_created_at(t(2)),
        item(2, Platform::Polymarket, 0, 2).with_created_at(t(3)),
        // Cluster 1: Polymarket first
        item(3, Platform::Polymarket, 1, 0).with_created_at(t(5)),
        item(4, Platform::Kalshi, 1, 1).with_created_at(t(8)),
        item(5, Platform::Polymarket, 1, 2).with_created_at(t(6)),
    ];
    let corpus = CorpusSnapshot::new(items).unwrap();
    let labels = vec![0, 0, 0, 1, 1, 1];
    let persistence: HashMap<i64, f64> = [(0, 1.5), (1, 0.5)].into_iter().collect();
    let hoods = neighborhoods(&corpus);
    let snapshot =
        MetricsSnapshot::new(&corpus, &labels, &hoods, None, Some(&persistence)).unwrap();
    let report = PlatformMetricsEngine::new(snapshot, MetricsConfig::default())
        .compute(FamilySelection::all());

    let kalshi = report.platforms[&Platform::Kalshi]
        .innovation
        .as_ref()
        .unwrap();
    assert_eq!(kalshi.founded_clusters, 1, "Kalshi founded cluster 0");
    assert!(
        (kalshi.first_by_earliest - 0.5).abs() < 1e-9,
        "earliest in 1 of 2 participated clusters"
    );
    assert!(
        (kalshi.among_first_five - 1.0).abs() < 1e-9,
        "both clusters have fewer than five items"
    );

    let poly = report.platforms[&Platform::Polymarket]
        .innovation
        .as_ref()
        .unwrap();
    assert_eq!(poly.founded_clusters, 1, "Polymarket founded cluster 1");

    // Topic flow: Kalshi→Polymarket in cluster 0, Polymarket→Kalshi in 1
    let kalshi_flow = report.platforms[&Platform::Kalshi]
        .competition
        .as_ref()
        .unwrap();
    assert_eq!(kalshi_flow.flow_out_degree, 1);
    assert_eq!(kalshi_flow.flow_in_degree, 1);
    assert!((kalshi_flow.flow_ratio - 0.5).abs() < 1e-9, "1 / (1 + 1)");

    // Jaccard overlap: both platforms sit in both clusters
    assert!(
        (kalshi_flow.overlap[&Platform::Polymarket] - 1.0).abs() < 1e-9,
        "identical participated-cluster sets"
    );
}

#[test]
fn spread_skipped_for_tiny_platform_and_recorded() {
    let items = vec![
        item(0, Platform::Kalshi, 0, 0),
        item(1, Platform::Kalshi, 0, 1),
        item(2, Platform::Kalshi, 0, 2),
        item(3, Platform::Kalshi, 1, 3),
        // Manifold has 2 items: spread and hull must be skipped
        item(4, Platform::Manifold, 1, 0),
        item(5, Platform::Manifold, 1, 1),
    ];
    let corpus = CorpusSnapshot::new(items).unwrap();
    let labels = vec![0, 0, 0, 1, 1, 1];
    let hoods = neighborhoods(&corpus);
    let snapshot = MetricsSnapshot::new(&corpus, &labels, &hoods, None, None).unwrap();
    let report = PlatformMetricsEngine::new(snapshot, MetricsConfig::default())
        .compute(FamilySelection::all());

    let manifold = report.platforms[&Platform::Manifold]
        .diversity
        .as_ref()
        .unwrap();
    assert!(manifold.spread.is_none());
    assert!(manifold.hull_area.is_none());
    assert!(
        report
            .skips
            .iter()
            .any(|s| s.platform == Some(Platform::Manifold) && s.metric == "spread"),
        "skip must name the platform and metric"
    );

    let kalshi = report.platforms[&Platform::Kalshi]
        .diversity
        .as_ref()
        .unwrap();
    assert!(kalshi.spread.is_some(), "4 items are enough for spread");
}

#[test]
fn family_subset_only_computes_requested() {
    let items = vec![
        item(0, Platform::Kalshi, 0, 0),
        item(1, Platform::Polymarket, 0, 1),
    ];
    let corpus = CorpusSnapshot::new(items).unwrap();
    let labels = vec![0, 0];
    let hoods = neighborhoods(&corpus);
    let snapshot = MetricsSnapshot::new(&corpus, &labels, &hoods, None, None).unwrap();
    let selection = FamilySelection {
        novelty: true,
        ..FamilySelection::none()
    };
    let report =
        PlatformMetricsEngine::new(snapshot, MetricsConfig::default()).compute(selection);

    let kalshi = &report.platforms[&Platform::Kalshi];
    assert!(kalshi.novelty.is_some());
    assert!(kalshi.diversity.is_none());
    assert!(kalshi.competition.is_none());
    assert!(
        !report.clusters.is_empty(),
        "cluster breakdowns ship with every report"
    );
}

#[test]
fn full_pipeline_through_tree_simplification() {
    // Two geometric clusters, novelty scores, a condensed tree, then the
    // simplified tree and the metrics report from the same labels
    let mut items = Vec::new();
    for j in 0..3 {
        items.push(item(j, Platform::Kalshi, 0, j));
    }
    for j in 0..3 {
        items.push(item(10 + j, Platform::Polymarket, 1, j));
    }
    let corpus = CorpusSnapshot::new(items).unwrap();
    let labels = vec![0, 0, 0, 1, 1, 1];

    let scores = NoveltyScorer::default().score(&corpus, 2).unwrap();
    assert!(scores.iter().all(|&s| (0.0..=2.0).contains(&s)));

    let rows = vec![
        CondensedTreeRow { parent: 6, child: 7, lambda_val: 0.4, child_size: 3 },
        CondensedTreeRow { parent: 6, child: 8, lambda_val: 0.4, child_size: 3 },
        CondensedTreeRow { parent: 7, child: 0, lambda_val: 1.0, child_size: 1 },
        CondensedTreeRow { parent: 7, child: 1, lambda_val: 1.0, child_size: 1 },
        CondensedTreeRow { parent: 7, child: 2, lambda_val: 1.0, child_size: 1 },
        CondensedTreeRow { parent: 8, child: 3, lambda_val: 1.0, child_size: 1 },
        CondensedTreeRow { parent: 8, child: 4, lambda_val: 1.0, child_size: 1 },
        CondensedTreeRow { parent: 8, child: 5, lambda_val: 1.0, child_size: 1 },
    ];
    let tree = CondensedTree::new(rows, 6);
    let simplified = simplify(&tree, &labels, None, None, &SimplifyConfig::default()).unwrap();
    simplified.validate().unwrap();
    assert_eq!(simplified.root, 6);

    let hoods = neighborhoods(&corpus);
    let snapshot = MetricsSnapshot::new(&corpus, &labels, &hoods, None, None).unwrap();
    let report = PlatformMetricsEngine::new(snapshot, MetricsConfig::default())
        .compute(FamilySelection::all());
    assert_eq!(report.clusters.len(), 2);
    assert!(report.platforms.contains_key(&Platform::Kalshi));

    // The report is plain data for downstream consumers
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("mean_hhi"));
}
