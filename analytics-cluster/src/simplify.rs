//! Condensed-tree simplification for display
//!
//! Turns a condensed tree with potentially thousands of nodes into a small
//! labeled subtree: pick the most important clusters, map each to a
//! representative merge node by majority vote over sampled members, then
//! extract the minimal subtree connecting the representatives to the root
//! and annotate every surviving node for rendering.

use std::collections::{BTreeMap, HashMap, HashSet};

use analytics_core::{AnalyticsError, Result};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::types::{CondensedTree, NOISE_LABEL};

/// Tuning knobs for the simplifier
#[derive(Debug, Clone, Copy)]
pub struct SimplifyConfig {
    /// Maximum number of clusters selected for display (K)
    pub max_clusters: usize,
    /// Members sampled per cluster for the representative vote (S)
    pub sample_budget: usize,
    /// Keywords kept per cluster on an annotated node
    pub max_keywords: usize,
    /// Hard cap on parent-chain steps per climb, against malformed input
    pub step_budget: usize,
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        Self {
            max_clusters: 30,
            sample_budget: 20,
            max_keywords: 4,
            step_budget: 2000,
        }
    }
}

/// How the displayed clusters were ranked
///
/// Persistence ranking needs a stability score for every distinct label
/// observed in the flat labels; anything less falls back to member count.
/// The two rankings mean different things, so the choice is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    Persistence,
    Size,
}

/// What a simplified node stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// An individual item leaf
    Item,
    /// A merge node one or more selected clusters mapped to
    Cluster,
    /// A merge node kept only to connect the subtree
    Structural,
}

/// A render-ready node of the simplified tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplifiedNode {
    /// Condensed-tree node id
    pub id: u64,
    pub kind: NodeKind,
    /// Display label
    pub label: String,
    /// Member count (aggregated over mapped clusters, or estimated)
    pub size: u64,
    /// Cluster labels this node represents (empty for structural nodes)
    pub clusters: Vec<i64>,
    /// Descriptive keywords, capped per cluster
    pub keywords: Vec<String>,
}

/// A cluster whose sampled members could not be resolved to an ancestor
///
/// Non-fatal: the cluster is dropped from the subtree and reported here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AncestorFailure {
    pub label: i64,
    pub members_failed: usize,
}

/// The compressed, render-ready subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplifiedTree {
    pub nodes: Vec<SimplifiedNode>,
    /// (parent, child) pairs of the original tree restricted to `nodes`
    pub edges: Vec<(u64, u64)>,
    pub root: u64,
    pub selection: SelectionMode,
    /// Selected clusters that ended up without a representative
    pub unrepresented: Vec<i64>,
    pub failures: Vec<AncestorFailure>,
}

impl SimplifiedTree {
    /// Structural guarantees: single root, in-degree 1, acyclic
    ///
    /// Checked as a property of the returned edge set, not assumed from
    /// the input tree's contract.
    pub fn validate(&self) -> Result<()> {
        let ids: HashSet<u64> = self.nodes.iter().map(|n| n.id).collect();
        let mut parent: HashMap<u64, u64> = HashMap::new();
        for &(p, c) in &self.edges {
            if !ids.contains(&p) || !ids.contains(&c) {
                return Err(AnalyticsError::internal(format!(
                    "edge ({p}, {c}) references a node outside the tree"
                )));
            }
            if parent.insert(c, p).is_some() {
                return Err(AnalyticsError::internal(format!(
                    "node {c} has more than one incoming edge"
                )));
            }
        }

        let roots: Vec<u64> = self
            .nodes
            .iter()
            .map(|n| n.id)
            .filter(|id| !parent.contains_key(id))
            .collect();
        if roots != vec![self.root] {
            return Err(AnalyticsError::internal(format!(
                "expected single root {}, found {:?}",
                self.root, roots
            )));
        }

        // Every node must reach the root without revisiting anything
        for node in &self.nodes {
            let mut current = node.id;
            let mut visited = HashSet::new();
            while let Some(&p) = parent.get(&current) {
                if !visited.insert(current) {
                    return Err(AnalyticsError::internal(format!(
                        "cycle through node {current}"
                    )));
                }
                current = p;
            }
            if current != self.root {
                return Err(AnalyticsError::internal(format!(
                    "node {} does not reach the root",
                    node.id
                )));
            }
        }
        Ok(())
    }
}

/// Simplify a condensed tree down to at most `max_clusters` display nodes
///
/// `labels` is the flat per-item cluster assignment; `keywords` optionally
/// carries descriptive terms per cluster label for annotation. Fails with
/// [`AnalyticsError::NoClusters`] when every label is noise; individual
/// clusters whose members cannot be resolved to an ancestor are dropped
/// and reported on the output, never raised.
#[instrument(skip(tree, labels, persistence, keywords), fields(n_items = labels.len()))]
pub fn simplify(
    tree: &CondensedTree,
    labels: &[i64],
    persistence: Option<&HashMap<i64, f64>>,
    keywords: Option<&HashMap<i64, Vec<String>>>,
    config: &SimplifyConfig,
) -> Result<SimplifiedTree> {
    // Members per cluster, in label-array order
    let mut members: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        if label != NOISE_LABEL {
            members.entry(label).or_default().push(i);
        }
    }
    if members.is_empty() {
        return Err(AnalyticsError::NoClusters);
    }

    let (selection, selected) = select_clusters(&members, persistence, config.max_clusters);
    debug!(?selection, n_selected = selected.len(), "clusters selected");

    // Representative merge node per selected cluster, by majority vote
    let mut representatives: BTreeMap<i64, u64> = BTreeMap::new();
    let mut unrepresented: Vec<i64> = Vec::new();
    let mut failures: Vec<AncestorFailure> = Vec::new();
    for &label in &selected {
        let sample = &members[&label][..members[&label].len().min(config.sample_budget)];
        let (rep, failed) = representative_node(tree, sample, config.step_budget);
        if failed > 0 {
            warn!(label, failed, "ancestor resolution failed for sampled members");
            failures.push(AncestorFailure {
                label,
                members_failed: failed,
            });
        }
        match rep {
            Some(node) => {
                representatives.insert(label, node);
            }
            None => unrepresented.push(label),
        }
    }

    if representatives.is_empty() {
        return Err(AnalyticsError::internal(
            "no selected cluster could be mapped to a tree node",
        ));
    }

    // Union of root paths from every representative
    let mut node_set: IndexSet<u64> = IndexSet::new();
    for &rep in representatives.values() {
        let mut current = rep;
        // Nodes already in the set terminate the walk, so a cycle cannot
        // recur: every visited node is added before stepping up
        while node_set.insert(current) {
            match tree.parent_of(current) {
                Some(p) => current = p,
                None => break,
            }
        }
    }

    let edges: Vec<(u64, u64)> = node_set
        .iter()
        .filter_map(|&child| {
            tree.parent_of(child)
                .filter(|p| node_set.contains(p))
                .map(|p| (p, child))
        })
        .collect();

    let children: HashSet<u64> = edges.iter().map(|&(_, c)| c).collect();
    let roots: Vec<u64> = node_set
        .iter()
        .copied()
        .filter(|id| !children.contains(id))
        .collect();
    if roots.len() != 1 {
        return Err(AnalyticsError::internal(format!(
            "simplified tree has {} roots: {:?}",
            roots.len(),
            roots
        )));
    }
    let root = roots[0];

    // Clusters mapped per node (several clusters may share an ancestor)
    let mut node_clusters: HashMap<u64, Vec<i64>> = HashMap::new();
    for (&label, &node) in &representatives {
        node_clusters.entry(node).or_default().push(label);
    }

    let nodes: Vec<SimplifiedNode> = node_set
        .iter()
        .map(|&id| annotate(tree, id, &node_clusters, &members, keywords, config))
        .collect();

    let result = SimplifiedTree {
        nodes,
        edges,
        root,
        selection,
        unrepresented,
        failures,
    };
    result.validate()?;
    info!(
        n_nodes = result.nodes.len(),
        n_edges = result.edges.len(),
        unrepresented = result.unrepresented.len(),
        "condensed tree simplified"
    );
    Ok(result)
}

/// Rank clusters and take the top K
///
/// Persistence ranking applies only when a score exists for every distinct
/// observed label (set containment, robust to sparse label ids); otherwise
/// member count decides. Ties break toward the smaller label either way.
fn select_clusters(
    members: &BTreeMap<i64, Vec<usize>>,
    persistence: Option<&HashMap<i64, f64>>,
    max_clusters: usize,
) -> (SelectionMode, Vec<i64>) {
    let mut labels: Vec<i64> = members.keys().copied().collect();
    let mode = match persistence {
        Some(p) if members.keys().all(|label| p.contains_key(label)) => {
            labels.sort_by(|a, b| {
                p[b].partial_cmp(&p[a])
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.cmp(b))
            });
            SelectionMode::Persistence
        }
        _ => {
            labels.sort_by(|a, b| members[b].len().cmp(&members[a].len()).then(a.cmp(b)));
            SelectionMode::Size
        }
    };
    labels.truncate(max_clusters);
    (mode, labels)
}

/// Majority-vote representative merge node for a cluster's sampled members
///
/// Each member climbs the parent chain from its leaf until it reaches a
/// cluster-forming node. The climb carries its own cycle defense: a
/// visited set (the input is external and never verified acyclic) and a
/// hard step budget. Returns the winning node and how many members failed
/// to resolve; `None` when no member resolved at all.
fn representative_node(
    tree: &CondensedTree,
    sample: &[usize],
    step_budget: usize,
) -> (Option<u64>, usize) {
    let mut votes: BTreeMap<u64, usize> = BTreeMap::new();
    let mut failed = 0usize;

    for &member in sample {
        match climb_to_cluster_node(tree, member as u64, step_budget) {
            Some(ancestor) => *votes.entry(ancestor).or_insert(0) += 1,
            None => failed += 1,
        }
    }

    // Highest vote count wins; ties break toward the smaller node id
    // (strict comparison over the ascending BTreeMap keeps the first max)
    let mut rep: Option<(u64, usize)> = None;
    for (&node, &count) in &votes {
        if rep.map(|(_, c)| count > c).unwrap_or(true) {
            rep = Some((node, count));
        }
    }
    (rep.map(|(node, _)| node), failed)
}

/// Climb parent pointers from a leaf to the first cluster-forming node
fn climb_to_cluster_node(tree: &CondensedTree, leaf: u64, step_budget: usize) -> Option<u64> {
    let mut current = leaf;
    let mut visited: HashSet<u64> = HashSet::new();
    let mut steps = 0usize;

    loop {
        if tree.is_cluster_node(current) {
            return Some(current);
        }
        if !visited.insert(current) {
            return None; // revisited a node: the chain loops
        }
        steps += 1;
        if steps > step_budget {
            return None;
        }
        current = tree.parent_of(current)?;
    }
}

/// Build the render annotation for one surviving node
fn annotate(
    tree: &CondensedTree,
    id: u64,
    node_clusters: &HashMap<u64, Vec<i64>>,
    members: &BTreeMap<i64, Vec<usize>>,
    keywords: Option<&HashMap<i64, Vec<String>>>,
    config: &SimplifyConfig,
) -> SimplifiedNode {
    if !tree.is_cluster_node(id) {
        return SimplifiedNode {
            id,
            kind: NodeKind::Item,
            label: format!("item {id}"),
            size: 1,
            clusters: Vec::new(),
            keywords: Vec::new(),
        };
    }

    if let Some(clusters) = node_clusters.get(&id) {
        let mut clusters = clusters.clone();
        clusters.sort_unstable();
        let size: u64 = clusters
            .iter()
            .map(|l| members.get(l).map(|m| m.len() as u64).unwrap_or(0))
            .sum();
        let mut words: Vec<String> = Vec::new();
        if let Some(map) = keywords {
            for label in &clusters {
                if let Some(terms) = map.get(label) {
                    words.extend(terms.iter().take(config.max_keywords).cloned());
                }
            }
        }
        let label = if clusters.len() == 1 {
            format!("cluster {} ({} items)", clusters[0], size)
        } else {
            let joined = clusters
                .iter()
                .map(|l| l.to_string())
                .collect::<Vec<_>>()
                .join("+");
            format!("clusters {joined} ({size} items)")
        };
        return SimplifiedNode {
            id,
            kind: NodeKind::Cluster,
            label,
            size,
            clusters,
            keywords: words,
        };
    }

    let size = tree.aggregate_child_size(id);
    SimplifiedNode {
        id,
        kind: NodeKind::Structural,
        label: format!("group of {size}"),
        size,
        clusters: Vec::new(),
        keywords: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CondensedTreeRow;

    /// 6 leaves, root 6, cluster nodes 7 and 8
    fn two_cluster_tree() -> CondensedTree {
        let rows = vec![
            CondensedTreeRow { parent: 6, child: 7, lambda_val: 0.5, child_size: 3 },
            CondensedTreeRow { parent: 6, child: 8, lambda_val: 0.5, child_size: 3 },
            CondensedTreeRow { parent: 7, child: 0, lambda_val: 1.2, child_size: 1 },
            CondensedTreeRow { parent: 7, child: 1, lambda_val: 1.2, child_size: 1 },
            CondensedTreeRow { parent: 7, child: 2, lambda_val: 1.1, child_size: 1 },
            CondensedTreeRow { parent: 8, child: 3, lambda_val: 1.3, child_size: 1 },
            CondensedTreeRow { parent: 8, child: 4, lambda_val: 1.3, child_size: 1 },
            CondensedTreeRow { parent: 8, child: 5, lambda_val: 1.0, child_size: 1 },
        ];
        CondensedTree::new(rows, 6)
    }

    fn labels() -> Vec<i64> {
        vec![0, 0, 0, 1, 1, 1]
    }

    #[test]
    fn test_two_cluster_subtree() {
        let tree = two_cluster_tree();
        let result = simplify(&tree, &labels(), None, None, &SimplifyConfig::default()).unwrap();

        let ids: Vec<u64> = result.nodes.iter().map(|n| n.id).collect();
        assert!(ids.contains(&6) && ids.contains(&7) && ids.contains(&8));
        assert_eq!(result.root, 6);
        assert_eq!(result.edges.len(), 2);
        assert!(result.edges.contains(&(6, 7)));
        assert!(result.edges.contains(&(6, 8)));
        assert_eq!(result.selection, SelectionMode::Size);
        assert!(result.unrepresented.is_empty());
        assert!(result.failures.is_empty());
    }

    #[test]
    fn test_cluster_node_annotation() {
        let tree = two_cluster_tree();
        let keywords: HashMap<i64, Vec<String>> = [(0i64, vec!["fed".into(), "rates".into()])]
            .into_iter()
            .collect();
        let result = simplify(
            &tree,
            &labels(),
            None,
            Some(&keywords),
            &SimplifyConfig::default(),
        )
        .unwrap();

        let node7 = result.nodes.iter().find(|n| n.id == 7).unwrap();
        assert_eq!(node7.kind, NodeKind::Cluster);
        assert_eq!(node7.clusters, vec![0]);
        assert_eq!(node7.size, 3);
        assert_eq!(node7.keywords, vec!["fed".to_string(), "rates".to_string()]);

        let root = result.nodes.iter().find(|n| n.id == 6).unwrap();
        assert_eq!(root.kind, NodeKind::Structural);
        assert_eq!(root.size, 6, "structural size sums child_size rows");
    }

    #[test]
    fn test_persistence_selection_and_cap() {
        let tree = two_cluster_tree();
        let persistence: HashMap<i64, f64> = [(0, 1.0), (1, 5.0)].into_iter().collect();
        let config = SimplifyConfig {
            max_clusters: 1,
            ..SimplifyConfig::default()
        };
        let result = simplify(&tree, &labels(), Some(&persistence), None, &config).unwrap();

        assert_eq!(result.selection, SelectionMode::Persistence);
        let cluster_nodes: Vec<&SimplifiedNode> = result
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Cluster)
            .collect();
        assert_eq!(cluster_nodes.len(), 1);
        assert_eq!(
            cluster_nodes[0].clusters,
            vec![1],
            "cluster 1 has the higher persistence"
        );
    }

    #[test]
    fn test_incomplete_persistence_falls_back_to_size() {
        let tree = two_cluster_tree();
        // Persistence for cluster 0 only; cluster 1 is observed in labels
        let persistence: HashMap<i64, f64> = [(0, 9.0)].into_iter().collect();
        let result = simplify(
            &tree,
            &labels(),
            Some(&persistence),
            None,
            &SimplifyConfig::default(),
        )
        .unwrap();
        assert_eq!(
            result.selection,
            SelectionMode::Size,
            "incomplete persistence must switch the ranking to size"
        );
    }

    #[test]
    fn test_all_noise_is_an_error() {
        let tree = two_cluster_tree();
        let err = simplify(
            &tree,
            &[-1, -1, -1, -1, -1, -1],
            None,
            None,
            &SimplifyConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AnalyticsError::NoClusters));
    }

    #[test]
    fn test_injected_cycle_terminates_and_is_reported() {
        // Leaves 0 and 1 point at each other: the climb must abort via the
        // visited set, and cluster 0 ends up unrepresented
        let rows = vec![
            CondensedTreeRow { parent: 1, child: 0, lambda_val: 1.0, child_size: 1 },
            CondensedTreeRow { parent: 0, child: 1, lambda_val: 1.0, child_size: 1 },
            CondensedTreeRow { parent: 6, child: 8, lambda_val: 0.5, child_size: 3 },
            CondensedTreeRow { parent: 8, child: 3, lambda_val: 1.3, child_size: 1 },
            CondensedTreeRow { parent: 8, child: 4, lambda_val: 1.3, child_size: 1 },
            CondensedTreeRow { parent: 8, child: 5, lambda_val: 1.0, child_size: 1 },
        ];
        let tree = CondensedTree::new(rows, 6);
        let labels = vec![0, 0, -1, 1, 1, 1];
        let result = simplify(&tree, &labels, None, None, &SimplifyConfig::default()).unwrap();

        assert_eq!(result.unrepresented, vec![0]);
        let failure = result
            .failures
            .iter()
            .find(|f| f.label == 0)
            .expect("cycle must be recorded as an ancestor failure");
        assert_eq!(failure.members_failed, 2);
        // Cluster 1 is unaffected
        assert!(result.nodes.iter().any(|n| n.clusters == vec![1]));
    }

    #[test]
    fn test_step_budget_caps_long_chains() {
        // A long leaf-to-leaf chain before any cluster node
        let mut rows = Vec::new();
        for i in 0..50u64 {
            rows.push(CondensedTreeRow {
                parent: i + 1,
                child: i,
                lambda_val: 1.0,
                child_size: 1,
            });
        }
        // Leaf 50 finally merges into cluster node 100
        rows.push(CondensedTreeRow { parent: 100, child: 50, lambda_val: 0.5, child_size: 51 });
        let tree = CondensedTree::new(rows, 51);
        let labels = vec![0i64; 51];

        let tight = SimplifyConfig {
            step_budget: 5,
            sample_budget: 1,
            ..SimplifyConfig::default()
        };
        let result = simplify(&tree, &labels, None, None, &tight);
        // The single sampled member (leaf 0) exhausts the budget
        assert!(result.is_err() || !result.unwrap().unrepresented.is_empty());
    }

    #[test]
    fn test_rerun_is_identical() {
        let tree = two_cluster_tree();
        let a = simplify(&tree, &labels(), None, None, &SimplifyConfig::default()).unwrap();
        let b = simplify(&tree, &labels(), None, None, &SimplifyConfig::default()).unwrap();
        assert_eq!(a, b, "deterministic inputs must produce identical trees");
    }

    #[test]
    fn test_validate_rejects_double_parent() {
        let tree = SimplifiedTree {
            nodes: vec![
                SimplifiedNode {
                    id: 1,
                    kind: NodeKind::Structural,
                    label: "a".into(),
                    size: 1,
                    clusters: vec![],
                    keywords: vec![],
                },
                SimplifiedNode {
                    id: 2,
                    kind: NodeKind::Structural,
                    label: "b".into(),
                    size: 1,
                    clusters: vec![],
                    keywords: vec![],
                },
                SimplifiedNode {
                    id: 3,
                    kind: NodeKind::Structural,
                    label: "c".into(),
                    size: 1,
                    clusters: vec![],
                    keywords: vec![],
                },
            ],
            edges: vec![(1, 3), (2, 3)],
            root: 1,
            selection: SelectionMode::Size,
            unrepresented: vec![],
            failures: vec![],
        };
        assert!(tree.validate().is_err(), "two parents for one child");
    }

    #[test]
    fn test_serializes_for_renderers() {
        let tree = two_cluster_tree();
        let result = simplify(&tree, &labels(), None, None, &SimplifyConfig::default()).unwrap();
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"selection\":\"size\""));
    }
}
