//! Local Outlier Factor over k-neighborhoods
//!
//! LOF compares an item's local density to its neighbors' densities.
//! Values near 1 mean the item sits in a region as dense as its
//! neighborhood; values well above 1 mark local outliers.

use tracing::debug;

use crate::index::Neighbor;

/// LOF per item from precomputed k-neighborhoods
///
/// `neighborhoods[i]` must hold item i's nearest neighbors ascending by
/// distance (at least 1 each). Degenerate neighborhoods where every
/// reachability distance is 0 (exact duplicates all around) yield 1.0.
pub fn local_outlier_factor(neighborhoods: &[Vec<Neighbor>]) -> Vec<f64> {
    let n = neighborhoods.len();

    // k-distance: distance to the last (k-th) listed neighbor
    let k_distance: Vec<f64> = neighborhoods
        .iter()
        .map(|hits| hits.last().map(|h| h.distance).unwrap_or(0.0))
        .collect();

    // Local reachability density
    let lrd: Vec<f64> = neighborhoods
        .iter()
        .map(|hits| {
            if hits.is_empty() {
                return 0.0;
            }
            let mean_reach: f64 = hits
                .iter()
                .map(|h| h.distance.max(k_distance[h.index]))
                .sum::<f64>()
                / hits.len() as f64;
            if mean_reach > 0.0 {
                1.0 / mean_reach
            } else {
                f64::INFINITY
            }
        })
        .collect();

    let lof: Vec<f64> = (0..n)
        .map(|i| {
            let hits = &neighborhoods[i];
            if hits.is_empty() {
                return 1.0;
            }
            if lrd[i].is_infinite() {
                // Zero-radius neighborhood: as dense as it gets
                return 1.0;
            }
            let mean_neighbor_lrd: f64 = hits
                .iter()
                .map(|h| {
                    if lrd[h.index].is_infinite() {
                        lrd[i]
                    } else {
                        lrd[h.index]
                    }
                })
                .sum::<f64>()
                / hits.len() as f64;
            if lrd[i] > 0.0 {
                mean_neighbor_lrd / lrd[i]
            } else {
                1.0
            }
        })
        .collect();

    debug!(n_items = n, "local outlier factors computed");
    lof
}
