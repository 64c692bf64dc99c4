//! Shared statistical helpers for the metric families

use ndarray::{Array1, Array2};

/// Shannon entropy of a count distribution, in nats
///
/// 0 for an empty, single-valued, or fully concentrated distribution;
/// `ln(m)` for `m` equal counts.
pub fn entropy(counts: &[f64]) -> f64 {
    let total: f64 = counts.iter().filter(|&&c| c > 0.0).sum();
    if total <= 0.0 {
        return 0.0;
    }
    counts
        .iter()
        .filter(|&&c| c > 0.0)
        .map(|&c| {
            let p = c / total;
            -p * p.ln()
        })
        .sum()
}

/// Gini coefficient over a count distribution
///
/// 0 for empty input, a single value, or perfectly equal counts; grows
/// toward 1 as the mass concentrates.
pub fn gini(counts: &[f64]) -> f64 {
    let n = counts.len();
    if n < 2 {
        return 0.0;
    }
    let mean: f64 = counts.iter().sum::<f64>() / n as f64;
    if mean <= 0.0 {
        return 0.0;
    }
    let mut abs_diff_sum = 0.0;
    for i in 0..n {
        for j in 0..n {
            abs_diff_sum += (counts[i] - counts[j]).abs();
        }
    }
    abs_diff_sum / (2.0 * (n * n) as f64 * mean)
}

/// The q-th percentile (0..=100) by linear interpolation over sorted data
///
/// Returns 0.0 for empty input.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

/// Mean after trimming `trim_frac / 2` of the mass at each end
///
/// `trim_frac` 0.1 drops the bottom and top 5%; 0.9 keeps the central
/// decile. Falls back to the plain mean when trimming would drop
/// everything.
pub fn trimmed_mean(values: &[f64], trim_frac: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let cut = ((sorted.len() as f64) * trim_frac / 2.0).floor() as usize;
    let kept = &sorted[cut..sorted.len() - cut];
    if kept.is_empty() {
        return sorted.iter().sum::<f64>() / sorted.len() as f64;
    }
    kept.iter().sum::<f64>() / kept.len() as f64
}

/// Project row vectors onto their top two principal components
///
/// Power iteration with deflation over the centered data; deterministic
/// start vectors, no randomness. Input dimensionality is truncated to
/// `max_dims` columns first. Returns an (n, 2) matrix.
pub fn pca_project_2d(rows: &[&[f32]], max_dims: usize) -> Array2<f64> {
    let n = rows.len();
    let dim = rows.first().map(|r| r.len().min(max_dims)).unwrap_or(0);
    let mut x = Array2::<f64>::zeros((n, dim));
    for (i, row) in rows.iter().enumerate() {
        for (j, &v) in row.iter().take(dim).enumerate() {
            x[[i, j]] = v as f64;
        }
    }

    // Center columns
    if n > 0 {
        let mean: Array1<f64> = x.sum_axis(ndarray::Axis(0)) / n as f64;
        for mut row in x.rows_mut() {
            row -= &mean;
        }
    }

    let mut projected = Array2::<f64>::zeros((n, 2));
    let mut deflated = x.clone();
    for comp in 0..2usize {
        if dim == 0 {
            break;
        }
        // Deterministic start: alternating unit-ish vector per component
        let mut v: Array1<f64> =
            Array1::from_iter((0..dim).map(|j| if j % 2 == comp { 1.0 } else { 0.5 }));
        normalize_inplace(&mut v);
        for _ in 0..50 {
            // v ← Xᵀ (X v), avoiding the dim×dim covariance matrix
            let xv = deflated.dot(&v);
            let mut next = deflated.t().dot(&xv);
            let norm = normalize_inplace(&mut next);
            if norm < 1e-12 {
                break;
            }
            v = next;
        }
        let scores = deflated.dot(&v);
        for i in 0..n {
            projected[[i, comp]] = scores[i];
        }
        // Deflate: remove the captured component
        for i in 0..n {
            for j in 0..dim {
                deflated[[i, j]] -= scores[i] * v[j];
            }
        }
    }
    projected
}

fn normalize_inplace(v: &mut Array1<f64>) -> f64 {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        *v /= norm;
    }
    norm
}

/// Area of the convex hull of 2D points (monotone chain)
///
/// Returns 0.0 for fewer than 3 points or a degenerate (collinear) set.
pub fn convex_hull_area(points: &[(f64, f64)]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    });
    pts.dedup();
    if pts.len() < 3 {
        return 0.0;
    }

    let cross = |o: (f64, f64), a: (f64, f64), b: (f64, f64)| -> f64 {
        (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
    };

    let mut lower: Vec<(f64, f64)> = Vec::new();
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<(f64, f64)> = Vec::new();
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    let hull: Vec<(f64, f64)> = lower.into_iter().chain(upper).collect();
    if hull.len() < 3 {
        return 0.0;
    }

    // Shoelace
    let mut area = 0.0;
    for i in 0..hull.len() {
        let (x1, y1) = hull[i];
        let (x2, y2) = hull[(i + 1) % hull.len()];
        area += x1 * y2 - x2 * y1;
    }
    area.abs() / 2.0
}
