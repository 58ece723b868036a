//! Nearest-neighbour correspondence search shared by both ICP variants.

use kiddo::SquaredEuclidean;
use kiddo::float::kdtree::KdTree;

use crate::core::types::PointCloud2D;

/// k-d tree over target points.
///
/// The bucket size exceeds the preprocessor's point cap, so a tree built from
/// one scan is a single leaf and never has to split on duplicate coordinates.
pub type PointTree = KdTree<f32, u64, 2, 256, u32>;

/// A source point paired with its nearest target point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    pub source_idx: usize,
    pub target_idx: usize,
    /// Squared distance between the pair (m²).
    pub distance_sq: f32,
}

/// Build a k-d tree from a point cloud. Items are point indices.
pub fn build_kdtree(cloud: &PointCloud2D) -> PointTree {
    let mut tree = PointTree::with_capacity(cloud.len());
    for i in 0..cloud.len() {
        tree.add(&[cloud.xs[i], cloud.ys[i]], i as u64);
    }
    tree
}

/// Pair each source point with its nearest target point.
///
/// Pairs farther than `max_distance` are rejected, then the worst
/// `outlier_ratio` fraction of the survivors is trimmed. The result is in
/// source order.
pub fn find_correspondences(
    tree: &PointTree,
    target_len: usize,
    source: &PointCloud2D,
    max_distance: f32,
    outlier_ratio: f32,
) -> Vec<Correspondence> {
    if target_len == 0 {
        return Vec::new();
    }

    let max_dist_sq = max_distance * max_distance;
    let mut pairs: Vec<Correspondence> = (0..source.len())
        .filter_map(|i| {
            let nearest = tree.nearest_one::<SquaredEuclidean>(&[source.xs[i], source.ys[i]]);
            (nearest.distance <= max_dist_sq).then_some(Correspondence {
                source_idx: i,
                target_idx: nearest.item as usize,
                distance_sq: nearest.distance,
            })
        })
        .collect();

    let drop = (pairs.len() as f32 * outlier_ratio.clamp(0.0, 1.0)).floor() as usize;
    if drop > 0 {
        pairs.sort_by(|a, b| {
            a.distance_sq
                .total_cmp(&b.distance_sq)
                .then(a.source_idx.cmp(&b.source_idx))
        });
        pairs.truncate(pairs.len() - drop);
        pairs.sort_by_key(|c| c.source_idx);
    }
    pairs
}

/// Unit normal of the local line at each point, from its scan-order
/// neighbours. `None` where no neighbour lies within `max_gap`.
pub fn line_normals(cloud: &PointCloud2D, max_gap: f32) -> Vec<Option<(f32, f32)>> {
    let n = cloud.len();
    let gap_sq = max_gap * max_gap;
    let near = |i: usize, j: usize| cloud.point_at(i).distance_squared(&cloud.point_at(j)) <= gap_sq;

    (0..n)
        .map(|i| {
            let prev = (i > 0 && near(i, i - 1)).then(|| i - 1);
            let next = (i + 1 < n && near(i, i + 1)).then_some(i + 1);
            let (a, b) = match (prev, next) {
                (Some(p), Some(q)) => (p, q),
                (Some(p), None) => (p, i),
                (None, Some(q)) => (i, q),
                (None, None) => return None,
            };
            let dx = cloud.xs[b] - cloud.xs[a];
            let dy = cloud.ys[b] - cloud.ys[a];
            let len = (dx * dx + dy * dy).sqrt();
            (len > 1e-6).then(|| (-dy / len, dx / len))
        })
        .collect()
}

/// Condition number of the translation constraint carried by `pairs`.
///
/// Each pair whose target point has a normal adds `n nᵀ` to a 2x2 matrix;
/// the result is the ratio of its larger to its smaller eigenvalue. Walls
/// facing several directions give values near 1. A straight corridor gives
/// infinity: sliding along the walls leaves every residual unchanged.
pub fn translation_condition(normals: &[Option<(f32, f32)>], pairs: &[Correspondence]) -> f32 {
    let (mut a, mut b, mut c) = (0.0f64, 0.0f64, 0.0f64);
    for pair in pairs {
        if let Some((nx, ny)) = normals.get(pair.target_idx).copied().flatten() {
            let (nx, ny) = (nx as f64, ny as f64);
            a += nx * nx;
            b += nx * ny;
            c += ny * ny;
        }
    }

    let mean = 0.5 * (a + c);
    let spread = (0.25 * (a - c) * (a - c) + b * b).sqrt();
    let (max, min) = (mean + spread, mean - spread);
    if max <= 0.0 || min <= max * 1e-9 {
        return f32::INFINITY;
    }
    (max / min) as f32
}

/// Root mean square of correspondence distances, `None` when empty.
pub fn rms_distance(pairs: &[Correspondence]) -> Option<f32> {
    if pairs.is_empty() {
        return None;
    }
    let sum: f32 = pairs.iter().map(|c| c.distance_sq).sum();
    Some((sum / pairs.len() as f32).sqrt())
}
