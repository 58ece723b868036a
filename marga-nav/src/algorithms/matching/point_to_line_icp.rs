//! Point-to-Line ICP scan matcher.
//!
//! Minimizes the distance from each source point to the line through its
//! nearest target point, so points are free to slide along walls. Line
//! normals come from each target point's scan-order neighbours. Target points
//! with no nearby neighbour fall back to point-to-point residuals.
//!
//! The normal equations carry Levenberg damping, which keeps the step bounded
//! in corridors where motion along the walls is unobservable. Such results
//! report an unbounded condition number and are not trusted by fusion.

use super::correspondence::{Correspondence, build_kdtree, find_correspondences, line_normals};
use super::icp::{IcpConfig, finish};
use super::{ScanMatchResult, ScanMatcher};
use crate::core::types::{PointCloud2D, Pose2D};

/// Point-to-Line ICP scan matcher.
#[derive(Debug, Clone)]
pub struct PointToLineIcp {
    config: IcpConfig,
}

impl PointToLineIcp {
    pub fn new(config: IcpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IcpConfig {
        &self.config
    }

    /// One damped Gauss-Newton step about `current`.
    fn compute_increment(
        &self,
        source: &PointCloud2D,
        moved: &PointCloud2D,
        target: &PointCloud2D,
        normals: &[Option<(f32, f32)>],
        pairs: &[Correspondence],
        current: &Pose2D,
    ) -> Option<[f64; 3]> {
        let (sin_t, cos_t) = (current.theta as f64).sin_cos();
        let mut h = [[0.0f64; 3]; 3];
        let mut g = [0.0f64; 3];

        let mut accumulate = |nx: f64, ny: f64, px: f64, py: f64, ex: f64, ey: f64| {
            let r = nx * ex + ny * ey;
            let j = [
                nx,
                ny,
                nx * (-sin_t * px - cos_t * py) + ny * (cos_t * px - sin_t * py),
            ];
            for a in 0..3 {
                for b in 0..3 {
                    h[a][b] += j[a] * j[b];
                }
                g[a] -= j[a] * r;
            }
        };

        for c in pairs {
            let px = source.xs[c.source_idx] as f64;
            let py = source.ys[c.source_idx] as f64;
            let ex = (moved.xs[c.source_idx] - target.xs[c.target_idx]) as f64;
            let ey = (moved.ys[c.source_idx] - target.ys[c.target_idx]) as f64;

            match normals[c.target_idx] {
                Some((nx, ny)) => accumulate(nx as f64, ny as f64, px, py, ex, ey),
                None => {
                    accumulate(1.0, 0.0, px, py, ex, ey);
                    accumulate(0.0, 1.0, px, py, ex, ey);
                }
            }
        }

        let lambda = self.config.damping as f64 * pairs.len() as f64;
        for (i, row) in h.iter_mut().enumerate() {
            row[i] += lambda;
        }

        solve_3x3(&h, &g)
    }
}

/// Solve the 3x3 system `h * x = g` by Cramer's rule. `None` if singular.
fn solve_3x3(h: &[[f64; 3]; 3], g: &[f64; 3]) -> Option<[f64; 3]> {
    let det = h[0][0] * (h[1][1] * h[2][2] - h[1][2] * h[2][1])
        - h[0][1] * (h[1][0] * h[2][2] - h[1][2] * h[2][0])
        + h[0][2] * (h[1][0] * h[2][1] - h[1][1] * h[2][0]);

    if !det.is_finite() || det.abs() < 1e-12 {
        return None;
    }

    let replace = |col: usize| {
        let mut m = *h;
        for (row, value) in m.iter_mut().zip(g.iter()) {
            row[col] = *value;
        }
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    };

    Some([replace(0) / det, replace(1) / det, replace(2) / det])
}

impl ScanMatcher for PointToLineIcp {
    fn match_scans(
        &self,
        source: &PointCloud2D,
        target: &PointCloud2D,
        initial_guess: &Pose2D,
    ) -> ScanMatchResult {
        if source.is_empty() || target.is_empty() {
            return ScanMatchResult::not_computed();
        }

        let tree = build_kdtree(target);
        let normals = line_normals(target, self.config.max_neighbor_gap);
        let mut transform = *initial_guess;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.config.max_iterations {
            iterations += 1;

            let moved = source.transform(&transform);
            let pairs = find_correspondences(
                &tree,
                target.len(),
                &moved,
                self.config.max_correspondence_distance,
                self.config.outlier_ratio,
            );
            if pairs.len() < self.config.min_correspondences {
                break;
            }

            let Some([dx, dy, dtheta]) =
                self.compute_increment(source, &moved, target, &normals, &pairs, &transform)
            else {
                break;
            };

            transform = Pose2D::new(
                transform.x + dx as f32,
                transform.y + dy as f32,
                transform.theta + dtheta as f32,
            );

            if (dx * dx + dy * dy).sqrt() < self.config.translation_epsilon as f64
                && dtheta.abs() < self.config.rotation_epsilon as f64
            {
                converged = true;
                break;
            }
        }

        finish(
            &tree,
            target.len(),
            source,
            transform,
            &normals,
            iterations,
            converged,
            &self.config,
        )
    }

    fn name(&self) -> &'static str {
        "p2l"
    }
}
