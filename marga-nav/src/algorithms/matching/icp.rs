//! Point-to-Point ICP (Iterative Closest Point) scan matcher.
//!
//! Each iteration pairs every source point with its nearest target point and
//! solves the 2D rigid alignment in closed form (the SVD solution reduces to
//! an atan2 of the cross-covariance terms in 2D).

use serde::{Deserialize, Serialize};

use super::correspondence::{
    Correspondence, PointTree, build_kdtree, find_correspondences, line_normals, rms_distance,
    translation_condition,
};
use super::{ScanMatchResult, ScanMatcher};
use crate::core::types::{PointCloud2D, Pose2D};

/// Configuration shared by both ICP variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IcpConfig {
    /// Hard cap on iterations.
    pub max_iterations: u32,

    /// Convergence threshold for the translation increment (meters).
    pub translation_epsilon: f32,

    /// Convergence threshold for the rotation increment (radians).
    pub rotation_epsilon: f32,

    /// Pairs farther apart than this are not correspondences (meters).
    pub max_correspondence_distance: f32,

    /// Below this many pairs an iteration is not solved and matching stops.
    pub min_correspondences: usize,

    /// Fraction of the worst pairs discarded each iteration (0.0 - 1.0).
    pub outlier_ratio: f32,

    /// Levenberg damping added to the point-to-line normal equations,
    /// scaled by the correspondence count.
    pub damping: f32,

    /// Scan-order neighbours farther apart than this do not define a line (meters).
    pub max_neighbor_gap: f32,

    /// Near-identity results snap to exact identity.
    pub identity_snap: IdentitySnapConfig,
}

impl Default for IcpConfig {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            translation_epsilon: 1e-4,
            rotation_epsilon: 1e-4,
            max_correspondence_distance: 0.3,
            min_correspondences: 10,
            outlier_ratio: 0.1,
            damping: 1e-3,
            max_neighbor_gap: 0.2,
            identity_snap: IdentitySnapConfig::default(),
        }
    }
}

/// Configuration for identity snapping.
///
/// Keeps a stationary robot from drifting on sensor noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySnapConfig {
    /// Maximum RMSE for a result to be considered for snapping (meters).
    pub max_rmse: f32,
    /// Maximum translation to consider "near identity" (meters).
    pub max_translation: f32,
    /// Maximum rotation to consider "near identity" (radians).
    pub max_rotation: f32,
}

impl Default for IdentitySnapConfig {
    fn default() -> Self {
        Self {
            max_rmse: 0.01,
            max_translation: 0.002,
            max_rotation: 0.002,
        }
    }
}

impl IdentitySnapConfig {
    fn applies(&self, transform: &Pose2D, rmse: Option<f32>) -> bool {
        match rmse {
            Some(rmse) => {
                rmse < self.max_rmse
                    && transform.translation_norm() < self.max_translation
                    && transform.theta.abs() < self.max_rotation
            }
            None => false,
        }
    }
}

/// Evaluate the final transform: residual, inlier count, conditioning, and
/// identity snap. `normals` are the target's line normals.
#[allow(clippy::too_many_arguments)]
pub(super) fn finish(
    tree: &PointTree,
    target_len: usize,
    source: &PointCloud2D,
    transform: Pose2D,
    normals: &[Option<(f32, f32)>],
    iterations: u32,
    converged: bool,
    config: &IcpConfig,
) -> ScanMatchResult {
    let evaluate = |t: &Pose2D| {
        let moved = source.transform(t);
        find_correspondences(
            tree,
            target_len,
            &moved,
            config.max_correspondence_distance,
            config.outlier_ratio,
        )
    };

    let pairs = evaluate(&transform);
    let rmse = rms_distance(&pairs);

    if config.identity_snap.applies(&transform, rmse) {
        let identity = Pose2D::identity();
        let pairs = evaluate(&identity);
        return ScanMatchResult {
            transform: identity,
            rmse: rms_distance(&pairs),
            correspondences: pairs.len(),
            condition_number: translation_condition(normals, &pairs),
            converged,
            iterations,
        };
    }

    ScanMatchResult {
        transform,
        rmse,
        correspondences: pairs.len(),
        condition_number: translation_condition(normals, &pairs),
        converged,
        iterations,
    }
}

/// Point-to-Point ICP scan matcher.
#[derive(Debug, Clone)]
pub struct PointToPointIcp {
    config: IcpConfig,
}

impl PointToPointIcp {
    pub fn new(config: IcpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IcpConfig {
        &self.config
    }

    /// Closed-form rigid transform aligning paired source points onto targets.
    fn compute_transform(
        source: &PointCloud2D,
        target: &PointCloud2D,
        pairs: &[Correspondence],
    ) -> Pose2D {
        let n = pairs.len() as f64;
        let (mut msx, mut msy, mut mtx, mut mty) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
        for c in pairs {
            msx += source.xs[c.source_idx] as f64;
            msy += source.ys[c.source_idx] as f64;
            mtx += target.xs[c.target_idx] as f64;
            mty += target.ys[c.target_idx] as f64;
        }
        msx /= n;
        msy /= n;
        mtx /= n;
        mty /= n;

        let (mut sxx, mut sxy, mut syx, mut syy) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
        for c in pairs {
            let sx = source.xs[c.source_idx] as f64 - msx;
            let sy = source.ys[c.source_idx] as f64 - msy;
            let tx = target.xs[c.target_idx] as f64 - mtx;
            let ty = target.ys[c.target_idx] as f64 - mty;
            sxx += sx * tx;
            sxy += sx * ty;
            syx += sy * tx;
            syy += sy * ty;
        }

        let theta = (sxy - syx).atan2(sxx + syy);
        let (sin_t, cos_t) = theta.sin_cos();
        let tx = mtx - (cos_t * msx - sin_t * msy);
        let ty = mty - (sin_t * msx + cos_t * msy);

        Pose2D::new(tx as f32, ty as f32, theta as f32)
    }
}

impl ScanMatcher for PointToPointIcp {
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

            let delta = Self::compute_transform(&moved, target, &pairs);
            transform = delta.compose(&transform);

            if delta.translation_norm() < self.config.translation_epsilon
                && delta.theta.abs() < self.config.rotation_epsilon
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
        "icp"
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::l_shape;
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_alignment_snaps() {
        let cloud = l_shape(20, 0.05);
        let icp = PointToPointIcp::new(IcpConfig::default());
        let result = icp.match_scans(&cloud, &cloud, &Pose2D::identity());

        assert!(result.converged);
        assert_eq!(result.transform, Pose2D::identity());
        assert!(result.condition_number < 1.5);
        assert_relative_eq!(result.rmse.unwrap(), 0.0, epsilon = 1e-6);
        assert!(result.correspondences >= 36);
    }

    #[test]
    fn test_recovers_small_offset() {
        let target = l_shape(20, 0.05);
        let truth = Pose2D::new(0.012, -0.008, 0.01);
        let source = target.transform(&truth.inverse());

        let icp = PointToPointIcp::new(IcpConfig::default());
        let result = icp.match_scans(&source, &target, &Pose2D::identity());

        assert!(result.converged);
        assert_relative_eq!(result.transform.x, truth.x, epsilon = 0.002);
        assert_relative_eq!(result.transform.y, truth.y, epsilon = 0.002);
        assert_relative_eq!(result.transform.theta, truth.theta, epsilon = 0.002);
    }

    #[test]
    fn test_too_few_points_is_not_converged() {
        let target = l_shape(2, 0.1);
        let icp = PointToPointIcp::new(IcpConfig::default());
        let result = icp.match_scans(&target, &target, &Pose2D::identity());

        assert!(!result.converged);
        assert!(result.correspondences < icp.config().min_correspondences);
    }

    #[test]
    fn test_iterations_are_bounded() {
        let target = l_shape(20, 0.05);
        let source = target.transform(&Pose2D::new(0.2, 0.1, 0.3));
        let config = IcpConfig {
            max_iterations: 3,
            ..Default::default()
        };
        let result = PointToPointIcp::new(config).match_scans(&source, &target, &Pose2D::identity());
        assert!(result.iterations <= 3);
    }
}
