//! Scan matching module.
//!
//! Aligns the current world-frame point set onto the previous one, producing
//! the world-frame correction that maps current points onto previous points.
//!
//! # Algorithms
//!
//! - [`PointToPointIcp`]: Classic ICP with closed-form 2D alignment
//! - [`PointToLineIcp`]: Damped Gauss-Newton on point-to-line residuals
//!
//! Both run in a frame centered on the target centroid, which keeps the
//! rotation well conditioned when the arena origin is far from the robot.
//! [`DynMatcher::match_step`] handles the centering and the first-tick case.

mod correspondence;
mod icp;
mod point_to_line_icp;

pub use correspondence::{
    Correspondence, PointTree, build_kdtree, find_correspondences, line_normals, rms_distance,
    translation_condition,
};
pub use icp::{IcpConfig, IdentitySnapConfig, PointToPointIcp};
pub use point_to_line_icp::PointToLineIcp;

use crate::core::types::{PointCloud2D, Pose2D};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Result of a scan matching operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanMatchResult {
    /// Estimated transform mapping source points onto target points.
    pub transform: Pose2D,

    /// RMS of nearest-point distances under the final transform.
    ///
    /// `None` when matching was not attempted (no previous scan).
    pub rmse: Option<f32>,

    /// Inlier correspondences under the final transform.
    pub correspondences: usize,

    /// Eigenvalue ratio of the translation constraint (see
    /// [`translation_condition`]). Infinite when a direction is unobservable.
    pub condition_number: f32,

    /// Whether the increment fell below the convergence thresholds.
    pub converged: bool,

    /// Number of iterations performed.
    pub iterations: u32,
}

impl ScanMatchResult {
    /// Identity result for the case where there is nothing to match against.
    pub fn not_computed() -> Self {
        Self {
            transform: Pose2D::identity(),
            rmse: None,
            correspondences: 0,
            condition_number: f32::INFINITY,
            converged: false,
            iterations: 0,
        }
    }

    /// True if a residual was computed.
    pub fn is_computed(&self) -> bool {
        self.rmse.is_some()
    }
}

/// Trait for scan matching algorithms.
pub trait ScanMatcher {
    /// Align `source` onto `target`, starting from `initial_guess`.
    fn match_scans(
        &self,
        source: &PointCloud2D,
        target: &PointCloud2D,
        initial_guess: &Pose2D,
    ) -> ScanMatchResult;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Available scan matching algorithm types.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherType {
    /// Point-to-Point ICP.
    ///
    /// Fast, but biased along walls parallel to the direction of motion.
    Icp,

    /// Point-to-Line ICP.
    ///
    /// Slides freely along walls, which suits corridor-heavy mazes.
    #[default]
    P2l,
}

impl MatcherType {
    pub fn description(&self) -> &'static str {
        match self {
            MatcherType::Icp => "Point-to-Point ICP",
            MatcherType::P2l => "Point-to-Line ICP",
        }
    }
}

impl std::fmt::Display for MatcherType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// `[matching]` configuration section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Which matcher to run (default: p2l)
    pub algorithm: MatcherType,
    /// Shared ICP parameters
    pub icp: IcpConfig,
}

/// Runtime-selected scan matcher.
#[derive(Debug, Clone)]
pub enum DynMatcher {
    Icp(PointToPointIcp),
    P2l(PointToLineIcp),
}

impl DynMatcher {
    pub fn new(config: &MatchingConfig) -> Self {
        match config.algorithm {
            MatcherType::Icp => DynMatcher::Icp(PointToPointIcp::new(config.icp.clone())),
            MatcherType::P2l => DynMatcher::P2l(PointToLineIcp::new(config.icp.clone())),
        }
    }

    pub fn matcher_type(&self) -> MatcherType {
        match self {
            DynMatcher::Icp(_) => MatcherType::Icp,
            DynMatcher::P2l(_) => MatcherType::P2l,
        }
    }

    /// One tick of scan-to-scan matching.
    ///
    /// Returns [`ScanMatchResult::not_computed`] when `previous` is absent or
    /// either cloud is empty. Otherwise the match runs in a frame centered on
    /// the previous cloud's centroid and the transform is mapped back to world.
    pub fn match_step(
        &self,
        previous: Option<&PointCloud2D>,
        current: &PointCloud2D,
    ) -> ScanMatchResult {
        let Some(previous) = previous else {
            return ScanMatchResult::not_computed();
        };
        let Some(pivot) = previous.centroid() else {
            return ScanMatchResult::not_computed();
        };
        if current.is_empty() {
            return ScanMatchResult::not_computed();
        }

        let to_local = Pose2D::translation(-pivot.x, -pivot.y);
        let to_world = Pose2D::translation(pivot.x, pivot.y);

        let source = current.transform(&to_local);
        let target = previous.transform(&to_local);

        let mut result = self.match_scans(&source, &target, &Pose2D::identity());
        result.transform = to_world.compose(&result.transform).compose(&to_local);
        result
    }
}

impl ScanMatcher for DynMatcher {
    fn match_scans(
        &self,
        source: &PointCloud2D,
        target: &PointCloud2D,
        initial_guess: &Pose2D,
    ) -> ScanMatchResult {
        match self {
            DynMatcher::Icp(m) => m.match_scans(source, target, initial_guess),
            DynMatcher::P2l(m) => m.match_scans(source, target, initial_guess),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            DynMatcher::Icp(m) => m.name(),
            DynMatcher::P2l(m) => m.name(),
        }
    }
}
