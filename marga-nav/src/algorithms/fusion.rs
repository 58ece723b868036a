//! Pose fusion.
//!
//! Arbitrates between the raw pose estimate and the scan-matched correction.
//! The corrected pose is used only when the match is trustworthy: converged,
//! low residual, well supported, well conditioned, and small. Otherwise the
//! raw pose passes through bit for bit.

use serde::{Deserialize, Serialize};

use crate::algorithms::matching::ScanMatchResult;
use crate::core::math::angle_lerp;
use crate::core::types::Pose2D;

/// `[fusion]` configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Corrections with a residual at or above this are rejected (meters).
    pub max_rmse: f32,

    /// Corrections backed by fewer correspondences are rejected.
    pub min_correspondences: usize,

    /// Matches whose translation constraint is worse conditioned than this
    /// are rejected (corridors, single walls).
    pub max_condition_number: f32,

    /// Largest accepted correction, measured in the robot frame (meters).
    pub max_correction_translation: f32,

    /// Largest accepted heading correction (radians).
    pub max_correction_rotation: f32,

    /// Weight of the corrected pose when accepted (0 = raw, 1 = corrected).
    pub blend: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            max_rmse: 0.05,
            min_correspondences: 40,
            max_condition_number: 10.0,
            max_correction_translation: 0.05,
            max_correction_rotation: 0.05,
            blend: 1.0,
        }
    }
}

/// Why the raw pose was kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackReason {
    /// No previous scan to match against.
    NotComputed,
    NotConverged,
    ResidualTooHigh,
    TooFewCorrespondences,
    Degenerate,
    CorrectionTooLarge,
}

/// Where the trusted pose came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoseSource {
    Raw(FallbackReason),
    ScanMatched,
}

/// Output of [`PoseFusion::fuse`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedPose {
    pub pose: Pose2D,
    pub source: PoseSource,
}

impl FusedPose {
    pub fn is_scan_matched(&self) -> bool {
        self.source == PoseSource::ScanMatched
    }
}

/// Pure fusion policy.
#[derive(Debug, Clone)]
pub struct PoseFusion {
    config: FusionConfig,
}

impl PoseFusion {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Choose the trusted pose for this tick.
    pub fn fuse(&self, raw: &Pose2D, matched: &ScanMatchResult) -> FusedPose {
        match self.check(raw, matched) {
            Ok(corrected) => FusedPose {
                pose: self.blend(raw, &corrected),
                source: PoseSource::ScanMatched,
            },
            Err(reason) => FusedPose {
                pose: *raw,
                source: PoseSource::Raw(reason),
            },
        }
    }

    fn check(&self, raw: &Pose2D, matched: &ScanMatchResult) -> Result<Pose2D, FallbackReason> {
        let rmse = matched.rmse.ok_or(FallbackReason::NotComputed)?;
        if !matched.converged {
            return Err(FallbackReason::NotConverged);
        }
        if !(rmse < self.config.max_rmse) {
            return Err(FallbackReason::ResidualTooHigh);
        }
        if matched.correspondences < self.config.min_correspondences {
            return Err(FallbackReason::TooFewCorrespondences);
        }
        if !(matched.condition_number <= self.config.max_condition_number) {
            return Err(FallbackReason::Degenerate);
        }

        let corrected = matched.transform.compose(raw);
        let delta = raw.inverse().compose(&corrected);
        if !corrected.is_finite()
            || delta.translation_norm() > self.config.max_correction_translation
            || delta.theta.abs() > self.config.max_correction_rotation
        {
            return Err(FallbackReason::CorrectionTooLarge);
        }
        Ok(corrected)
    }

    fn blend(&self, raw: &Pose2D, corrected: &Pose2D) -> Pose2D {
        let w = self.config.blend;
        if w >= 1.0 {
            return *corrected;
        }
        Pose2D::new(
            raw.x + w * (corrected.x - raw.x),
            raw.y + w * (corrected.y - raw.y),
            angle_lerp(raw.theta, corrected.theta, w),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn good_match(transform: Pose2D) -> ScanMatchResult {
        ScanMatchResult {
            transform,
            rmse: Some(0.01),
            correspondences: 150,
            condition_number: 1.5,
            converged: true,
            iterations: 5,
        }
    }

    #[test]
    fn test_not_computed_returns_raw_exactly() {
        let fusion = PoseFusion::new(FusionConfig::default());
        let raw = Pose2D::new(1.234_567, -7.654_321, 0.123_456_7);
        let fused = fusion.fuse(&raw, &ScanMatchResult::not_computed());
        assert_eq!(fused.pose, raw);
        assert_eq!(fused.source, PoseSource::Raw(FallbackReason::NotComputed));
    }

    #[test]
    fn test_few_correspondences_returns_raw_exactly() {
        let fusion = PoseFusion::new(FusionConfig::default());
        let raw = Pose2D::new(2.0, 3.0, 0.4);
        let mut m = good_match(Pose2D::new(0.01, 0.0, 0.0));
        m.correspondences = 5;
        let fused = fusion.fuse(&raw, &m);
        assert_eq!(fused.pose, raw);
        assert_eq!(fused.source, PoseSource::Raw(FallbackReason::TooFewCorrespondences));
    }

    #[test]
    fn test_high_residual_returns_raw() {
        let fusion = PoseFusion::new(FusionConfig::default());
        let raw = Pose2D::new(2.0, 3.0, 0.4);
        let mut m = good_match(Pose2D::new(0.01, 0.0, 0.0));
        m.rmse = Some(0.2);
        assert_eq!(fusion.fuse(&raw, &m).source, PoseSource::Raw(FallbackReason::ResidualTooHigh));
        m.rmse = Some(f32::NAN);
        assert_eq!(fusion.fuse(&raw, &m).pose, raw);
    }

    #[test]
    fn test_unconverged_returns_raw_exactly() {
        let fusion = PoseFusion::new(FusionConfig::default());
        let raw = Pose2D::new(2.0, 3.0, 0.4);
        let mut m = good_match(Pose2D::new(0.01, 0.0, 0.0));
        m.converged = false;
        let fused = fusion.fuse(&raw, &m);
        assert_eq!(fused.pose, raw);
        assert_eq!(fused.source, PoseSource::Raw(FallbackReason::NotConverged));
    }

    #[test]
    fn test_degenerate_match_returns_raw_exactly() {
        // Low residual and plenty of pairs, but sliding along a corridor
        let fusion = PoseFusion::new(FusionConfig::default());
        let raw = Pose2D::new(2.0, 3.0, 0.0);
        let mut m = good_match(Pose2D::new(0.03, 0.0, 0.0));
        m.condition_number = f32::INFINITY;
        let fused = fusion.fuse(&raw, &m);
        assert_eq!(fused.pose, raw);
        assert_eq!(fused.source, PoseSource::Raw(FallbackReason::Degenerate));

        m.condition_number = f32::NAN;
        assert_eq!(fusion.fuse(&raw, &m).source, PoseSource::Raw(FallbackReason::Degenerate));
        m.condition_number = 4.0;
        assert!(fusion.fuse(&raw, &m).is_scan_matched());
    }

    #[test]
    fn test_large_correction_rejected() {
        let fusion = PoseFusion::new(FusionConfig::default());
        let raw = Pose2D::new(2.0, 3.0, 0.4);
        let fused = fusion.fuse(&raw, &good_match(Pose2D::new(0.5, 0.0, 0.0)));
        assert_eq!(fused.source, PoseSource::Raw(FallbackReason::CorrectionTooLarge));
        assert_eq!(fused.pose, raw);
    }

    #[test]
    fn test_accepts_good_correction() {
        let fusion = PoseFusion::new(FusionConfig::default());
        let raw = Pose2D::new(2.0, 3.0, 0.0);
        let fused = fusion.fuse(&raw, &good_match(Pose2D::new(0.02, -0.01, 0.0)));
        assert!(fused.is_scan_matched());
        assert_relative_eq!(fused.pose.x, 2.02, epsilon = 1e-6);
        assert_relative_eq!(fused.pose.y, 2.99, epsilon = 1e-6);
    }

    #[test]
    fn test_rotation_about_far_origin_is_small_in_robot_frame() {
        // A world-frame rotation about a distant origin, expressed as a correction
        // of the robot's own heading, is accepted.
        let fusion = PoseFusion::new(FusionConfig::default());
        let raw = Pose2D::new(5.0, 5.0, 1.0);
        let robot_delta = Pose2D::new(0.01, 0.0, 0.02);
        let world = raw.compose(&robot_delta).compose(&raw.inverse());
        let fused = fusion.fuse(&raw, &good_match(world));
        assert!(fused.is_scan_matched());
        assert_relative_eq!(fused.pose.theta, 1.02, epsilon = 1e-5);
    }

    #[test]
    fn test_blend_half() {
        let fusion = PoseFusion::new(FusionConfig {
            blend: 0.5,
            ..Default::default()
        });
        let raw = Pose2D::new(0.0, 0.0, 0.0);
        let fused = fusion.fuse(&raw, &good_match(Pose2D::new(0.04, 0.0, 0.04)));
        assert_relative_eq!(fused.pose.x, 0.02, epsilon = 1e-6);
        assert_relative_eq!(fused.pose.theta, 0.02, epsilon = 1e-6);
    }

    #[test]
    fn test_fusion_is_deterministic() {
        let fusion = PoseFusion::new(FusionConfig::default());
        let raw = Pose2D::new(1.0, 1.0, 0.3);
        let m = good_match(Pose2D::new(0.01, 0.02, -0.01));
        assert_eq!(fusion.fuse(&raw, &m), fusion.fuse(&raw, &m));
    }
}
