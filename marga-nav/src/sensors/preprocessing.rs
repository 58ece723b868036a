//! Scan preprocessing.
//!
//! ```text
//! LaserScan → range filter → angular downsampling → pose transform → PointCloud2D
//! ```
//!
//! The output keeps scan order, so neighbouring points in the cloud are
//! neighbouring bearings. The point count is capped by `max_points`, which
//! also bounds the k-d tree the matcher builds over the cloud.

use crate::core::types::{LaserScan, PointCloud2D, Pose2D};
use serde::{Deserialize, Serialize};

/// Configuration for [`ScanPreprocessor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessorConfig {
    /// Readings closer than this are dropped (meters).
    pub min_range: f32,

    /// Readings at or beyond this are dropped (meters).
    ///
    /// The effective limit is the tighter of this and the scan's own `range_max`.
    pub max_range: f32,

    /// Upper bound on the number of points kept per scan.
    pub max_points: usize,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            min_range: 0.12,
            max_range: 4.0,
            max_points: 180,
        }
    }
}

/// Converts a raw scan plus a pose hypothesis into a world-frame point set.
#[derive(Debug, Clone)]
pub struct ScanPreprocessor {
    config: PreprocessorConfig,
}

impl ScanPreprocessor {
    pub fn new(config: PreprocessorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessorConfig {
        &self.config
    }

    /// Range-filter, downsample, and project the scan under `pose`.
    pub fn process(&self, scan: &LaserScan, pose: &Pose2D) -> PointCloud2D {
        let min_range = self.config.min_range.max(scan.range_min);
        let max_range = self.config.max_range.min(scan.range_max);

        let valid: Vec<(f32, f32)> = scan
            .iter()
            .filter(|&(_, r)| r.is_finite() && r >= min_range && r < max_range)
            .collect();

        let stride = Self::calculate_skip(valid.len(), self.config.max_points);

        let (sin_t, cos_t) = pose.theta.sin_cos();
        let mut cloud = PointCloud2D::with_capacity(valid.len() / stride + 1);
        for &(angle, range) in valid.iter().step_by(stride).take(self.config.max_points) {
            let (sin_a, cos_a) = angle.sin_cos();
            let lx = range * cos_a;
            let ly = range * sin_a;
            cloud.push_xy(pose.x + lx * cos_t - ly * sin_t, pose.y + lx * sin_t + ly * cos_t);
        }
        cloud
    }

    /// Stride that brings `input_count` down to at most `max_points`.
    pub fn calculate_skip(input_count: usize, max_points: usize) -> usize {
        if max_points == 0 || input_count <= max_points {
            1
        } else {
            input_count.div_ceil(max_points)
        }
    }
}
