//! Range scan and point set types.

use super::pose::{Point2D, Pose2D};
use serde::{Deserialize, Serialize};

/// Raw range scan in polar coordinates, sensor frame.
///
/// Readings are evenly spaced starting at `angle_min`. A reading at or beyond
/// `range_max` means "no return within range".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaserScan {
    /// Bearing of the first reading in radians
    pub angle_min: f32,
    /// Angular spacing between consecutive readings in radians
    pub angle_increment: f32,
    /// Minimum valid range in meters
    pub range_min: f32,
    /// Maximum valid range in meters
    pub range_max: f32,
    /// Range measurements in meters (NaN = invalid)
    pub ranges: Vec<f32>,
}

impl LaserScan {
    /// Create a new laser scan.
    pub fn new(
        angle_min: f32,
        angle_increment: f32,
        range_min: f32,
        range_max: f32,
        ranges: Vec<f32>,
    ) -> Self {
        Self {
            angle_min,
            angle_increment,
            range_min,
            range_max,
            ranges,
        }
    }

    /// Number of readings.
    #[inline]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// True if there are no readings.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Bearing of reading `index`.
    #[inline]
    pub fn angle_at(&self, index: usize) -> f32 {
        self.angle_min + index as f32 * self.angle_increment
    }

    /// True if the reading is a real return inside the sensor's valid band.
    #[inline]
    pub fn is_valid_range(&self, range: f32) -> bool {
        range.is_finite() && range >= self.range_min && range < self.range_max
    }

    /// Iterate over (angle, range) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.ranges
            .iter()
            .enumerate()
            .map(|(i, &r)| (self.angle_at(i), r))
    }

    /// Check that the scan geometry is usable.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.angle_min.is_finite() || !self.angle_increment.is_finite() {
            return Err("non-finite scan angles");
        }
        if !(self.range_max > self.range_min) || self.range_min < 0.0 {
            return Err("invalid range limits");
        }
        if self.ranges.iter().any(|r| *r < 0.0) {
            return Err("negative range reading");
        }
        Ok(())
    }
}

/// Collection of 2D points, Struct-of-Arrays layout.
///
/// Point order is meaningful: consecutive points come from consecutive scan
/// bearings, which the line-based matcher relies on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud2D {
    /// X coordinates in meters
    pub xs: Vec<f32>,
    /// Y coordinates in meters
    pub ys: Vec<f32>,
}

impl PointCloud2D {
    /// Create an empty point cloud.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty point cloud with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            xs: Vec::with_capacity(capacity),
            ys: Vec::with_capacity(capacity),
        }
    }

    /// Create from a vector of points.
    pub fn from_points(points: &[Point2D]) -> Self {
        let mut cloud = Self::with_capacity(points.len());
        for p in points {
            cloud.push(*p);
        }
        cloud
    }

    /// Add a point.
    #[inline]
    pub fn push(&mut self, point: Point2D) {
        self.xs.push(point.x);
        self.ys.push(point.y);
    }

    /// Add a point from coordinates.
    #[inline]
    pub fn push_xy(&mut self, x: f32, y: f32) {
        self.xs.push(x);
        self.ys.push(y);
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    /// True if the cloud has no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Point at index `i`.
    ///
    /// # Panics
    /// If `i` is out of bounds.
    #[inline]
    pub fn point_at(&self, i: usize) -> Point2D {
        Point2D::new(self.xs[i], self.ys[i])
    }

    /// Iterate over points.
    pub fn iter(&self) -> impl Iterator<Item = Point2D> + '_ {
        self.xs
            .iter()
            .zip(self.ys.iter())
            .map(|(&x, &y)| Point2D::new(x, y))
    }

    /// Mean of all points, `None` if empty.
    pub fn centroid(&self) -> Option<Point2D> {
        if self.is_empty() {
            return None;
        }
        let n = self.len() as f32;
        let sx: f32 = self.xs.iter().sum();
        let sy: f32 = self.ys.iter().sum();
        Some(Point2D::new(sx / n, sy / n))
    }

    /// Apply a rigid transform to every point, returning a new cloud.
    pub fn transform(&self, pose: &Pose2D) -> PointCloud2D {
        let (sin_t, cos_t) = pose.theta.sin_cos();
        let mut out = Self::with_capacity(self.len());
        for (&x, &y) in self.xs.iter().zip(self.ys.iter()) {
            out.push_xy(pose.x + x * cos_t - y * sin_t, pose.y + x * sin_t + y * cos_t);
        }
        out
    }
}
