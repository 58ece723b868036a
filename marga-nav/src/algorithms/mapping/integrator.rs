//! Scan integration into the occupancy grid.
//!
//! For each reading of a scan taken at the trusted pose:
//! - a valid return traces free cells and marks the hit cell occupied
//! - a reading at or beyond `range_max` traces free cells only
//! - NaN readings are skipped
//!
//! Rays whose origin lies outside the grid are discarded.

use super::{OccupancyGrid, RayTracer};
use crate::core::types::{LaserScan, Pose2D};

/// Counts from one integration, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntegrationStats {
    /// Rays traced into the grid.
    pub rays: usize,
    /// Rays that marked an occupied endpoint inside the grid.
    pub hits: usize,
    /// Rays whose endpoint fell outside the grid.
    pub clipped: usize,
    /// Rays skipped entirely (invalid reading or origin outside the grid).
    pub discarded: usize,
}

/// Integrates range scans into an occupancy grid.
#[derive(Debug, Clone, Default)]
pub struct MapIntegrator {
    ray_tracer: RayTracer,
}

impl MapIntegrator {
    pub fn new(ray_tracer: RayTracer) -> Self {
        Self { ray_tracer }
    }

    /// Integrate `scan`, taken from `pose`, into `grid`. Never fails.
    pub fn integrate_scan(
        &self,
        grid: &mut OccupancyGrid,
        scan: &LaserScan,
        pose: &Pose2D,
    ) -> IntegrationStats {
        let mut stats = IntegrationStats::default();

        if grid.world_to_cell(pose.x, pose.y).is_none() || !pose.is_finite() {
            stats.discarded = scan.len();
            return stats;
        }

        let origin = (pose.x, pose.y);
        for (angle, range) in scan.iter() {
            if range.is_nan() || range < scan.range_min {
                stats.discarded += 1;
                continue;
            }

            let hit = range < scan.range_max;
            let length = range.min(scan.range_max);
            let (sin_a, cos_a) = (pose.theta + angle).sin_cos();
            let end = (origin.0 + length * cos_a, origin.1 + length * sin_a);

            self.ray_tracer.trace_ray(grid, origin, end, hit);
            stats.rays += 1;

            if grid.world_to_cell(end.0, end.1).is_none() {
                stats.clipped += 1;
            } else if hit {
                stats.hits += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::mapping::{CellState, OccupancyGridConfig};
    use std::f32::consts::PI;

    fn grid() -> OccupancyGrid {
        OccupancyGrid::new(OccupancyGridConfig::default(), (0.0, 0.0), 4.0, 4.0)
    }

    #[test]
    fn test_repeated_return_marks_wall() {
        let mut g = grid();
        let scan = LaserScan::new(0.0, 0.1, 0.1, 3.0, vec![1.0]);
        let pose = Pose2D::new(1.02, 2.02, 0.0);
        let integrator = MapIntegrator::default();

        let stats = integrator.integrate_scan(&mut g, &scan, &pose);
        assert_eq!(stats.hits, 1);
        assert_eq!(g.state_at_world(2.02, 2.02), CellState::Unknown);

        integrator.integrate_scan(&mut g, &scan, &pose);
        assert_eq!(g.state_at_world(2.02, 2.02), CellState::Occupied);
        assert_eq!(g.occupied_count(), 1);
    }

    #[test]
    fn test_no_return_marks_free_only() {
        let mut g = grid();
        let scan = LaserScan::new(0.0, 0.1, 0.1, 1.0, vec![1.0, f32::INFINITY]);
        let integrator = MapIntegrator::default();
        for _ in 0..3 {
            integrator.integrate_scan(&mut g, &scan, &Pose2D::new(1.02, 2.02, 0.0));
        }
        assert_eq!(g.occupied_count(), 0);
        assert_eq!(g.state_at_world(1.5, 2.02), CellState::Free);
    }

    #[test]
    fn test_origin_outside_grid_is_discarded() {
        let mut g = grid();
        let scan = LaserScan::new(0.0, 0.1, 0.1, 3.0, vec![1.0, 1.0]);
        let stats = MapIntegrator::default().integrate_scan(&mut g, &scan, &Pose2D::new(-1.0, 2.0, 0.0));
        assert_eq!(stats.discarded, 2);
        assert_eq!(stats.rays, 0);
        assert_eq!(g.count_cells().0, g.width() * g.height());
    }

    #[test]
    fn test_endpoint_outside_grid_is_clipped() {
        let mut g = grid();
        let scan = LaserScan::new(PI, 0.1, 0.1, 5.0, vec![2.0]);
        let stats = MapIntegrator::default().integrate_scan(&mut g, &scan, &Pose2D::new(0.5, 2.0, 0.0));
        assert_eq!(stats.clipped, 1);
        assert_eq!(g.occupied_count(), 0);
    }
}
