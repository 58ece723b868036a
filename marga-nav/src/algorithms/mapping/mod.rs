//! Mapping module.
//!
//! Provides occupancy grid mapping from range scans.
//!
//! # Components
//!
//! - [`OccupancyGrid`]: fixed-extent grid with clamped log-odds cells
//! - [`RayTracer`]: Bresenham ray tracing for free space
//! - [`MapIntegrator`]: integrates scans into the grid
//!
//! # Example
//!
//! ```ignore
//! use marga_nav::algorithms::mapping::{MapIntegrator, OccupancyGrid, OccupancyGridConfig};
//!
//! let mut map = OccupancyGrid::new(OccupancyGridConfig::default(), (0.0, 0.0), 6.0, 6.0);
//! let stats = MapIntegrator::default().integrate_scan(&mut map, &scan, &trusted_pose);
//! ```

mod integrator;
mod occupancy_grid;
mod ray_tracer;

pub use integrator::{IntegrationStats, MapIntegrator};
pub use occupancy_grid::{CellState, OccupancyGrid, OccupancyGridConfig};
pub use ray_tracer::RayTracer;
