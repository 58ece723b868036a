//! Core data types for navigation.
//!
//! - [`Point2D`]: 2D point in meters
//! - [`Pose2D`]: Robot pose (x, y, theta) in meters and radians
//! - [`LaserScan`]: Raw range scan in polar coordinates
//! - [`PointCloud2D`]: Collection of 2D points in Cartesian coordinates
//! - [`Setpoint`]: Commanded body rates for one tick

mod pose;
mod scan;
mod setpoint;

pub use pose::{Point2D, Pose2D};
pub use scan::{LaserScan, PointCloud2D};
pub use setpoint::Setpoint;
