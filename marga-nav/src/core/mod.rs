//! Core foundation layer.
//!
//! This is the bottom layer of the navigation stack with no internal dependencies.
//! All other layers depend on core.
//!
//! # Contents
//!
//! - [`types`]: Core data types (poses, scans, point sets, setpoints)
//! - [`math`]: Mathematical primitives (angle normalization, interpolation)

pub mod math;
pub mod types;
