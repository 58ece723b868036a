//! Core navigation algorithms layer.
//!
//! # Contents
//!
//! - [`matching`]: Scan matching (point-to-point and point-to-line ICP)
//! - [`fusion`]: Raw/scan-matched pose arbitration
//! - [`mapping`]: Occupancy grid mapping and ray tracing
//! - [`planning`]: Configuration space and A* search

pub mod fusion;
pub mod mapping;
pub mod matching;
pub mod planning;
