//! Navigation: paths, path following, and replanning decisions.
//!
//! # Key Types
//!
//! - [`Path`]: planned waypoints from the robot to the goal (output of A*)
//! - [`PurePursuitController`]: turns the trusted pose and the path into a [`Setpoint`]
//! - [`ReplanPolicy`]: decides each tick whether the held path must be replaced
//! - [`NavigationMode`]: which obstacles the planner is allowed to know about
//!
//! [`Setpoint`]: crate::core::types::Setpoint

mod controller;
mod path;
mod replan;

pub use controller::{ControllerConfig, PurePursuitController};
pub use path::{Path, PathProjection, Waypoint};
pub use replan::{ReplanPolicy, ReplanReason};

use serde::{Deserialize, Serialize};

/// Obstacle knowledge available to the planner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum NavigationMode {
    /// Plan over the arena walls plus mapped obstacles.
    Known,
    /// Plan over mapped obstacles only; unknown space counts as free.
    #[default]
    Unknown,
}

impl NavigationMode {
    pub fn description(&self) -> &'static str {
        match self {
            NavigationMode::Known => "Walls known up front, map refines them",
            NavigationMode::Unknown => "Walls discovered by the lidar while driving",
        }
    }
}

impl std::fmt::Display for NavigationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NavigationMode::Known => write!(f, "known"),
            NavigationMode::Unknown => write!(f, "unknown"),
        }
    }
}
