//! Path planning module.
//!
//! - [`CSpace`]: blocked/free grid with obstacles inflated by the robot footprint
//! - [`AStarPlanner`]: deterministic A* over a [`CSpace`]

mod astar;
mod cspace;

pub use astar::{AStarConfig, AStarPlanner, PlanningError};
pub use cspace::CSpace;
