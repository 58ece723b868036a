//! Navigation setup for one run.
//!
//! Builds the mode-dependent base c-space, plans the initial path from the
//! entrance to the goal, and derives the start pose (entrance center, facing
//! the second waypoint).

use crate::algorithms::mapping::{OccupancyGrid, OccupancyGridConfig};
use crate::algorithms::planning::{AStarPlanner, CSpace};
use crate::config::Config;
use crate::core::types::Pose2D;
use crate::error::Result;
use crate::navigation::{NavigationMode, Path};
use crate::sim::Arena;

use super::run::Goal;

/// Everything a run needs before its first tick.
#[derive(Debug, Clone)]
pub struct NavigationInit {
    /// Obstacles known before any scan; mapped obstacles are stamped on top.
    pub base_cspace: CSpace,
    pub path: Path,
    pub start_pose: Pose2D,
    pub goal: Goal,
}

/// Base c-space over the arena extent.
///
/// Known mode stamps the wall geometry; Unknown mode starts empty, so
/// unexplored space counts as free.
pub fn base_cspace(arena: &Arena, config: &Config) -> CSpace {
    let planning = &config.planning;
    let mut cspace = CSpace::new(
        (0.0, 0.0),
        arena.size(),
        arena.size(),
        planning.sample_step,
        planning.inflation_radius(),
    );
    match config.navigation.mode {
        NavigationMode::Known => cspace.add_obstacles(arena.obstacle_points(planning.sample_step)),
        NavigationMode::Unknown => {}
    }
    cspace
}

/// Plan the initial path and derive the start pose.
pub fn initialize(arena: &Arena, config: &Config) -> Result<NavigationInit> {
    let base_cspace = base_cspace(arena, config);
    let start = arena.cell_center(arena.entrance());
    let goal = Goal {
        cell: arena.goal_cell(),
        center: arena.cell_center(arena.goal_cell()),
        tolerance: config.navigation.arrival_tolerance,
    };

    let planner = AStarPlanner::new(config.planning.clone());
    let path = planner.plan(&base_cspace, start, goal.center)?;

    let heading = match path.waypoints.get(1) {
        Some(next) => (next.y - start.y).atan2(next.x - start.x),
        None => 0.0,
    };

    log::debug!(
        "initial path: {} waypoints, {:.2}m, {} mode, {} blocked cells",
        path.len(),
        path.total_length,
        config.navigation.mode,
        base_cspace.blocked_count()
    );

    Ok(NavigationInit {
        base_cspace,
        path,
        start_pose: Pose2D::new(start.x, start.y, heading),
        goal,
    })
}

/// Empty occupancy grid covering the arena extent.
pub fn map_for_arena(config: &OccupancyGridConfig, arena: &Arena) -> OccupancyGrid {
    OccupancyGrid::new(config.clone(), (0.0, 0.0), arena.size(), arena.size())
}
