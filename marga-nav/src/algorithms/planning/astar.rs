//! A* path planning over a configuration-space grid.
//!
//! - **8-connected grid** with octile heuristic, diagonals never cut corners
//! - **Deterministic ordering**: lower f, then lower h, then lower cell index
//! - **Nearest free start**: a start swallowed by inflation snaps to the
//!   closest free cell (BFS)
//! - **Exact goal**: the last waypoint is the requested goal point, unless
//!   the goal cell is blocked; then the closest free cell within
//!   `goal_snap_distance` stands in for it. A goal with no such cell, or one
//!   walled off from the start, has no route.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use thiserror::Error;

use super::CSpace;
use crate::core::types::Point2D;
use crate::navigation::{Path, Waypoint};

/// `[planning]` configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AStarConfig {
    /// C-space cell size (meters).
    pub sample_step: f32,

    /// Robot radius for obstacle inflation (meters).
    pub robot_radius: f32,

    /// Extra clearance beyond the robot radius (meters).
    ///
    /// Total inflation = robot_radius + safety_margin.
    pub safety_margin: f32,

    /// Allow diagonal movement (8-connected vs 4-connected grid).
    pub allow_diagonal: bool,

    /// Maximum node expansions before giving up.
    pub max_iterations: usize,

    /// How far (in cells) to look for a free cell when the start is blocked.
    pub start_search_radius: usize,

    /// A blocked goal moves to the closest free cell within this distance
    /// (meters). Keep it below the arrival tolerance.
    pub goal_snap_distance: f32,

    /// Drop intermediate waypoints on straight runs.
    pub simplify: bool,

    /// Replan when the pose is farther than this from the held path (meters).
    pub deviation_tolerance: f32,
}

impl Default for AStarConfig {
    fn default() -> Self {
        Self {
            sample_step: 0.05,
            robot_radius: 0.15,
            safety_margin: 0.05,
            allow_diagonal: true,
            max_iterations: 200_000,
            start_search_radius: 20,
            goal_snap_distance: 0.25,
            simplify: true,
            deviation_tolerance: 0.4,
        }
    }
}

impl AStarConfig {
    /// Total obstacle inflation radius (meters).
    pub fn inflation_radius(&self) -> f32 {
        self.robot_radius + self.safety_margin
    }
}

/// Error types for path planning.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanningError {
    #[error("start ({0:.2}, {1:.2}) is outside the planning grid")]
    StartOutOfBounds(f32, f32),

    #[error("goal ({0:.2}, {1:.2}) is outside the planning grid")]
    GoalOutOfBounds(f32, f32),

    #[error("no free cell near the start")]
    StartBlocked,

    #[error("no route to goal")]
    NoRoute,

    #[error("search exceeded {0} iterations")]
    MaxIterationsExceeded(usize),
}

impl PlanningError {
    /// True for failures that reflect current map knowledge rather than a
    /// broken setup. These are recovered by holding or dropping the path.
    pub fn is_no_route(&self) -> bool {
        matches!(
            self,
            PlanningError::NoRoute | PlanningError::StartBlocked | PlanningError::MaxIterationsExceeded(_)
        )
    }
}

/// A* path planner.
#[derive(Debug, Clone)]
pub struct AStarPlanner {
    config: AStarConfig,
}

const CARDINAL: [(i32, i32); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];
const DIAGONAL: [(i32, i32); 4] = [(1, 1), (-1, 1), (-1, -1), (1, -1)];

impl AStarPlanner {
    pub fn new(config: AStarConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AStarConfig {
        &self.config
    }

    /// Plan a path from `start` to `goal` (world coordinates).
    ///
    /// The returned path is never empty. It ends exactly at `goal` when the
    /// goal cell is free, otherwise at the center of the snapped goal cell.
    pub fn plan(&self, cspace: &CSpace, start: Point2D, goal: Point2D) -> Result<Path, PlanningError> {
        let start_cell = cspace
            .world_to_cell(start.x, start.y)
            .ok_or(PlanningError::StartOutOfBounds(start.x, start.y))?;
        let requested_goal = cspace
            .world_to_cell(goal.x, goal.y)
            .ok_or(PlanningError::GoalOutOfBounds(goal.x, goal.y))?;

        let goal_cell = if cspace.is_free(requested_goal) {
            requested_goal
        } else {
            self.snap_goal(cspace, requested_goal)
                .ok_or(PlanningError::NoRoute)?
        };

        let start_cell = if cspace.is_free(start_cell) {
            start_cell
        } else {
            self.find_nearest_free(cspace, start_cell)
                .ok_or(PlanningError::StartBlocked)?
        };

        let mut cells = self.search(cspace, start_cell, goal_cell)?;
        if self.config.simplify {
            cells = simplify_collinear(cells);
        }

        let mut waypoints: Vec<Waypoint> = cells
            .iter()
            .map(|&c| {
                let (x, y) = cspace.cell_to_world(c);
                Waypoint::new(x, y)
            })
            .collect();
        if let Some(last) = waypoints.last_mut().filter(|_| goal_cell == requested_goal) {
            *last = Waypoint::new(goal.x, goal.y);
        }

        Ok(Path::new(waypoints))
    }

    fn search(
        &self,
        cspace: &CSpace,
        start: (usize, usize),
        goal: (usize, usize),
    ) -> Result<Vec<(usize, usize)>, PlanningError> {
        let n = cspace.width() * cspace.height();
        let start_idx = cspace.index(start);
        let goal_idx = cspace.index(goal);

        let mut g_score = vec![f32::INFINITY; n];
        let mut came_from = vec![usize::MAX; n];
        let mut closed = vec![false; n];
        let mut open_set = BinaryHeap::new();

        g_score[start_idx] = 0.0;
        let h = octile(start, goal);
        open_set.push(AStarNode {
            f: h,
            h,
            index: start_idx,
        });

        let mut iterations = 0;
        while let Some(current) = open_set.pop() {
            if closed[current.index] {
                continue;
            }
            closed[current.index] = true;

            if current.index == goal_idx {
                return Ok(reconstruct(cspace, &came_from, start_idx, goal_idx));
            }

            iterations += 1;
            if iterations > self.config.max_iterations {
                return Err(PlanningError::MaxIterationsExceeded(self.config.max_iterations));
            }

            let cell = cspace.cell_of(current.index);
            let current_g = g_score[current.index];
            for (neighbor, cost) in self.neighbors(cspace, cell) {
                let nidx = cspace.index(neighbor);
                if closed[nidx] {
                    continue;
                }
                let tentative = current_g + cost;
                if tentative < g_score[nidx] {
                    g_score[nidx] = tentative;
                    came_from[nidx] = current.index;
                    let h = octile(neighbor, goal);
                    open_set.push(AStarNode {
                        f: tentative + h,
                        h,
                        index: nidx,
                    });
                }
            }
        }

        Err(PlanningError::NoRoute)
    }

    /// Free neighbours with move costs, in a fixed order.
    fn neighbors(&self, cspace: &CSpace, cell: (usize, usize)) -> Vec<((usize, usize), f32)> {
        let (cx, cy) = (cell.0 as i32, cell.1 as i32);
        let free = |x: i32, y: i32| x >= 0 && y >= 0 && cspace.is_free((x as usize, y as usize));

        let mut result = Vec::with_capacity(8);
        for (dx, dy) in CARDINAL {
            if free(cx + dx, cy + dy) {
                result.push((((cx + dx) as usize, (cy + dy) as usize), 1.0));
            }
        }
        if self.config.allow_diagonal {
            for (dx, dy) in DIAGONAL {
                // Both side cells must be free, so the diagonal never clips a corner
                if free(cx + dx, cy + dy) && free(cx + dx, cy) && free(cx, cy + dy) {
                    result.push((
                        ((cx + dx) as usize, (cy + dy) as usize),
                        std::f32::consts::SQRT_2,
                    ));
                }
            }
        }
        result
    }

    /// Closest free cell to a blocked goal, within `goal_snap_distance`.
    /// Ties go to the lower cell index.
    fn snap_goal(&self, cspace: &CSpace, goal: (usize, usize)) -> Option<(usize, usize)> {
        let radius = self.config.goal_snap_distance / cspace.step() + 1e-3;
        let reach = radius.floor() as i32;
        let max_sq = radius * radius;
        let (gx, gy) = (goal.0 as i32, goal.1 as i32);

        let mut best: Option<(i32, usize, (usize, usize))> = None;
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let dist_sq = dx * dx + dy * dy;
                let (x, y) = (gx + dx, gy + dy);
                if (dist_sq as f32) > max_sq
                    || x < 0
                    || y < 0
                    || x as usize >= cspace.width()
                    || y as usize >= cspace.height()
                {
                    continue;
                }
                let cell = (x as usize, y as usize);
                if !cspace.is_free(cell) {
                    continue;
                }
                let key = (dist_sq, cspace.index(cell), cell);
                if best.is_none_or(|b| (key.0, key.1) < (b.0, b.1)) {
                    best = Some(key);
                }
            }
        }
        best.map(|(_, _, cell)| cell)
    }

    /// Closest free cell by BFS over cardinal moves, within the search radius.
    fn find_nearest_free(&self, cspace: &CSpace, start: (usize, usize)) -> Option<(usize, usize)> {
        let mut visited = vec![false; cspace.width() * cspace.height()];
        let mut queue = VecDeque::new();
        visited[cspace.index(start)] = true;
        queue.push_back((start, 0usize));

        while let Some((cell, dist)) = queue.pop_front() {
            if cspace.is_free(cell) {
                return Some(cell);
            }
            if dist >= self.config.start_search_radius {
                continue;
            }
            let (cx, cy) = (cell.0 as i32, cell.1 as i32);
            for (dx, dy) in CARDINAL {
                let (nx, ny) = (cx + dx, cy + dy);
                if nx < 0 || ny < 0 || nx as usize >= cspace.width() || ny as usize >= cspace.height() {
                    continue;
                }
                let next = (nx as usize, ny as usize);
                let idx = cspace.index(next);
                if !visited[idx] {
                    visited[idx] = true;
                    queue.push_back((next, dist + 1));
                }
            }
        }
        None
    }
}

/// Octile distance in cell units.
#[inline]
fn octile(a: (usize, usize), b: (usize, usize)) -> f32 {
    let dx = (a.0 as f32 - b.0 as f32).abs();
    let dy = (a.1 as f32 - b.1 as f32).abs();
    dx.max(dy) + (std::f32::consts::SQRT_2 - 1.0) * dx.min(dy)
}

fn reconstruct(
    cspace: &CSpace,
    came_from: &[usize],
    start_idx: usize,
    goal_idx: usize,
) -> Vec<(usize, usize)> {
    let mut cells = vec![cspace.cell_of(goal_idx)];
    let mut current = goal_idx;
    while current != start_idx {
        current = came_from[current];
        if current == usize::MAX {
            break;
        }
        cells.push(cspace.cell_of(current));
    }
    cells.reverse();
    cells
}

/// Keep only the cells where the step direction changes, plus both ends.
fn simplify_collinear(cells: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    if cells.len() < 3 {
        return cells;
    }
    let dir = |a: (usize, usize), b: (usize, usize)| {
        (b.0 as i64 - a.0 as i64, b.1 as i64 - a.1 as i64)
    };

    let mut out = Vec::with_capacity(cells.len());
    out.push(cells[0]);
    for w in cells.windows(3) {
        if dir(w[0], w[1]) != dir(w[1], w[2]) {
            out.push(w[1]);
        }
    }
    out.push(cells[cells.len() - 1]);
    out
}

/// Node in the A* open set.
#[derive(Debug, Clone, Copy)]
struct AStarNode {
    f: f32,
    h: f32,
    index: usize,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed on every key: BinaryHeap pops the greatest
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.h.total_cmp(&self.h))
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for AStarNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AStarNode {}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_space() -> CSpace {
        CSpace::new((0.0, 0.0), 5.0, 5.0, 0.05, 0.2)
    }

    fn planner() -> AStarPlanner {
        AStarPlanner::new(AStarConfig::default())
    }

    /// Vertical wall at x = 2.5 from y = 0 up to `top`.
    fn wall(cs: &mut CSpace, top: f32) {
        let mut y = 0.0;
        while y <= top {
            cs.add_obstacle(2.5, y);
            y += 0.025;
        }
    }

    #[test]
    fn test_open_space_path_ends_at_goal() {
        let cs = open_space();
        let goal = Point2D::new(4.5, 4.5);
        let path = planner().plan(&cs, Point2D::new(0.5, 0.5), goal).unwrap();

        assert!(!path.is_empty());
        assert_eq!(*path.last().unwrap(), Waypoint::new(goal.x, goal.y));
        let first = path.first().unwrap();
        assert!(first.distance_to(&Waypoint::new(0.5, 0.5)) <= 0.05);
        assert!(cs.path_is_clear(&path, 0));
        // Straight diagonal collapses to its endpoints
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_detours_around_wall() {
        let mut cs = open_space();
        wall(&mut cs, 4.0);
        let path = planner()
            .plan(&cs, Point2D::new(1.0, 1.0), Point2D::new(4.0, 1.0))
            .unwrap();

        assert!(cs.path_is_clear(&path, 0));
        assert!(path.waypoints.iter().any(|w| w.y > 4.0), "path must go over the wall");
        assert!(path.total_length > 6.0);
    }

    #[test]
    fn test_enclosed_goal_has_no_route() {
        let mut cs = open_space();
        // Ring of obstacles around (4, 4)
        for i in 0..64 {
            let a = i as f32 * std::f32::consts::TAU / 64.0;
            cs.add_obstacle(4.0 + 0.6 * a.cos(), 4.0 + 0.6 * a.sin());
        }
        let result = planner().plan(&cs, Point2D::new(0.5, 0.5), Point2D::new(4.0, 4.0));
        assert_eq!(result, Err(PlanningError::NoRoute));
        assert!(result.unwrap_err().is_no_route());
    }

    #[test]
    fn test_blocked_goal_snaps_to_nearby_free_cell() {
        let mut cs = open_space();
        // A single stray obstacle on the goal
        cs.add_obstacle(4.0, 4.0);
        let goal = Point2D::new(4.0, 4.0);
        let path = planner().plan(&cs, Point2D::new(0.5, 0.5), goal).unwrap();

        let last = path.last().unwrap();
        assert!(cs.is_free_world(last.x, last.y));
        assert!(*last != Waypoint::new(goal.x, goal.y));
        assert!(last.distance_to(&Waypoint::new(goal.x, goal.y)) < 0.3);
        assert!(cs.path_is_clear(&path, 0));
    }

    #[test]
    fn test_blocked_goal_without_snap_has_no_route() {
        let mut cs = open_space();
        cs.add_obstacle(4.0, 4.0);
        let p = AStarPlanner::new(AStarConfig {
            goal_snap_distance: 0.0,
            ..Default::default()
        });
        let result = p.plan(&cs, Point2D::new(0.5, 0.5), Point2D::new(4.0, 4.0));
        assert_eq!(result, Err(PlanningError::NoRoute));
    }

    #[test]
    fn test_goal_buried_in_obstacles_has_no_route() {
        let mut cs = open_space();
        let mut y = 3.7;
        while y <= 4.3 {
            let mut x = 3.7;
            while x <= 4.3 {
                cs.add_obstacle(x, y);
                x += 0.05;
            }
            y += 0.05;
        }
        let result = planner().plan(&cs, Point2D::new(0.5, 0.5), Point2D::new(4.0, 4.0));
        assert_eq!(result, Err(PlanningError::NoRoute));
    }

    #[test]
    fn test_blocked_start_snaps_to_free_cell() {
        let mut cs = open_space();
        cs.add_obstacle(1.0, 1.0);
        let path = planner()
            .plan(&cs, Point2D::new(1.0, 1.0), Point2D::new(4.0, 4.0))
            .unwrap();
        let first = path.first().unwrap();
        assert!(cs.is_free_world(first.x, first.y));
        assert!(first.distance_to(&Waypoint::new(1.0, 1.0)) <= 0.3);
    }

    #[test]
    fn test_out_of_bounds() {
        let cs = open_space();
        assert!(matches!(
            planner().plan(&cs, Point2D::new(-1.0, 0.5), Point2D::new(4.0, 4.0)),
            Err(PlanningError::StartOutOfBounds(..))
        ));
        assert!(matches!(
            planner().plan(&cs, Point2D::new(0.5, 0.5), Point2D::new(6.0, 4.0)),
            Err(PlanningError::GoalOutOfBounds(..))
        ));
    }

    #[test]
    fn test_start_equals_goal() {
        let cs = open_space();
        let path = planner()
            .plan(&cs, Point2D::new(2.0, 2.0), Point2D::new(2.01, 2.01))
            .unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(*path.last().unwrap(), Waypoint::new(2.01, 2.01));
    }

    #[test]
    fn test_deterministic() {
        let mut cs = open_space();
        wall(&mut cs, 3.0);
        let p = planner();
        let a = p.plan(&cs, Point2D::new(0.7, 2.0), Point2D::new(4.3, 2.2)).unwrap();
        let b = p.plan(&cs, Point2D::new(0.7, 2.0), Point2D::new(4.3, 2.2)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_max_iterations() {
        let mut cs = open_space();
        wall(&mut cs, 4.0);
        let p = AStarPlanner::new(AStarConfig {
            max_iterations: 10,
            ..Default::default()
        });
        let result = p.plan(&cs, Point2D::new(1.0, 1.0), Point2D::new(4.0, 1.0));
        assert_eq!(result, Err(PlanningError::MaxIterationsExceeded(10)));
    }

    #[test]
    fn test_no_corner_cutting() {
        // Two blocked cells touching diagonally with zero inflation
        let mut cs = CSpace::new((0.0, 0.0), 0.15, 0.15, 0.05, 0.0);
        cs.add_obstacle(0.075, 0.025); // cell (1, 0)
        cs.add_obstacle(0.025, 0.075); // cell (0, 1)
        let result = planner().plan(&cs, Point2D::new(0.025, 0.025), Point2D::new(0.125, 0.125));
        assert_eq!(result, Err(PlanningError::NoRoute));
    }

    #[test]
    fn test_simplify_collinear() {
        let cells = vec![(0, 0), (1, 0), (2, 0), (3, 1), (4, 2), (4, 3)];
        assert_eq!(simplify_collinear(cells), vec![(0, 0), (2, 0), (4, 2), (4, 3)]);
    }
}
