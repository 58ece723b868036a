//! Arena geometry: a seeded perfect maze or an open box.
//!
//! Walls are axis-aligned rectangles. The same geometry serves three users:
//! the simulated lidar (ray casting), the simulated body (collision), and
//! Known-mode planning (sampled obstacle points).

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::{ArenaLayout, SimulationConfig};
use crate::core::types::Point2D;

const EAST: u8 = 1;
const NORTH: u8 = 2;
const WEST: u8 = 4;
const SOUTH: u8 = 8;

/// Axis-aligned wall rectangle (meters).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wall {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Wall {
    /// Wall of `thickness` centered on the segment `a`-`b` (axis-aligned),
    /// extended by half the thickness past both ends so corners close.
    pub fn from_segment(a: (f32, f32), b: (f32, f32), thickness: f32) -> Self {
        let h = thickness * 0.5;
        Self {
            min_x: a.0.min(b.0) - h,
            min_y: a.1.min(b.1) - h,
            max_x: a.0.max(b.0) + h,
            max_y: a.1.max(b.1) + h,
        }
    }

    #[inline]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// True if a disc of `radius` at `(x, y)` overlaps the wall.
    #[inline]
    pub fn overlaps_disc(&self, x: f32, y: f32, radius: f32) -> bool {
        let dx = x - x.clamp(self.min_x, self.max_x);
        let dy = y - y.clamp(self.min_y, self.max_y);
        dx * dx + dy * dy < radius * radius
    }

    /// Distance along a unit ray to the wall (slab method), if hit.
    pub fn ray_distance(&self, ox: f32, oy: f32, dx: f32, dy: f32) -> Option<f32> {
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;

        for (o, d, lo, hi) in [(ox, dx, self.min_x, self.max_x), (oy, dy, self.min_y, self.max_y)] {
            if d.abs() < 1e-9 {
                if o < lo || o > hi {
                    return None;
                }
            } else {
                let t1 = (lo - o) / d;
                let t2 = (hi - o) / d;
                t_near = t_near.max(t1.min(t2));
                t_far = t_far.min(t1.max(t2));
            }
        }

        if t_near > t_far || t_far < 0.0 {
            None
        } else {
            Some(t_near.max(0.0))
        }
    }
}

/// Square arena of `cells × cells` grid cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Arena {
    cells: usize,
    cell_size: f32,
    entrance: (usize, usize),
    goal: (usize, usize),
    /// Passage bitmask per cell (EAST | NORTH | WEST | SOUTH).
    passages: Vec<u8>,
    walls: Vec<Wall>,
}

impl Arena {
    /// Build the arena the configuration describes.
    pub fn from_config(config: &SimulationConfig) -> Self {
        match config.layout {
            ArenaLayout::Maze => Self::maze(
                config.maze_size,
                config.cell_size,
                config.wall_thickness,
                config.seed,
            ),
            ArenaLayout::Open => Self::open(config.maze_size, config.cell_size, config.wall_thickness),
        }
    }

    /// Perfect maze carved by an iterative depth-first backtracker.
    ///
    /// The same seed always yields the same maze.
    pub fn maze(cells: usize, cell_size: f32, thickness: f32, seed: u64) -> Self {
        let cells = cells.max(1);
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut passages = vec![0u8; cells * cells];
        let mut visited = vec![false; cells * cells];
        let mut stack = vec![(0usize, 0usize)];
        visited[0] = true;

        while let Some(&(cx, cy)) = stack.last() {
            let mut candidates: Vec<((usize, usize), u8, u8)> = Vec::with_capacity(4);
            if cx + 1 < cells && !visited[cy * cells + cx + 1] {
                candidates.push(((cx + 1, cy), EAST, WEST));
            }
            if cy + 1 < cells && !visited[(cy + 1) * cells + cx] {
                candidates.push(((cx, cy + 1), NORTH, SOUTH));
            }
            if cx > 0 && !visited[cy * cells + cx - 1] {
                candidates.push(((cx - 1, cy), WEST, EAST));
            }
            if cy > 0 && !visited[(cy - 1) * cells + cx] {
                candidates.push(((cx, cy - 1), SOUTH, NORTH));
            }

            if candidates.is_empty() {
                stack.pop();
                continue;
            }

            let (next, out, back) = candidates[rng.gen_range(0..candidates.len())];
            passages[cy * cells + cx] |= out;
            passages[next.1 * cells + next.0] |= back;
            visited[next.1 * cells + next.0] = true;
            stack.push(next);
        }

        Self::with_passages(cells, cell_size, thickness, passages)
    }

    /// Boundary walls only; every interior edge is a passage.
    pub fn open(cells: usize, cell_size: f32, thickness: f32) -> Self {
        let cells = cells.max(1);
        let mut passages = vec![0u8; cells * cells];
        for cy in 0..cells {
            for cx in 0..cells {
                let p = &mut passages[cy * cells + cx];
                if cx + 1 < cells {
                    *p |= EAST;
                }
                if cy + 1 < cells {
                    *p |= NORTH;
                }
                if cx > 0 {
                    *p |= WEST;
                }
                if cy > 0 {
                    *p |= SOUTH;
                }
            }
        }
        Self::with_passages(cells, cell_size, thickness, passages)
    }

    fn with_passages(cells: usize, cell_size: f32, thickness: f32, passages: Vec<u8>) -> Self {
        let size = cells as f32 * cell_size;
        let mut walls = vec![
            Wall::from_segment((0.0, 0.0), (size, 0.0), thickness),
            Wall::from_segment((0.0, size), (size, size), thickness),
            Wall::from_segment((0.0, 0.0), (0.0, size), thickness),
            Wall::from_segment((size, 0.0), (size, size), thickness),
        ];

        for cy in 0..cells {
            for cx in 0..cells {
                let p = passages[cy * cells + cx];
                let x0 = cx as f32 * cell_size;
                let y0 = cy as f32 * cell_size;
                if cx + 1 < cells && p & EAST == 0 {
                    walls.push(Wall::from_segment(
                        (x0 + cell_size, y0),
                        (x0 + cell_size, y0 + cell_size),
                        thickness,
                    ));
                }
                if cy + 1 < cells && p & NORTH == 0 {
                    walls.push(Wall::from_segment(
                        (x0, y0 + cell_size),
                        (x0 + cell_size, y0 + cell_size),
                        thickness,
                    ));
                }
            }
        }

        Self {
            cells,
            cell_size,
            entrance: (0, 0),
            goal: (cells - 1, cells - 1),
            passages,
            walls,
        }
    }

    /// Cells per side.
    pub fn cells(&self) -> usize {
        self.cells
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Side length of the square extent `[0, size]²` (meters).
    pub fn size(&self) -> f32 {
        self.cells as f32 * self.cell_size
    }

    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    pub fn entrance(&self) -> (usize, usize) {
        self.entrance
    }

    pub fn goal_cell(&self) -> (usize, usize) {
        self.goal
    }

    pub fn cell_center(&self, cell: (usize, usize)) -> Point2D {
        Point2D::new(
            (cell.0 as f32 + 0.5) * self.cell_size,
            (cell.1 as f32 + 0.5) * self.cell_size,
        )
    }

    /// True if the two cells are 4-neighbours with no wall between them.
    pub fn has_passage(&self, a: (usize, usize), b: (usize, usize)) -> bool {
        if a.0 >= self.cells || a.1 >= self.cells || b.0 >= self.cells || b.1 >= self.cells {
            return false;
        }
        let bit = match (b.0 as i64 - a.0 as i64, b.1 as i64 - a.1 as i64) {
            (1, 0) => EAST,
            (0, 1) => NORTH,
            (-1, 0) => WEST,
            (0, -1) => SOUTH,
            _ => return false,
        };
        self.passages[a.1 * self.cells + a.0] & bit != 0
    }

    /// Distance to the nearest wall along `angle`, or `max_range` on a miss.
    pub fn ray_cast(&self, x: f32, y: f32, angle: f32, max_range: f32) -> f32 {
        let (dy, dx) = angle.sin_cos();
        self.walls
            .iter()
            .filter_map(|w| w.ray_distance(x, y, dx, dy))
            .fold(max_range, f32::min)
    }

    /// True if a disc of `radius` at `(x, y)` touches a wall.
    pub fn collides(&self, x: f32, y: f32, radius: f32) -> bool {
        self.walls.iter().any(|w| w.overlaps_disc(x, y, radius))
    }

    /// Wall interiors sampled on a `step` lattice, edges included.
    pub fn obstacle_points(&self, step: f32) -> Vec<Point2D> {
        let step = step.max(1e-3);
        let mut points = Vec::new();
        for w in &self.walls {
            let nx = ((w.max_x - w.min_x) / step).ceil().max(1.0) as usize;
            let ny = ((w.max_y - w.min_y) / step).ceil().max(1.0) as usize;
            for iy in 0..=ny {
                let y = w.min_y + (w.max_y - w.min_y) * iy as f32 / ny as f32;
                for ix in 0..=nx {
                    let x = w.min_x + (w.max_x - w.min_x) * ix as f32 / nx as f32;
                    points.push(Point2D::new(x, y));
                }
            }
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::VecDeque;

    fn reachable(arena: &Arena) -> usize {
        let n = arena.cells();
        let mut seen = vec![false; n * n];
        let mut queue = VecDeque::from([(0usize, 0usize)]);
        seen[0] = true;
        let mut count = 0;
        while let Some((x, y)) = queue.pop_front() {
            count += 1;
            let neighbours = [
                (x + 1, y),
                (x, y + 1),
                (x.wrapping_sub(1), y),
                (x, y.wrapping_sub(1)),
            ];
            for nb in neighbours {
                if arena.has_passage((x, y), nb) && !seen[nb.1 * n + nb.0] {
                    seen[nb.1 * n + nb.0] = true;
                    queue.push_back(nb);
                }
            }
        }
        count
    }

    #[test]
    fn test_maze_is_perfect() {
        let arena = Arena::maze(6, 1.0, 0.05, 6);
        assert_eq!(reachable(&arena), 36);

        // A spanning tree over 36 cells has 35 edges
        let edges: u32 = arena
            .passages
            .iter()
            .map(|p| (p & (EAST | NORTH)).count_ones())
            .sum();
        assert_eq!(edges, 35);
        // 4 boundary walls + every interior edge that is not a passage
        assert_eq!(arena.walls().len(), 4 + (2 * 6 * 5 - 35));
    }

    #[test]
    fn test_maze_is_deterministic() {
        assert_eq!(Arena::maze(8, 1.0, 0.05, 243), Arena::maze(8, 1.0, 0.05, 243));
        assert_ne!(Arena::maze(8, 1.0, 0.05, 243), Arena::maze(8, 1.0, 0.05, 463));
    }

    #[test]
    fn test_open_arena() {
        let arena = Arena::open(4, 1.0, 0.05);
        assert_eq!(arena.walls().len(), 4);
        assert_eq!(reachable(&arena), 16);
        assert_eq!(arena.goal_cell(), (3, 3));
        assert_relative_eq!(arena.cell_center((3, 3)).x, 3.5);
        assert_relative_eq!(arena.size(), 4.0);
    }

    #[test]
    fn test_ray_cast() {
        let arena = Arena::open(4, 1.0, 0.1);
        // Wall face at x = 4 - 0.05
        assert_relative_eq!(arena.ray_cast(1.0, 2.0, 0.0, 10.0), 2.95, epsilon = 1e-4);
        assert_relative_eq!(
            arena.ray_cast(1.0, 2.0, std::f32::consts::PI, 10.0),
            0.95,
            epsilon = 1e-4
        );
        assert_eq!(arena.ray_cast(1.0, 2.0, 0.0, 1.0), 1.0);
    }

    #[test]
    fn test_collision() {
        let arena = Arena::open(4, 1.0, 0.1);
        assert!(!arena.collides(2.0, 2.0, 0.15));
        assert!(arena.collides(0.15, 2.0, 0.15));
    }

    #[test]
    fn test_obstacle_points_cover_walls() {
        let arena = Arena::open(2, 1.0, 0.05);
        let points = arena.obstacle_points(0.05);
        assert!(points
            .iter()
            .all(|p| arena.walls().iter().any(|w| w.overlaps_disc(p.x, p.y, 1e-3))));
        // Bottom wall sampled along its whole length
        assert!(points.iter().any(|p| (p.x - 1.0).abs() < 0.03 && p.y.abs() < 0.03));
    }
}
