//! Configuration-space grid.
//!
//! Obstacles are stamped as discs of radius `robot_radius + safety_margin`
//! so the planner can treat the robot as a point. The grid spans the arena at
//! the planner's sample step; everything outside it is blocked.

use crate::algorithms::mapping::OccupancyGrid;
use crate::core::types::Point2D;
use crate::navigation::Path;

/// Planner-owned obstacle representation.
#[derive(Debug, Clone, PartialEq)]
pub struct CSpace {
    width: usize,
    height: usize,
    origin_x: f32,
    origin_y: f32,
    step: f32,
    inflation_cells: i32,
    /// Raw obstacle marks before inflation.
    obstacles: Vec<bool>,
    /// Inflated blocked cells.
    blocked: Vec<bool>,
}

impl CSpace {
    /// All-free c-space over `[origin, origin + (width_m, height_m)]`.
    pub fn new(origin: (f32, f32), width_m: f32, height_m: f32, step: f32, inflation: f32) -> Self {
        let width = (width_m / step - 1e-4).ceil().max(1.0) as usize;
        let height = (height_m / step - 1e-4).ceil().max(1.0) as usize;
        Self {
            width,
            height,
            origin_x: origin.0,
            origin_y: origin.1,
            step,
            inflation_cells: (inflation / step - 1e-4).ceil().max(0.0) as i32,
            obstacles: vec![false; width * height],
            blocked: vec![false; width * height],
        }
    }

    /// Same extent and inflation, no obstacles.
    pub fn cleared(&self) -> Self {
        Self {
            obstacles: vec![false; self.width * self.height],
            blocked: vec![false; self.width * self.height],
            ..self.clone()
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn inflation_cells(&self) -> i32 {
        self.inflation_cells
    }

    pub fn blocked_count(&self) -> usize {
        self.blocked.iter().filter(|b| **b).count()
    }

    /// Stamp an obstacle at a world point. Points outside the grid are ignored.
    pub fn add_obstacle(&mut self, x: f32, y: f32) {
        let Some((cx, cy)) = self.world_to_cell(x, y) else {
            return;
        };
        let idx = self.index((cx, cy));
        if self.obstacles[idx] {
            return;
        }
        self.obstacles[idx] = true;

        let r = self.inflation_cells;
        let (cx, cy) = (cx as i32, cy as i32);
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy > r * r {
                    continue;
                }
                let (nx, ny) = (cx + dx, cy + dy);
                if nx >= 0 && ny >= 0 && (nx as usize) < self.width && (ny as usize) < self.height {
                    let nidx = (ny as usize) * self.width + nx as usize;
                    self.blocked[nidx] = true;
                }
            }
        }
    }

    /// Stamp every point of an iterator.
    pub fn add_obstacles<I: IntoIterator<Item = Point2D>>(&mut self, points: I) {
        for p in points {
            self.add_obstacle(p.x, p.y);
        }
    }

    /// Stamp every occupied cell of an occupancy grid.
    pub fn add_occupied(&mut self, map: &OccupancyGrid) {
        for (x, y) in map.occupied_cells() {
            self.add_obstacle(x, y);
        }
    }

    pub fn world_to_cell(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        let cx = ((x - self.origin_x) / self.step).floor();
        let cy = ((y - self.origin_y) / self.step).floor();
        if cx >= 0.0 && cy >= 0.0 && (cx as usize) < self.width && (cy as usize) < self.height {
            Some((cx as usize, cy as usize))
        } else {
            None
        }
    }

    pub fn cell_to_world(&self, cell: (usize, usize)) -> (f32, f32) {
        (
            self.origin_x + (cell.0 as f32 + 0.5) * self.step,
            self.origin_y + (cell.1 as f32 + 0.5) * self.step,
        )
    }

    #[inline]
    pub(crate) fn index(&self, cell: (usize, usize)) -> usize {
        cell.1 * self.width + cell.0
    }

    #[inline]
    pub(crate) fn cell_of(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    /// True if the cell is inside the grid and not blocked.
    #[inline]
    pub fn is_free(&self, cell: (usize, usize)) -> bool {
        cell.0 < self.width && cell.1 < self.height && !self.blocked[self.index(cell)]
    }

    /// True if the world point is inside the grid and not blocked.
    pub fn is_free_world(&self, x: f32, y: f32) -> bool {
        self.world_to_cell(x, y).is_some_and(|c| self.is_free(c))
    }

    /// True if every sample along the segment is free.
    pub fn segment_is_free(&self, a: (f32, f32), b: (f32, f32)) -> bool {
        let length = ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt();
        let samples = (length / (0.5 * self.step)).ceil().max(1.0) as usize;
        (0..=samples).all(|i| {
            let t = i as f32 / samples as f32;
            self.is_free_world(a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1))
        })
    }

    /// True if the path from `from_segment` onward stays in free space.
    pub fn path_is_clear(&self, path: &Path, from_segment: usize) -> bool {
        path.waypoints
            .windows(2)
            .skip(from_segment)
            .all(|w| self.segment_is_free((w[0].x, w[0].y), (w[1].x, w[1].y)))
    }
}
