//! Bresenham ray tracing for marking free space.
//!
//! A return at distance D means every cell between the sensor and D is free
//! and the cell at D is occupied. Cells outside the grid along the ray are
//! skipped, which clips rays that leave the mapped extent.

use super::OccupancyGrid;

/// Ray tracer for occupancy updates.
#[derive(Debug, Clone)]
pub struct RayTracer {
    /// Maximum ray length in cells.
    max_ray_length: usize,
}

impl Default for RayTracer {
    fn default() -> Self {
        Self {
            max_ray_length: 1000,
        }
    }
}

impl RayTracer {
    pub fn new(max_ray_length: usize) -> Self {
        Self { max_ray_length }
    }

    /// Trace from `start` to `end` (world coordinates).
    ///
    /// Every cell before the endpoint cell gets free evidence. The endpoint
    /// cell gets occupied evidence when `mark_endpoint` is set.
    pub fn trace_ray(
        &self,
        grid: &mut OccupancyGrid,
        start: (f32, f32),
        end: (f32, f32),
        mark_endpoint: bool,
    ) {
        let (x0, y0) = grid.world_to_cell_signed(start.0, start.1);
        let (x1, y1) = grid.world_to_cell_signed(end.0, end.1);

        let end_cell = (x1, y1);
        for (x, y) in BresenhamCells::new(x0, y0, x1, y1).take(self.max_ray_length) {
            if (x, y) == end_cell {
                if mark_endpoint {
                    grid.update_cell_signed(x, y, true);
                }
                break;
            }
            grid.update_cell_signed(x, y, false);
        }
    }
}

/// Cells visited by Bresenham's line from (x0, y0) to (x1, y1), both inclusive.
#[derive(Debug, Clone)]
pub struct BresenhamCells {
    x: i32,
    y: i32,
    x1: i32,
    y1: i32,
    dx: i32,
    dy: i32,
    sx: i32,
    sy: i32,
    err: i32,
    finished: bool,
}

impl BresenhamCells {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        Self {
            x: x0,
            y: y0,
            x1,
            y1,
            dx,
            dy,
            sx: if x0 < x1 { 1 } else { -1 },
            sy: if y0 < y1 { 1 } else { -1 },
            err: dx - dy,
            finished: false,
        }
    }
}

impl Iterator for BresenhamCells {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let current = (self.x, self.y);
        if self.x == self.x1 && self.y == self.y1 {
            self.finished = true;
            return Some(current);
        }

        let e2 = 2 * self.err;
        if e2 > -self.dy {
            self.err -= self.dy;
            self.x += self.sx;
        }
        if e2 < self.dx {
            self.err += self.dx;
            self.y += self.sy;
        }
        Some(current)
    }
}
