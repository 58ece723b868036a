//! Log-odds occupancy grid over a fixed rectangular extent.
//!
//! Cells accumulate clamped log-odds evidence. Once a cell reaches the
//! occupied threshold it is latched: later free evidence is ignored, so a
//! wall once seen stays in the map for the rest of the run. The default
//! threshold takes two net hits, so a single stray return never latches.

use serde::{Deserialize, Serialize};

/// Classification of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellState {
    /// Unknown (never observed, or evidence inconclusive)
    Unknown,
    /// Free space
    Free,
    /// Occupied by an obstacle
    Occupied,
}

/// `[mapping]` configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OccupancyGridConfig {
    /// Cell size in meters.
    pub resolution: f32,

    /// Log-odds increment for an occupied observation. Typical: 0.9
    pub log_odds_occupied: f32,

    /// Log-odds increment for a free observation. Negative. Typical: -0.4
    pub log_odds_free: f32,

    /// Upper clamp on log-odds.
    pub log_odds_max: f32,

    /// Lower clamp on log-odds.
    pub log_odds_min: f32,

    /// Cells at or above this are occupied (and latched). Above
    /// `log_odds_occupied`, so one hit alone is not enough.
    pub occupied_threshold: f32,

    /// Cells at or below this are free.
    pub free_threshold: f32,
}

impl Default for OccupancyGridConfig {
    fn default() -> Self {
        Self {
            resolution: 0.05,
            log_odds_occupied: 0.9,
            log_odds_free: -0.4,
            log_odds_max: 10.0,
            log_odds_min: -5.0,
            occupied_threshold: 1.5,
            free_threshold: -0.5,
        }
    }
}

/// Occupancy grid with log-odds cells, row-major from the origin corner.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyGrid {
    config: OccupancyGridConfig,
    width: usize,
    height: usize,
    origin_x: f32,
    origin_y: f32,
    cells: Vec<f32>,
    occupied_count: usize,
    occupied_revision: u64,
}

impl OccupancyGrid {
    /// Create an all-unknown grid covering `[origin, origin + (width_m, height_m)]`.
    pub fn new(config: OccupancyGridConfig, origin: (f32, f32), width_m: f32, height_m: f32) -> Self {
        // Shave a hair off so exact multiples of the resolution don't gain a cell
        let width = (width_m / config.resolution - 1e-4).ceil().max(1.0) as usize;
        let height = (height_m / config.resolution - 1e-4).ceil().max(1.0) as usize;
        Self {
            config,
            width,
            height,
            origin_x: origin.0,
            origin_y: origin.1,
            cells: vec![0.0; width * height],
            occupied_count: 0,
            occupied_revision: 0,
        }
    }

    pub fn config(&self) -> &OccupancyGridConfig {
        &self.config
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resolution(&self) -> f32 {
        self.config.resolution
    }

    pub fn origin(&self) -> (f32, f32) {
        (self.origin_x, self.origin_y)
    }

    /// Number of cells currently classified occupied.
    pub fn occupied_count(&self) -> usize {
        self.occupied_count
    }

    /// Increments every time a cell newly becomes occupied.
    ///
    /// Consumers compare against a stored value to detect map changes that
    /// matter for planning.
    pub fn occupied_revision(&self) -> u64 {
        self.occupied_revision
    }

    /// World coordinates to cell indices, `None` outside the grid.
    pub fn world_to_cell(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        let (cx, cy) = self.world_to_cell_signed(x, y);
        self.is_valid_cell(cx, cy)
            .then_some((cx as usize, cy as usize))
    }

    /// World coordinates to (possibly out-of-bounds) cell indices.
    pub fn world_to_cell_signed(&self, x: f32, y: f32) -> (i32, i32) {
        let cx = ((x - self.origin_x) / self.config.resolution).floor() as i32;
        let cy = ((y - self.origin_y) / self.config.resolution).floor() as i32;
        (cx, cy)
    }

    /// Cell center in world coordinates.
    pub fn cell_to_world(&self, cx: usize, cy: usize) -> (f32, f32) {
        (
            self.origin_x + (cx as f32 + 0.5) * self.config.resolution,
            self.origin_y + (cy as f32 + 0.5) * self.config.resolution,
        )
    }

    pub fn is_valid_cell(&self, cx: i32, cy: i32) -> bool {
        cx >= 0 && cy >= 0 && (cx as usize) < self.width && (cy as usize) < self.height
    }

    #[inline]
    fn cell_index(&self, cx: usize, cy: usize) -> usize {
        cy * self.width + cx
    }

    /// Log-odds of a cell, 0.0 outside the grid.
    pub fn get_log_odds(&self, cx: usize, cy: usize) -> f32 {
        if cx < self.width && cy < self.height {
            self.cells[self.cell_index(cx, cy)]
        } else {
            0.0
        }
    }

    /// Classification of a cell. Out of bounds is unknown.
    pub fn get_state(&self, cx: usize, cy: usize) -> CellState {
        if cx >= self.width || cy >= self.height {
            return CellState::Unknown;
        }
        let l = self.get_log_odds(cx, cy);
        if l >= self.config.occupied_threshold {
            CellState::Occupied
        } else if l <= self.config.free_threshold {
            CellState::Free
        } else {
            CellState::Unknown
        }
    }

    /// Classification of the cell containing a world point.
    pub fn state_at_world(&self, x: f32, y: f32) -> CellState {
        match self.world_to_cell(x, y) {
            Some((cx, cy)) => self.get_state(cx, cy),
            None => CellState::Unknown,
        }
    }

    /// Occupancy probability of a cell in [0, 1].
    pub fn get_probability(&self, cx: usize, cy: usize) -> f32 {
        1.0 / (1.0 + (-self.get_log_odds(cx, cy)).exp())
    }

    /// Apply one observation to a cell.
    ///
    /// Latched (occupied) cells ignore free observations.
    pub fn update_cell(&mut self, cx: usize, cy: usize, occupied: bool) {
        if cx >= self.width || cy >= self.height {
            return;
        }
        let idx = self.cell_index(cx, cy);
        let before = self.cells[idx];
        let was_occupied = before >= self.config.occupied_threshold;

        if !occupied && was_occupied {
            return;
        }

        let delta = if occupied {
            self.config.log_odds_occupied
        } else {
            self.config.log_odds_free
        };
        let after = (before + delta).clamp(self.config.log_odds_min, self.config.log_odds_max);
        self.cells[idx] = after;

        if !was_occupied && after >= self.config.occupied_threshold {
            self.occupied_count += 1;
            self.occupied_revision += 1;
        }
    }

    /// Signed-index variant of [`update_cell`](Self::update_cell); out-of-bounds is ignored.
    pub fn update_cell_signed(&mut self, cx: i32, cy: i32, occupied: bool) {
        if self.is_valid_cell(cx, cy) {
            self.update_cell(cx as usize, cy as usize, occupied);
        }
    }

    /// World-coordinate centers of all occupied cells, row-major order.
    pub fn occupied_cells(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        let threshold = self.config.occupied_threshold;
        self.cells
            .iter()
            .enumerate()
            .filter(move |(_, l)| **l >= threshold)
            .map(|(i, _)| self.cell_to_world(i % self.width, i / self.width))
    }

    /// Count cells by state: (unknown, free, occupied).
    pub fn count_cells(&self) -> (usize, usize, usize) {
        let mut counts = (0, 0, 0);
        for cy in 0..self.height {
            for cx in 0..self.width {
                match self.get_state(cx, cy) {
                    CellState::Unknown => counts.0 += 1,
                    CellState::Free => counts.1 += 1,
                    CellState::Occupied => counts.2 += 1,
                }
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid() -> OccupancyGrid {
        OccupancyGrid::new(OccupancyGridConfig::default(), (0.0, 0.0), 2.0, 1.0)
    }

    #[test]
    fn test_dimensions_and_conversion() {
        let g = grid();
        assert_eq!((g.width(), g.height()), (40, 20));
        assert_eq!(g.world_to_cell(0.07, 0.12), Some((1, 2)));
        assert_eq!(g.world_to_cell(-0.01, 0.5), None);
        assert_eq!(g.world_to_cell(2.01, 0.5), None);

        let (x, y) = g.cell_to_world(1, 2);
        assert_relative_eq!(x, 0.075, epsilon = 1e-6);
        assert_relative_eq!(y, 0.125, epsilon = 1e-6);
    }

    #[test]
    fn test_update_and_classify() {
        let mut g = grid();
        assert_eq!(g.get_state(5, 5), CellState::Unknown);

        g.update_cell(5, 5, true);
        assert_eq!(g.get_state(5, 5), CellState::Unknown);
        assert!(g.get_probability(5, 5) > 0.5);
        g.update_cell(5, 5, true);
        assert_eq!(g.get_state(5, 5), CellState::Occupied);

        g.update_cell(6, 5, false);
        assert_eq!(g.get_state(6, 5), CellState::Unknown);
        g.update_cell(6, 5, false);
        assert_eq!(g.get_state(6, 5), CellState::Free);
    }

    #[test]
    fn test_occupied_cells_are_latched() {
        let mut g = grid();
        g.update_cell(3, 3, true);
        g.update_cell(3, 3, true);
        for _ in 0..100 {
            g.update_cell(3, 3, false);
        }
        assert_eq!(g.get_state(3, 3), CellState::Occupied);
    }

    #[test]
    fn test_single_stray_hit_is_cleared() {
        let mut g = grid();
        g.update_cell(7, 7, true);
        g.update_cell(7, 7, false);
        g.update_cell(7, 7, false);
        g.update_cell(7, 7, false);
        g.update_cell(7, 7, true);
        assert_ne!(g.get_state(7, 7), CellState::Occupied);
        assert_eq!(g.occupied_revision(), 0);
    }

    #[test]
    fn test_log_odds_clamping() {
        let mut g = grid();
        for _ in 0..1000 {
            g.update_cell(1, 1, true);
            g.update_cell(2, 2, false);
        }
        assert_relative_eq!(g.get_log_odds(1, 1), g.config().log_odds_max);
        assert_relative_eq!(g.get_log_odds(2, 2), g.config().log_odds_min);
        let p = g.get_probability(1, 1);
        assert!(p > 0.0 && p <= 1.0);
    }

    #[test]
    fn test_revision_counts_new_occupied_cells_only() {
        let mut g = grid();
        assert_eq!(g.occupied_revision(), 0);
        g.update_cell(1, 1, true);
        assert_eq!(g.occupied_revision(), 0);
        g.update_cell(1, 1, true);
        g.update_cell(1, 1, true);
        g.update_cell(2, 1, false);
        assert_eq!(g.occupied_revision(), 1);
        assert_eq!(g.occupied_count(), 1);
        g.update_cell(4, 1, true);
        g.update_cell(4, 1, true);
        assert_eq!(g.occupied_revision(), 2);
        assert_eq!(g.occupied_cells().count(), 2);
    }

    #[test]
    fn test_out_of_bounds_is_ignored() {
        let mut g = grid();
        g.update_cell_signed(-1, 0, true);
        g.update_cell(400, 0, true);
        assert_eq!(g.occupied_count(), 0);
        assert_eq!(g.state_at_world(-5.0, -5.0), CellState::Unknown);
        assert_eq!(g.count_cells(), (800, 0, 0));
    }
}
