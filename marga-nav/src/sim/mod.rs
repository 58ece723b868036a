//! Simulation collaborators: maze world and simulated robot.
//!
//! Everything here sits outside the navigation core. The loop only sees the
//! [`RobotInterface`](crate::io::RobotInterface) implemented by
//! [`SimulatedRobot`] and the wall geometry [`Arena`] exposes for Known mode.
//!
//! # Configuration
//!
//! ```toml
//! [simulation]
//! layout = "maze"       # or "open" (boundary walls only)
//! maze_size = 6
//! cell_size = 1.0
//! seed = 6              # noise: 0 = random each run
//!
//! [simulation.lidar]
//! num_rays = 180
//! range_stddev = 0.005
//! ```

mod maze;
mod noise;
mod robot;

pub use maze::{Arena, Wall};
pub use noise::NoiseGenerator;
pub use robot::SimulatedRobot;

use serde::{Deserialize, Serialize};

/// Arena layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArenaLayout {
    /// Perfect maze from a seeded backtracker
    #[default]
    Maze,
    /// Boundary walls only
    Open,
}

/// `[simulation]` configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub layout: ArenaLayout,
    /// Maze cells per side
    pub maze_size: usize,
    /// Cell edge length (meters)
    pub cell_size: f32,
    /// Wall thickness (meters)
    pub wall_thickness: f32,
    /// Maze and noise seed
    pub seed: u64,
    /// Control tick duration (seconds)
    pub dt: f32,
    /// Collision radius of the simulated body (meters)
    pub robot_radius: f32,
    pub lidar: SimLidarConfig,
    pub odometry: OdometryNoiseConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            layout: ArenaLayout::Maze,
            maze_size: 6,
            cell_size: 1.0,
            wall_thickness: 0.05,
            seed: 6,
            dt: 0.1,
            robot_radius: 0.15,
            lidar: SimLidarConfig::default(),
            odometry: OdometryNoiseConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Same world, no sensor or odometry noise.
    pub fn noiseless(mut self) -> Self {
        self.lidar.range_stddev = 0.0;
        self.odometry.linear_stddev = 0.0;
        self.odometry.angular_stddev = 0.0;
        self
    }
}

/// Simulated lidar parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimLidarConfig {
    /// Evenly spaced bearings over a full turn
    pub num_rays: usize,
    pub min_range: f32,
    pub max_range: f32,
    /// Gaussian range noise on real returns (meters)
    pub range_stddev: f32,
}

impl Default for SimLidarConfig {
    fn default() -> Self {
        Self {
            num_rays: 180,
            min_range: 0.12,
            max_range: 4.0,
            range_stddev: 0.005,
        }
    }
}

/// Odometry scale noise, applied multiplicatively to each tick's motion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OdometryNoiseConfig {
    pub linear_stddev: f32,
    pub angular_stddev: f32,
}

impl Default for OdometryNoiseConfig {
    fn default() -> Self {
        Self {
            linear_stddev: 0.02,
            angular_stddev: 0.02,
        }
    }
}
