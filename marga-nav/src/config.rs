//! Configuration loading for MargaNav.
//!
//! A [`Config`] is built once (defaults, optional TOML file, then per-run
//! overrides) and shared read-only by every run. Sections map one-to-one to
//! components; each section struct lives next to the component it drives.

use crate::algorithms::fusion::FusionConfig;
use crate::algorithms::mapping::OccupancyGridConfig;
use crate::algorithms::matching::MatchingConfig;
use crate::algorithms::planning::AStarConfig;
use crate::error::{NavError, Result};
use crate::navigation::{ControllerConfig, NavigationMode};
use crate::sensors::preprocessing::PreprocessorConfig;
use crate::sim::SimulationConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub navigation: NavigationConfig,
    pub preprocessing: PreprocessorConfig,
    pub matching: MatchingConfig,
    pub fusion: FusionConfig,
    pub mapping: OccupancyGridConfig,
    pub planning: AStarConfig,
    pub control: ControllerConfig,
    pub simulation: SimulationConfig,
}

/// Loop-level settings read by the orchestrator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Planning strategy (default: unknown)
    pub mode: NavigationMode,

    /// Goal is reached when the pose is within this radius of the goal center (meters)
    pub arrival_tolerance: f32,

    /// Wall-clock limit for a run (seconds)
    pub time_limit_s: f32,

    /// Soft per-tick budget; overruns are logged and counted (seconds)
    pub tick_budget_s: f32,

    /// Optional hard cap on ticks, checked alongside the wall-clock limit
    pub max_steps: Option<u64>,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            mode: NavigationMode::Unknown,
            arrival_tolerance: 0.3,
            time_limit_s: 150.0,
            tick_budget_s: 0.1,
            max_steps: None,
        }
    }
}

impl NavigationConfig {
    pub fn time_limit(&self) -> Duration {
        Duration::from_secs_f32(self.time_limit_s.max(0.0))
    }

    pub fn tick_budget(&self) -> Duration {
        Duration::from_secs_f32(self.tick_budget_s.max(0.0))
    }
}

/// Per-run overrides applied on top of a base [`Config`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigOverrides {
    pub seed: Option<u64>,
    pub mode: Option<NavigationMode>,
    pub time_limit_s: Option<f32>,
    pub max_steps: Option<u64>,
}

impl ConfigOverrides {
    /// Override set used by the batch driver for one seed.
    pub fn for_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Missing sections and fields fall back to their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Return a new configuration with `overrides` applied. `self` is untouched.
    pub fn with_overrides(&self, overrides: &ConfigOverrides) -> Config {
        let mut config = self.clone();
        if let Some(seed) = overrides.seed {
            config.simulation.seed = seed;
        }
        if let Some(mode) = overrides.mode {
            config.navigation.mode = mode;
        }
        if let Some(limit) = overrides.time_limit_s {
            config.navigation.time_limit_s = limit;
        }
        if overrides.max_steps.is_some() {
            config.navigation.max_steps = overrides.max_steps;
        }
        config
    }

    /// Reject values that would make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, value: f32) -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(NavError::Config(format!("{name} must be positive, got {value}")))
            }
        }

        positive("navigation.arrival_tolerance", self.navigation.arrival_tolerance)?;
        positive("navigation.time_limit_s", self.navigation.time_limit_s)?;
        positive("navigation.tick_budget_s", self.navigation.tick_budget_s)?;
        positive("mapping.resolution", self.mapping.resolution)?;
        positive("planning.sample_step", self.planning.sample_step)?;
        positive("planning.robot_radius", self.planning.robot_radius)?;
        positive("control.lookahead", self.control.lookahead)?;
        positive("control.max_linear", self.control.max_linear)?;
        positive("control.max_angular", self.control.max_angular)?;
        positive("simulation.cell_size", self.simulation.cell_size)?;
        positive("simulation.dt", self.simulation.dt)?;

        if !(0.0..self.navigation.arrival_tolerance).contains(&self.planning.goal_snap_distance) {
            return Err(NavError::Config(format!(
                "planning.goal_snap_distance must be within [0, arrival_tolerance), got {}",
                self.planning.goal_snap_distance
            )));
        }
        if self.mapping.occupied_threshold <= 0.0 {
            return Err(NavError::Config(format!(
                "mapping.occupied_threshold must be positive, got {}",
                self.mapping.occupied_threshold
            )));
        }
        if self.simulation.maze_size == 0 {
            return Err(NavError::Config("simulation.maze_size must be at least 1".into()));
        }
        if self.simulation.wall_thickness >= self.simulation.cell_size {
            return Err(NavError::Config(
                "simulation.wall_thickness must be smaller than cell_size".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.fusion.blend) {
            return Err(NavError::Config(format!(
                "fusion.blend must be within [0, 1], got {}",
                self.fusion.blend
            )));
        }
        if !(0.0..1.0).contains(&self.matching.icp.outlier_ratio) {
            return Err(NavError::Config(format!(
                "matching.icp.outlier_ratio must be within [0, 1), got {}",
                self.matching.icp.outlier_ratio
            )));
        }
        if self.matching.icp.max_iterations == 0 {
            return Err(NavError::Config("matching.icp.max_iterations must be at least 1".into()));
        }
        if self.mapping.log_odds_occupied <= 0.0 || self.mapping.log_odds_free >= 0.0 {
            return Err(NavError::Config(
                "mapping log-odds increments must be positive (occupied) and negative (free)".into(),
            ));
        }
        Ok(())
    }
}
