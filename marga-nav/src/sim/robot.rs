//! Simulated differential-drive robot.
//!
//! Holds the ground-truth pose privately. The lidar ray-casts from the true
//! pose; odometry reports the commanded-then-executed motion with scale noise,
//! chained onto whatever pose the caller trusts.

use std::f32::consts::{PI, TAU};

use super::maze::Arena;
use super::noise::NoiseGenerator;
use super::SimulationConfig;
use crate::core::types::{LaserScan, Pose2D, Setpoint};
use crate::io::{RobotError, RobotInterface};

/// Robot simulated against an [`Arena`].
#[derive(Debug, Clone)]
pub struct SimulatedRobot {
    arena: Arena,
    config: SimulationConfig,
    truth: Pose2D,
    estimate: Pose2D,
    noise: NoiseGenerator,
    collisions: u64,
}

impl SimulatedRobot {
    /// Place a robot at `start_pose`. The estimate starts equal to the truth.
    pub fn new(arena: &Arena, config: &SimulationConfig, start_pose: Pose2D, seed: u64) -> Self {
        Self {
            arena: arena.clone(),
            config: config.clone(),
            truth: start_pose,
            estimate: start_pose,
            noise: NoiseGenerator::new(seed),
            collisions: 0,
        }
    }

    /// Number of rejected translations so far.
    pub fn collisions(&self) -> u64 {
        self.collisions
    }

    /// Differential-drive arc over one tick; translation is dropped on collision.
    fn integrate(&mut self, setpoint: &Setpoint) -> bool {
        let dt = self.config.dt;
        let Pose2D { x, y, theta } = self.truth;
        let (v, w) = (setpoint.linear, setpoint.angular);

        let (new_x, new_y, new_theta) = if w.abs() < 1e-6 {
            (x + v * theta.cos() * dt, y + v * theta.sin() * dt, theta)
        } else {
            let r = v / w;
            let new_theta = theta + w * dt;
            (
                x + r * (new_theta.sin() - theta.sin()),
                y + r * (theta.cos() - new_theta.cos()),
                new_theta,
            )
        };

        if self.arena.collides(new_x, new_y, self.config.robot_radius) {
            self.truth = Pose2D::new(x, y, new_theta);
            true
        } else {
            self.truth = Pose2D::new(new_x, new_y, new_theta);
            false
        }
    }
}

impl RobotInterface for SimulatedRobot {
    fn pose(&mut self) -> Result<Pose2D, RobotError> {
        RobotError::check_pose(self.estimate)
    }

    fn scan(&mut self) -> Result<LaserScan, RobotError> {
        let lidar = &self.config.lidar;
        if lidar.num_rays == 0 {
            return Err(RobotError::InvalidScan("lidar has no rays"));
        }
        let increment = TAU / lidar.num_rays as f32;
        let mut ranges = Vec::with_capacity(lidar.num_rays);

        for i in 0..lidar.num_rays {
            let bearing = -PI + i as f32 * increment;
            let mut range = self.arena.ray_cast(
                self.truth.x,
                self.truth.y,
                self.truth.theta + bearing,
                lidar.max_range,
            );
            if range < lidar.max_range {
                range = (range + self.noise.gaussian(lidar.range_stddev))
                    .clamp(lidar.min_range, lidar.max_range);
            }
            ranges.push(range);
        }

        let scan = LaserScan::new(-PI, increment, lidar.min_range, lidar.max_range, ranges);
        scan.validate().map_err(RobotError::InvalidScan)?;
        Ok(scan)
    }

    fn apply(&mut self, trusted: &Pose2D, setpoint: &Setpoint) -> Result<Pose2D, RobotError> {
        if !setpoint.linear.is_finite() || !setpoint.angular.is_finite() {
            return Err(RobotError::InvalidSetpoint {
                linear: setpoint.linear,
                angular: setpoint.angular,
            });
        }

        let before = self.truth;
        if self.integrate(setpoint) {
            self.collisions += 1;
            log::debug!(
                "collision at ({:.2}, {:.2}), translation rejected",
                before.x,
                before.y
            );
        }

        let delta = before.inverse().compose(&self.truth);
        let linear_scale = 1.0 + self.noise.gaussian(self.config.odometry.linear_stddev);
        let angular_scale = 1.0 + self.noise.gaussian(self.config.odometry.angular_stddev);
        let measured = Pose2D::new(
            delta.x * linear_scale,
            delta.y * linear_scale,
            delta.theta * angular_scale,
        );

        self.estimate = RobotError::check_pose(trusted.compose(&measured))?;
        Ok(self.estimate)
    }

    fn ground_truth(&self) -> Option<Pose2D> {
        Some(self.truth)
    }
}
