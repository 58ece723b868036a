//! Pure pursuit path controller.
//!
//! Steers toward a lookahead point on the path. The lookahead point is found
//! by projecting the robot onto the path (which implicitly drops waypoints
//! already passed) and advancing `lookahead` meters along it.

use serde::{Deserialize, Serialize};

use super::Path;
use crate::core::math::angle_diff;
use crate::core::types::{Pose2D, Setpoint};

/// `[control]` configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Distance ahead of the projection to aim at (meters)
    pub lookahead: f32,
    /// Maximum linear velocity (m/s)
    pub max_linear: f32,
    /// Maximum angular velocity (rad/s)
    pub max_angular: f32,
    /// Proportional gain on heading error
    pub heading_gain: f32,
    /// Above this heading error the robot turns in place (radians)
    pub rotate_in_place_threshold: f32,
    /// Linear speed is divided by `1 + cross_track_gain * cross_track_error`
    pub cross_track_gain: f32,
    /// Linear speed ramps down inside this distance to the goal (meters)
    pub goal_slowdown_radius: f32,
    /// Floor for linear speed while driving (m/s)
    pub min_linear: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            lookahead: 0.35,
            max_linear: 0.3,
            max_angular: 1.2,
            heading_gain: 2.0,
            rotate_in_place_threshold: 0.7,
            cross_track_gain: 2.0,
            goal_slowdown_radius: 0.5,
            min_linear: 0.05,
        }
    }
}

/// Stateless pure pursuit controller.
#[derive(Debug, Clone)]
pub struct PurePursuitController {
    config: ControllerConfig,
}

impl PurePursuitController {
    pub fn new(config: ControllerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Compute the setpoint for the current pose. An empty path stops the robot.
    pub fn compute(&self, pose: &Pose2D, path: &Path) -> Setpoint {
        let Some(projection) = path.project(pose.x, pose.y) else {
            return Setpoint::stop();
        };
        let Some(target) = path.advance(&projection, self.config.lookahead) else {
            return Setpoint::stop();
        };

        let dx = target.x - pose.x;
        let dy = target.y - pose.y;
        let target_distance = (dx * dx + dy * dy).sqrt();
        if target_distance < 1e-4 {
            return Setpoint::stop();
        }

        let heading_error = angle_diff(pose.theta, dy.atan2(dx));
        let angular = self.config.heading_gain * heading_error;

        if heading_error.abs() > self.config.rotate_in_place_threshold {
            log::trace!(
                "rotate in place: heading error {:.1}°",
                heading_error.to_degrees()
            );
            return Setpoint::new(0.0, angular)
                .saturate(self.config.max_linear, self.config.max_angular);
        }

        let heading_factor = heading_error.cos().max(0.0);
        let cross_track_factor = 1.0 / (1.0 + self.config.cross_track_gain * projection.distance);
        let goal_distance = path.remaining_length(&projection) + projection.distance;
        let goal_factor = if self.config.goal_slowdown_radius > 0.0 {
            (goal_distance / self.config.goal_slowdown_radius).min(1.0)
        } else {
            1.0
        };

        let linear = (self.config.max_linear * heading_factor * cross_track_factor * goal_factor)
            .max(self.config.min_linear);

        Setpoint::new(linear, angular).saturate(self.config.max_linear, self.config.max_angular)
    }
}
