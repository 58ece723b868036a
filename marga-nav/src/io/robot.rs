//! Robot interface trait.
//!
//! The loop talks to the robot only through [`RobotInterface`]. The simulated
//! robot in [`crate::sim`] implements it; a hardware driver would too.

use thiserror::Error;

use crate::core::types::{LaserScan, Pose2D, Setpoint};

/// Failures reported by a robot implementation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RobotError {
    #[error("pose estimate is not finite: ({x}, {y}, {theta})")]
    NonFinitePose { x: f32, y: f32, theta: f32 },

    #[error("scan rejected: {0}")]
    InvalidScan(&'static str),

    #[error("setpoint is not finite: linear={linear}, angular={angular}")]
    InvalidSetpoint { linear: f32, angular: f32 },

    #[error("robot unavailable: {0}")]
    Unavailable(String),
}

impl RobotError {
    pub(crate) fn check_pose(pose: Pose2D) -> Result<Pose2D, RobotError> {
        if pose.is_finite() {
            Ok(pose)
        } else {
            Err(RobotError::NonFinitePose {
                x: pose.x,
                y: pose.y,
                theta: pose.theta,
            })
        }
    }
}

/// Sensing and actuation for one robot.
///
/// Implementations must return finite values or an error.
pub trait RobotInterface {
    /// Current odometry pose estimate.
    fn pose(&mut self) -> Result<Pose2D, RobotError>;

    /// One range scan, taken at the robot's current physical pose.
    fn scan(&mut self) -> Result<LaserScan, RobotError>;

    /// Execute `setpoint` for one tick starting from the `trusted` pose.
    ///
    /// Returns the new pose estimate after the motion.
    fn apply(&mut self, trusted: &Pose2D, setpoint: &Setpoint) -> Result<Pose2D, RobotError>;

    /// Ground-truth pose when the implementation knows it (simulation only).
    fn ground_truth(&self) -> Option<Pose2D> {
        None
    }
}

impl<R: RobotInterface + ?Sized> RobotInterface for Box<R> {
    fn pose(&mut self) -> Result<Pose2D, RobotError> {
        (**self).pose()
    }

    fn scan(&mut self) -> Result<LaserScan, RobotError> {
        (**self).scan()
    }

    fn apply(&mut self, trusted: &Pose2D, setpoint: &Setpoint) -> Result<Pose2D, RobotError> {
        (**self).apply(trusted, setpoint)
    }

    fn ground_truth(&self) -> Option<Pose2D> {
        (**self).ground_truth()
    }
}
