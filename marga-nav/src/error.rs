//! Error types for MargaNav

use crate::algorithms::planning::PlanningError;
use crate::io::RobotError;
use thiserror::Error;

/// MargaNav error type
#[derive(Error, Debug)]
pub enum NavError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Robot interface error: {0}")]
    Robot(#[from] RobotError),

    #[error("Planning error: {0}")]
    Planning(#[from] PlanningError),

    #[error("Invalid scan: {0}")]
    InvalidScan(String),

    #[error("Invalid pose: {0}")]
    InvalidPose(String),

    #[error("Report serialization failed: {0}")]
    Report(#[from] serde_json::Error),
}

impl From<toml::de::Error> for NavError {
    fn from(e: toml::de::Error) -> Self {
        NavError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NavError>;
