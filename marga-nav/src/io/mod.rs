//! Robot-facing boundary of the navigation loop.

pub mod robot;

pub use robot::{RobotError, RobotInterface};
