//! MargaNav - closed-loop navigation for a simulated maze robot
//!
//! Every control tick the robot senses, corrects its odometry by scan
//! matching, maps what it sees, replans when needed, and drives toward the
//! goal with a pure pursuit controller.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    engine/                          │  ← Orchestration
//! │         (initializer, run loop, batch)              │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌──────────────────────────┐ ┌────────────────────────┐
//! │       navigation/        │ │      io/ + sim/        │  ← Control / robot
//! │ (path, controller,       │ │ (RobotInterface, maze, │
//! │  replan policy)          │ │  simulated robot)      │
//! └──────────────────────────┘ └────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                  algorithms/                        │  ← Core algorithms
//! │      (matching, fusion, mapping, planning)          │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                   sensors/                          │  ← Sensor processing
//! │                (preprocessing)                      │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                (types, math)                        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use marga_nav::config::{Config, ConfigOverrides};
//! use marga_nav::engine::run_seed;
//!
//! let config = Config::default().with_overrides(&ConfigOverrides::for_seed(6));
//! let report = run_seed(&config);
//! println!("{} after {} steps", report.outcome, report.steps);
//! ```

pub mod algorithms;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod io;
pub mod navigation;
pub mod sensors;
pub mod sim;

pub use config::{Config, ConfigOverrides};
pub use error::{NavError, Result};
