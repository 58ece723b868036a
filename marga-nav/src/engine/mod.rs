//! Orchestration layer.
//!
//! # Contents
//!
//! - [`initializer`]: initial c-space, path, start pose, and map for an arena
//! - [`run`]: the per-tick loop and its terminal outcomes
//! - [`batch`]: one run per seed, optionally in parallel

pub mod batch;
pub mod initializer;
pub mod run;

pub use batch::{BatchReport, run_batch, run_seed, run_seed_with_observer};
pub use initializer::{NavigationInit, initialize, map_for_arena};
pub use run::{Goal, Orchestrator, RunDiagnostics, RunOutcome, RunReport, RunState, TickRecord};
