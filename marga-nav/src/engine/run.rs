//! The navigation loop.
//!
//! One [`Orchestrator`] drives one robot from the entrance to the goal. Each
//! tick runs, in order:
//!
//! ```text
//! timeout check → sense (pose, scan) → preprocess → match → fuse
//!   → store previous generation → map update → replan if needed
//!   → control → act → step += 1 → arrival check
//! ```
//!
//! The timeout check at the top of the tick is the only cancellation point.
//! Every collaborator error ends the run as [`RunOutcome::Faulted`].

use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};

use super::initializer::NavigationInit;
use crate::algorithms::fusion::{FusedPose, PoseFusion};
use crate::algorithms::mapping::{IntegrationStats, MapIntegrator, OccupancyGrid, RayTracer};
use crate::algorithms::matching::{DynMatcher, ScanMatchResult};
use crate::algorithms::planning::{AStarPlanner, CSpace};
use crate::config::Config;
use crate::core::types::{Point2D, PointCloud2D, Pose2D, Setpoint};
use crate::error::Result;
use crate::io::RobotInterface;
use crate::navigation::{Path, PurePursuitController, ReplanPolicy, ReplanReason};
use crate::sensors::ScanPreprocessor;

/// Goal cell and arrival radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Goal {
    pub cell: (usize, usize),
    pub center: Point2D,
    pub tolerance: f32,
}

impl Goal {
    pub fn reached_by(&self, pose: &Pose2D) -> bool {
        pose.distance_to(&self.center) <= self.tolerance
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    GoalReached,
    TimedOut,
    Faulted { error: String },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::GoalReached)
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::GoalReached => write!(f, "goal reached"),
            RunOutcome::TimedOut => write!(f, "timed out"),
            RunOutcome::Faulted { error } => write!(f, "faulted: {error}"),
        }
    }
}

/// Per-run counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunDiagnostics {
    pub scan_match_accepted: u64,
    pub scan_match_rejected: u64,
    pub replans: u64,
    pub no_route_events: u64,
    pub budget_overruns: u64,
    pub final_pose: Option<Pose2D>,
    pub final_ground_truth: Option<Pose2D>,
}

/// Result of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub seed: u64,
    pub outcome: RunOutcome,
    pub steps: u64,
    #[serde(rename = "elapsed_s", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    pub diagnostics: RunDiagnostics,
}

impl RunReport {
    /// Report for a run that failed before or outside the loop.
    pub fn faulted(seed: u64, error: impl ToString, elapsed: Duration) -> Self {
        Self {
            seed,
            outcome: RunOutcome::Faulted {
                error: error.to_string(),
            },
            steps: 0,
            elapsed,
            diagnostics: RunDiagnostics::default(),
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome.is_success()
    }
}

fn serialize_secs<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Mutable state owned by one run.
#[derive(Debug, Clone)]
pub struct RunState {
    /// Trusted pose; after `act` it holds the post-motion estimate.
    pub pose: Pose2D,
    pub step: u64,
    /// Previous point set and the pose it was projected under, same tick.
    pub previous: Option<(PointCloud2D, Pose2D)>,
    pub map: OccupancyGrid,
    pub cspace: CSpace,
    /// Map occupied revision the c-space was built from.
    pub cspace_revision: u64,
    pub path: Path,
    pub diagnostics: RunDiagnostics,
}

/// What happened during one tick.
#[derive(Debug, Clone)]
pub struct TickRecord {
    pub step: u64,
    pub raw_pose: Pose2D,
    pub matched: ScanMatchResult,
    pub fused: FusedPose,
    pub integration: IntegrationStats,
    pub replanned: Option<ReplanReason>,
    pub setpoint: Setpoint,
    pub pose_after: Pose2D,
    pub arrived: bool,
    pub duration: Duration,
}

/// Runs the loop for one robot.
pub struct Orchestrator<'a, R: RobotInterface> {
    config: &'a Config,
    robot: R,
    goal: Goal,
    base_cspace: CSpace,
    preprocessor: ScanPreprocessor,
    matcher: DynMatcher,
    fusion: PoseFusion,
    integrator: MapIntegrator,
    planner: AStarPlanner,
    controller: PurePursuitController,
    replan: ReplanPolicy,
    state: RunState,
}

impl<'a, R: RobotInterface> Orchestrator<'a, R> {
    pub fn new(config: &'a Config, robot: R, init: NavigationInit, map: OccupancyGrid) -> Self {
        // Longest lidar ray in map cells, plus the endpoint cell
        let ray_cells = (config.simulation.lidar.max_range / map.resolution()).ceil() as usize + 2;
        let state = RunState {
            pose: init.start_pose,
            step: 0,
            previous: None,
            cspace_revision: map.occupied_revision(),
            map,
            cspace: init.base_cspace.clone(),
            path: init.path,
            diagnostics: RunDiagnostics::default(),
        };

        Self {
            config,
            robot,
            goal: init.goal,
            base_cspace: init.base_cspace,
            preprocessor: ScanPreprocessor::new(config.preprocessing.clone()),
            matcher: DynMatcher::new(&config.matching),
            fusion: PoseFusion::new(config.fusion.clone()),
            integrator: MapIntegrator::new(RayTracer::new(ray_cells)),
            planner: AStarPlanner::new(config.planning.clone()),
            controller: PurePursuitController::new(config.control.clone()),
            replan: ReplanPolicy::new(config.planning.deviation_tolerance),
            state,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn robot(&self) -> &R {
        &self.robot
    }

    pub fn goal(&self) -> &Goal {
        &self.goal
    }

    /// Run until the goal is reached, the time limit passes, or a fault.
    pub fn run(&mut self) -> RunReport {
        self.run_with_observer(|_| {})
    }

    /// Like [`run`](Self::run), calling `observer` after every completed tick.
    pub fn run_with_observer<F: FnMut(&TickRecord)>(&mut self, mut observer: F) -> RunReport {
        let config = self.config;
        let nav = &config.navigation;
        let time_limit = nav.time_limit();
        let tick_budget = nav.tick_budget();
        let seed = config.simulation.seed;
        let started = Instant::now();

        log::info!(
            "run start: seed={} mode={} matcher={} goal=({:.2}, {:.2})",
            seed,
            nav.mode,
            self.matcher.matcher_type(),
            self.goal.center.x,
            self.goal.center.y
        );

        let outcome = loop {
            if started.elapsed() >= time_limit
                || nav.max_steps.is_some_and(|max| self.state.step >= max)
            {
                break RunOutcome::TimedOut;
            }

            let record = match self.tick() {
                Ok(record) => record,
                Err(e) => {
                    log::error!("seed={} step={} fault: {}", seed, self.state.step, e);
                    break RunOutcome::Faulted {
                        error: e.to_string(),
                    };
                }
            };

            if record.duration > tick_budget {
                self.state.diagnostics.budget_overruns += 1;
                log::warn!(
                    "step {} took {:.1}ms, budget {:.1}ms",
                    record.step,
                    record.duration.as_secs_f64() * 1e3,
                    tick_budget.as_secs_f64() * 1e3
                );
            }

            observer(&record);

            if record.arrived {
                break RunOutcome::GoalReached;
            }
        };

        let elapsed = started.elapsed();
        self.state.diagnostics.final_pose = Some(self.state.pose);
        self.state.diagnostics.final_ground_truth = self.robot.ground_truth();

        log::info!(
            "run end: seed={} {} after {} steps in {:.1}s",
            seed,
            outcome,
            self.state.step,
            elapsed.as_secs_f64()
        );

        RunReport {
            seed,
            outcome,
            steps: self.state.step,
            elapsed,
            diagnostics: self.state.diagnostics.clone(),
        }
    }

    /// Execute one tick (everything after the timeout check).
    pub fn tick(&mut self) -> Result<TickRecord> {
        let tick_start = Instant::now();

        // Sense
        let raw_pose = self.robot.pose()?;
        let scan = self.robot.scan()?;

        // Preprocess + match + fuse
        let current = self.preprocessor.process(&scan, &raw_pose);
        let previous = self.state.previous.as_ref().map(|(points, _)| points);
        let matched = self.matcher.match_step(previous, &current);
        let fused = self.fusion.fuse(&raw_pose, &matched);

        if fused.is_scan_matched() {
            self.state.diagnostics.scan_match_accepted += 1;
        } else if matched.is_computed() {
            self.state.diagnostics.scan_match_rejected += 1;
        }

        // Previous generation: points re-projected under the trusted pose
        let stored = if fused.is_scan_matched() {
            self.preprocessor.process(&scan, &fused.pose)
        } else {
            current
        };
        self.state.previous = Some((stored, fused.pose));
        self.state.pose = fused.pose;

        // Map
        let integration = self
            .integrator
            .integrate_scan(&mut self.state.map, &scan, &fused.pose);

        // Plan
        let replanned = self.update_path()?;

        // Control + act
        let setpoint = self.controller.compute(&self.state.pose, &self.state.path);
        let pose_after = self.robot.apply(&self.state.pose, &setpoint)?;
        self.state.pose = pose_after;
        self.state.step += 1;

        let arrived = self.goal.reached_by(&pose_after);

        log::debug!(
            "step {}: raw=({:.2}, {:.2}, {:.2}) fused={:?} cmd=({:.2}, {:.2}) rmse={:?}",
            self.state.step,
            raw_pose.x,
            raw_pose.y,
            raw_pose.theta,
            fused.source,
            setpoint.linear,
            setpoint.angular,
            matched.rmse
        );

        Ok(TickRecord {
            step: self.state.step,
            raw_pose,
            matched,
            fused,
            integration,
            replanned,
            setpoint,
            pose_after,
            arrived,
            duration: tick_start.elapsed(),
        })
    }

    /// Rebuild the c-space on a map revision change, then replan if the
    /// policy asks for it. A missing route is recovered here, never raised.
    fn update_path(&mut self) -> Result<Option<ReplanReason>> {
        let revision = self.state.map.occupied_revision();
        let rebuilt = revision != self.state.cspace_revision;
        if rebuilt {
            let mut cspace = self.base_cspace.clone();
            cspace.add_occupied(&self.state.map);
            self.state.cspace = cspace;
            self.state.cspace_revision = revision;
        }

        let pose = self.state.pose;
        let Some(reason) = self
            .replan
            .evaluate(&pose, &self.state.path, &self.state.cspace, rebuilt)
        else {
            return Ok(None);
        };

        let cell = self.state.cspace.world_to_cell(pose.x, pose.y);
        if !self.replan.should_attempt(self.state.cspace_revision, cell) {
            return Ok(None);
        }

        match self
            .planner
            .plan(&self.state.cspace, pose.position(), self.goal.center)
        {
            Ok(path) => {
                log::debug!(
                    "replanned ({}): {} waypoints, {:.2}m",
                    reason,
                    path.len(),
                    path.total_length
                );
                self.state.path = path;
                self.state.diagnostics.replans += 1;
                self.replan.record_success();
                Ok(Some(reason))
            }
            Err(e) if e.is_no_route() => {
                self.state.diagnostics.no_route_events += 1;
                self.replan.record_failure(self.state.cspace_revision, cell);
                let keep = self
                    .replan
                    .retain_on_no_route(&pose, &self.state.path, &self.state.cspace);
                log::warn!(
                    "replan ({}) failed: {}; {}",
                    reason,
                    e,
                    if keep { "keeping path" } else { "stopping" }
                );
                if !keep {
                    self.state.path = Path::empty();
                }
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
