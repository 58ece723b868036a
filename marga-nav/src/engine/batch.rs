//! Batch driver: one independent run per seed.
//!
//! Each run owns its arena, robot, map, and state. Runs execute in waves of
//! `jobs` scoped threads; a panicking run is caught at join and reported as
//! faulted, with the steps it completed, without stopping its siblings.

use std::any::Any;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Instant;

use serde::Serialize;

use super::initializer::{initialize, map_for_arena};
use super::run::{Orchestrator, RunReport, TickRecord};
use crate::config::{Config, ConfigOverrides};
use crate::error::Result;
use crate::sim::{Arena, SimulatedRobot};

/// Reports for every seed, in seed order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub runs: Vec<RunReport>,
}

impl BatchReport {
    /// Aggregate status: every seed reached its goal.
    pub fn all_passed(&self) -> bool {
        !self.runs.is_empty() && self.runs.iter().all(RunReport::passed)
    }

    pub fn passed_count(&self) -> usize {
        self.runs.iter().filter(|r| r.passed()).count()
    }

    /// Write the report as pretty JSON.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

/// Run one seed end to end. `config` already carries the seed.
///
/// Never panics on setup failure; the error becomes a faulted report.
pub fn run_seed(config: &Config) -> RunReport {
    run_seed_with_observer(config, |_| {})
}

/// Like [`run_seed`], calling `observer` after every completed tick.
pub fn run_seed_with_observer<F: FnMut(&TickRecord)>(config: &Config, observer: F) -> RunReport {
    let started = Instant::now();
    let seed = config.simulation.seed;

    let setup = || -> Result<_> {
        config.validate()?;
        let arena = Arena::from_config(&config.simulation);
        let init = initialize(&arena, config)?;
        let robot = SimulatedRobot::new(&arena, &config.simulation, init.start_pose, seed);
        let map = map_for_arena(&config.mapping, &arena);
        Ok(Orchestrator::new(config, robot, init, map))
    };

    match setup() {
        Ok(mut orchestrator) => orchestrator.run_with_observer(observer),
        Err(e) => {
            log::error!("seed={} setup failed: {}", seed, e);
            RunReport::faulted(seed, e, started.elapsed())
        }
    }
}

/// Run every seed with `overrides` applied on top of `base`.
pub fn run_batch(
    base: &Config,
    seeds: &[u64],
    overrides: &ConfigOverrides,
    jobs: usize,
) -> BatchReport {
    let configs: Vec<Config> = seeds
        .iter()
        .map(|&seed| {
            base.with_overrides(&ConfigOverrides {
                seed: Some(seed),
                ..overrides.clone()
            })
        })
        .collect();

    let mut runs = Vec::with_capacity(configs.len());
    for wave in configs.chunks(jobs.max(1)) {
        let progress: Vec<AtomicU64> = wave.iter().map(|_| AtomicU64::new(0)).collect();
        thread::scope(|scope| {
            let handles: Vec<_> = wave
                .iter()
                .zip(&progress)
                .map(|(config, steps)| {
                    let started = Instant::now();
                    let handle = scope.spawn(move || {
                        run_seed_with_observer(config, |record| {
                            steps.store(record.step, Ordering::Relaxed)
                        })
                    });
                    (config.simulation.seed, started, steps, handle)
                })
                .collect();

            for (seed, started, steps, handle) in handles {
                runs.push(collect_report(seed, handle.join(), steps, started));
            }
        });
    }

    BatchReport { runs }
}

/// Turn a joined run into its report. A panic becomes a faulted report that
/// keeps the last completed step and the time spent.
fn collect_report(
    seed: u64,
    joined: thread::Result<RunReport>,
    steps: &AtomicU64,
    started: Instant,
) -> RunReport {
    joined.unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        log::error!("seed={} panicked: {}", seed, message);
        RunReport {
            steps: steps.load(Ordering::Relaxed),
            ..RunReport::faulted(seed, format!("panic: {message}"), started.elapsed())
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::run::RunOutcome;
    use std::time::Duration;

    #[test]
    fn test_invalid_config_is_faulted() {
        let mut config = Config::default();
        config.planning.sample_step = 0.0;
        let report = run_seed(&config);
        assert!(matches!(report.outcome, RunOutcome::Faulted { .. }));
        assert_eq!(report.steps, 0);
    }

    #[test]
    fn test_batch_keeps_seed_order() {
        let overrides = ConfigOverrides {
            max_steps: Some(3),
            ..Default::default()
        };
        let report = run_batch(&Config::default(), &[463, 6, 243], &overrides, 2);
        let seeds: Vec<u64> = report.runs.iter().map(|r| r.seed).collect();
        assert_eq!(seeds, vec![463, 6, 243]);
        assert!(report.runs.iter().all(|r| r.outcome == RunOutcome::TimedOut));
        assert!(!report.all_passed());
        assert_eq!(report.passed_count(), 0);
    }

    #[test]
    fn test_empty_batch_does_not_pass() {
        let report = run_batch(&Config::default(), &[], &ConfigOverrides::default(), 1);
        assert!(!report.all_passed());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("bad state");
        assert_eq!(panic_message(payload.as_ref()), "bad state");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
    }

    #[test]
    fn test_panicked_run_keeps_progress() {
        let steps = AtomicU64::new(0);
        let started = Instant::now();
        let joined = thread::scope(|scope| {
            scope
                .spawn(|| -> RunReport {
                    steps.store(7, Ordering::Relaxed);
                    std::thread::sleep(Duration::from_millis(5));
                    panic!("map exploded")
                })
                .join()
        });

        let report = collect_report(243, joined, &steps, started);
        assert_eq!(report.seed, 243);
        assert_eq!(report.steps, 7);
        assert!(report.elapsed >= Duration::from_millis(5));
        match report.outcome {
            RunOutcome::Faulted { error } => assert_eq!(error, "panic: map exploded"),
            other => panic!("expected fault, got {other:?}"),
        }
    }

    #[test]
    fn test_observer_sees_every_step() {
        let mut config = Config::default();
        config.navigation.max_steps = Some(5);
        let mut seen = Vec::new();
        let report = run_seed_with_observer(&config, |record| seen.push(record.step));
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
        assert_eq!(report.steps, 5);
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = BatchReport {
            runs: vec![RunReport::faulted(6, "x", Duration::ZERO)],
        };
        report.write_json(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"seed\": 6"));
    }
}
