//! Navigation Benchmarks
//!
//! CPU-heavy per-tick operations:
//! - Scan matching (P2P and P2L ICP) on a simulated maze scan
//! - Map integration (Bresenham ray tracing into the occupancy grid)
//! - A* planning over a Known-mode maze c-space
//! - One full loop tick
//!
//! Run with: `cargo bench`
//! View HTML reports in: `target/criterion/`

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use marga_nav::algorithms::mapping::MapIntegrator;
use marga_nav::algorithms::matching::{DynMatcher, MatcherType, MatchingConfig};
use marga_nav::algorithms::planning::AStarPlanner;
use marga_nav::config::{Config, ConfigOverrides};
use marga_nav::core::types::{LaserScan, Point2D, Pose2D};
use marga_nav::engine::initializer::base_cspace;
use marga_nav::engine::{Orchestrator, initialize, map_for_arena};
use marga_nav::io::RobotInterface;
use marga_nav::navigation::NavigationMode;
use marga_nav::sensors::ScanPreprocessor;
use marga_nav::sim::{Arena, SimulatedRobot};

// ============================================================================
// Fixtures
// ============================================================================

fn maze_scan(config: &Config, pose: Pose2D) -> LaserScan {
    let arena = Arena::from_config(&config.simulation);
    let mut robot = SimulatedRobot::new(&arena, &config.simulation, pose, 6);
    robot.scan().expect("simulated scan")
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_scan_matching(c: &mut Criterion) {
    let config = Config::default();
    let preprocessor = ScanPreprocessor::new(config.preprocessing.clone());
    let pose = Pose2D::new(2.5, 1.5, 0.3);
    let scan = maze_scan(&config, pose);
    let previous = preprocessor.process(&scan, &pose);
    let current = preprocessor.process(&scan, &Pose2D::new(2.53, 1.48, 0.32));

    let mut group = c.benchmark_group("scan_matching");
    for algorithm in [MatcherType::Icp, MatcherType::P2l] {
        let matcher = DynMatcher::new(&MatchingConfig {
            algorithm,
            ..Default::default()
        });
        group.bench_function(format!("{algorithm:?}").to_lowercase(), |b| {
            b.iter(|| matcher.match_step(Some(black_box(&previous)), black_box(&current)))
        });
    }
    group.finish();
}

fn bench_map_integration(c: &mut Criterion) {
    let config = Config::default();
    let arena = Arena::from_config(&config.simulation);
    let pose = Pose2D::new(2.5, 1.5, 0.3);
    let scan = maze_scan(&config, pose);
    let integrator = MapIntegrator::default();

    c.bench_function("map_integration/180_rays", |b| {
        b.iter_batched(
            || map_for_arena(&config.mapping, &arena),
            |mut map| integrator.integrate_scan(&mut map, black_box(&scan), &pose),
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_planning(c: &mut Criterion) {
    let config = Config::default().with_overrides(&ConfigOverrides {
        mode: Some(NavigationMode::Known),
        ..Default::default()
    });
    let arena = Arena::from_config(&config.simulation);
    let cspace = base_cspace(&arena, &config);
    let planner = AStarPlanner::new(config.planning.clone());
    let start = Point2D::new(0.5, 0.5);
    let goal = Point2D::new(5.5, 5.5);

    c.bench_function("astar/maze_6x6", |b| {
        b.iter(|| planner.plan(black_box(&cspace), start, goal))
    });
}

fn bench_loop_tick(c: &mut Criterion) {
    let config = Config::default();
    let arena = Arena::from_config(&config.simulation);
    let init = initialize(&arena, &config).expect("initial plan");

    c.bench_function("loop/tick", |b| {
        b.iter_batched(
            || {
                let robot = SimulatedRobot::new(&arena, &config.simulation, init.start_pose, 6);
                let map = map_for_arena(&config.mapping, &arena);
                let mut orchestrator = Orchestrator::new(&config, robot, init.clone(), map);
                // Prime the previous scan so the measured tick matches
                orchestrator.tick().expect("first tick");
                orchestrator
            },
            |mut orchestrator| orchestrator.tick().map(|r| r.step),
            criterion::BatchSize::LargeInput,
        )
    });
}

// ============================================================================
// Main
// ============================================================================

criterion_group!(
    benches,
    bench_scan_matching,
    bench_map_integration,
    bench_planning,
    bench_loop_tick,
);

criterion_main!(benches);
