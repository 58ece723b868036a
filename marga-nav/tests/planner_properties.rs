//! Planner behaviour over arena-derived configuration spaces.

use marga_nav::algorithms::planning::{AStarConfig, AStarPlanner, CSpace, PlanningError};
use marga_nav::config::{Config, ConfigOverrides};
use marga_nav::core::types::Point2D;
use marga_nav::engine::initialize;
use marga_nav::engine::initializer::base_cspace;
use marga_nav::navigation::NavigationMode;
use marga_nav::sim::Arena;

fn known_mode() -> Config {
    Config::default().with_overrides(&ConfigOverrides {
        mode: Some(NavigationMode::Known),
        ..Default::default()
    })
}

#[test]
fn test_every_reference_maze_has_a_route() {
    let config = known_mode();
    for seed in [6, 243, 463] {
        let arena = Arena::maze(6, 1.0, 0.05, seed);
        let init = initialize(&arena, &config).unwrap();
        assert!(init.base_cspace.path_is_clear(&init.path, 0), "seed {seed}");
        let last = init.path.last().unwrap();
        assert_eq!((last.x, last.y), (5.5, 5.5));
    }
}

#[test]
fn test_open_arena_route_is_short() {
    let config = known_mode();
    let arena = Arena::open(6, 1.0, 0.05);
    let cspace = base_cspace(&arena, &config);
    let planner = AStarPlanner::new(config.planning.clone());

    let path = planner
        .plan(&cspace, Point2D::new(0.5, 0.5), Point2D::new(5.5, 5.5))
        .unwrap();
    let straight = 5.0 * std::f32::consts::SQRT_2;
    assert!(path.total_length < straight + 0.1);
}

#[test]
fn test_walled_off_goal_has_no_route() {
    let config = AStarConfig::default();
    let mut cspace = CSpace::new((0.0, 0.0), 4.0, 4.0, config.sample_step, config.inflation_radius());
    // Square box of wall points around the goal
    let mut t = 2.5;
    while t <= 3.9 {
        cspace.add_obstacle(t, 2.5);
        cspace.add_obstacle(t, 3.9);
        cspace.add_obstacle(2.5, t);
        cspace.add_obstacle(3.9, t);
        t += 0.05;
    }

    let result = AStarPlanner::new(config).plan(&cspace, Point2D::new(0.5, 0.5), Point2D::new(3.2, 3.2));
    assert_eq!(result, Err(PlanningError::NoRoute));
}

#[test]
fn test_replanning_same_inputs_is_deterministic() {
    let config = known_mode();
    let arena = Arena::maze(6, 1.0, 0.05, 463);
    let cspace = base_cspace(&arena, &config);
    let planner = AStarPlanner::new(config.planning.clone());

    let a = planner.plan(&cspace, Point2D::new(2.4, 3.6), Point2D::new(5.5, 5.5));
    let b = planner.plan(&cspace, Point2D::new(2.4, 3.6), Point2D::new(5.5, 5.5));
    assert_eq!(a, b);
}
