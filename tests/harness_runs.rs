//! End-to-end runs of the harness against the shipped maps

#![allow(clippy::unwrap_used)]

use nalgebra::{distance, Point3};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use voxel_nav::render::{NullViewer, TrajectoryRecorder};
use voxel_nav::validation::{goal_reached, GOAL_REACHED_SQ, MAX_STEP};
use voxel_nav::{
    run_test, HarnessConfig, NavigationHarness, PlannerKind, RunOptions, Termination, VoxelMap,
};

fn asset(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(relative)
}

fn seeded_params(seed: f64) -> HashMap<String, f64> {
    let mut params = HashMap::new();
    params.insert("seed".to_string(), seed);
    params.insert("max_iterations".to_string(), 3000.0);
    params
}

/// Checks every accepted move against the map rules
fn assert_valid_trajectory(map: &VoxelMap, start: Point3<f64>, positions: &[Point3<f64>]) {
    let mut previous = start;
    for p in positions {
        assert!(map.in_bounds(p), "{p:?} left the boundary");
        assert!(distance(&previous, p) <= MAX_STEP, "step to {p:?} too long");
        assert!(map.colliding_block(p).is_none(), "{p:?} is inside a block");
        previous = *p;
    }
}

#[test]
fn rrt_star_solves_single_cube() {
    let map_file = asset("maps/single_cube.txt");
    let map = VoxelMap::load(&map_file).unwrap();
    let start = Point3::new(2.3, 2.3, 1.3);
    let goal = Point3::new(7.0, 7.0, 6.0);

    let mut recorder = TrajectoryRecorder::new();
    let outcome = run_test(
        &map_file,
        &start,
        &goal,
        PlannerKind::RrtStar,
        &seeded_params(11.0),
        &RunOptions::headless(),
        &mut recorder,
    )
    .unwrap();

    assert!(outcome.success, "run ended with {:?}", outcome.termination);
    assert!(matches!(outcome.termination, Termination::GoalReached));
    assert_eq!(outcome.num_moves, recorder.positions().len());
    assert_valid_trajectory(&map, start, recorder.positions());

    // The run stops at the first position within reach of the goal
    let last = recorder.positions().last().unwrap();
    assert!((last - goal).norm_squared() <= GOAL_REACHED_SQ);
    let before_last = &recorder.positions()[..recorder.positions().len() - 1];
    assert!(before_last.iter().all(|p| !goal_reached(p, &goal)));

    let scene = recorder.scene().unwrap();
    assert_eq!(scene.blocks.faces.len(), 6);
    assert_eq!(scene.start.position, start);
}

#[test]
fn rrt_star_threads_the_pillars() {
    let config = HarnessConfig::load(asset("config/harness.toml")).unwrap();
    let scenario = config.scenario("pillars").unwrap();
    let map = Arc::new(VoxelMap::load(asset("maps").join(&scenario.map)).unwrap());

    let planner = PlannerKind::RrtStar
        .build(Arc::clone(&map), &seeded_params(5.0))
        .unwrap();
    let mut harness = NavigationHarness::new(Arc::clone(&map), planner);
    let mut recorder = TrajectoryRecorder::new();
    let outcome = harness
        .run(
            &scenario.start(),
            &scenario.goal(),
            &RunOptions::headless().with_max_moves(1_000),
            &mut recorder,
        )
        .unwrap();

    assert!(outcome.success, "run ended with {:?}", outcome.termination);
    assert_valid_trajectory(&map, scenario.start(), recorder.positions());
}

#[test]
fn greedy_crosses_open_space() {
    let map = Arc::new(
        "boundary 0 0 0 10 10 10 120 120 120\n"
            .parse::<VoxelMap>()
            .unwrap(),
    );
    let planner = PlannerKind::Greedy
        .build(Arc::clone(&map), &HashMap::new())
        .unwrap();
    let mut harness = NavigationHarness::new(Arc::clone(&map), planner);
    let start = Point3::new(1.0, 1.0, 1.0);
    let goal = Point3::new(8.0, 3.0, 5.0);

    let outcome = harness
        .run(&start, &goal, &RunOptions::headless().with_max_moves(200), &mut NullViewer)
        .unwrap();

    assert!(outcome.success);
    let positions: Vec<_> = outcome.trajectory().copied().collect();
    assert_valid_trajectory(&map, start, &positions);
    assert!(outcome.steps.iter().all(|step| step.move_time >= 1));
}

#[test]
fn greedy_stalls_behind_wall() {
    // A wall spanning the whole map leaves no way through
    let map = Arc::new(
        "boundary 0 0 0 10 10 10 0 0 0\nblock 5 -1 -1 6 11 11 0 0 0\n"
            .parse::<VoxelMap>()
            .unwrap(),
    );
    let planner = PlannerKind::Greedy
        .build(Arc::clone(&map), &HashMap::new())
        .unwrap();
    let mut harness = NavigationHarness::new(map, planner);

    let outcome = harness
        .run(
            &Point3::new(1.0, 5.0, 5.0),
            &Point3::new(9.0, 5.0, 5.0),
            &RunOptions::headless().with_max_moves(50),
            &mut NullViewer,
        )
        .unwrap();

    assert!(!outcome.success);
    assert!(matches!(outcome.termination, Termination::MoveLimit));
    assert!(outcome.trajectory().all(|p| p.x <= 5.0));
}

#[test]
fn shipped_config_parses() {
    let config = HarnessConfig::load(asset("config/harness.toml")).unwrap();
    assert_eq!(config.planner.kind, PlannerKind::RrtStar);
    assert!(config.run_options().is_ok());
    assert!(config.scenario("single_cube").is_ok());
}
