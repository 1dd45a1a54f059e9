//! Planner test harness
//!
//! Drives a [`MotionPlanner`] one move at a time: ask for the next position,
//! check it against the map, move the robot, redraw, and stop at the goal or
//! at the first invalid move.

use crate::common::types::Position;
use crate::error::HarnessError;
use crate::map::VoxelMap;
use crate::navigation::{MotionPlanner, PlannerError, PlannerKind};
use crate::render::{Scene, Viewer};
use crate::validation::{goal_reached, validate_move, MoveRejection};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Options controlling a single run
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Pause after every accepted move.
    pub delay: Option<Duration>,
    /// Pause after a collision before the run ends.
    pub collision_pause: Option<Duration>,
    /// Give up after this many accepted moves.
    pub max_moves: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            delay: None,
            collision_pause: Some(Duration::from_secs(5)),
            max_moves: None,
        }
    }
}

impl RunOptions {
    /// Options with no pauses, for headless and batch runs
    pub fn headless() -> Self {
        RunOptions {
            delay: None,
            collision_pause: None,
            max_moves: None,
        }
    }

    pub fn with_max_moves(mut self, max_moves: usize) -> Self {
        self.max_moves = Some(max_moves);
        self
    }
}

/// Why a run stopped
#[derive(Debug)]
pub enum Termination {
    GoalReached,
    Rejected(MoveRejection),
    PlannerFailed(PlannerError),
    MoveLimit,
}

/// One accepted move
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub index: usize,
    pub position: Position,
    pub computation_time: Duration,
    /// Simulated duration of the move in whole seconds.
    pub move_time: u64,
}

/// Result of a run
#[derive(Debug)]
pub struct RunOutcome {
    pub success: bool,
    pub num_moves: usize,
    pub termination: Termination,
    pub steps: Vec<StepRecord>,
}

impl RunOutcome {
    /// Accepted robot positions, start excluded
    pub fn trajectory(&self) -> impl Iterator<Item = &Position> + '_ {
        self.steps.iter().map(|step| &step.position)
    }
}

/// Move time charged for a planning call: half the computation time rounded
/// up, and never less than one second
pub fn move_time(computation_time: Duration) -> u64 {
    let half = (computation_time.as_secs_f64() / 2.0).ceil() as u64;
    half.max(1)
}

/// Runs a planner against a map
pub struct NavigationHarness {
    map: Arc<VoxelMap>,
    planner: Box<dyn MotionPlanner>,
}

impl NavigationHarness {
    pub fn new(map: Arc<VoxelMap>, planner: Box<dyn MotionPlanner>) -> Self {
        NavigationHarness { map, planner }
    }

    pub fn map(&self) -> &VoxelMap {
        &self.map
    }

    /// Get the name of the planner under test
    pub fn planner_name(&self) -> &str {
        self.planner.name()
    }

    /// Drive the robot from `start` toward `goal`
    pub fn run(
        &mut self,
        start: &Position,
        goal: &Position,
        options: &RunOptions,
        viewer: &mut dyn Viewer,
    ) -> Result<RunOutcome, HarnessError> {
        info!(
            planner = self.planner.name(),
            viewer = viewer.name(),
            start = ?start,
            goal = ?goal,
            "Starting run"
        );
        viewer.draw_scene(&Scene::new(&self.map, start, goal))?;

        let mut robot = *start;
        let mut steps: Vec<StepRecord> = Vec::new();

        let (success, termination) = loop {
            if let Some(limit) = options.max_moves {
                if steps.len() >= limit {
                    warn!(limit, "Move limit reached before the goal");
                    break (false, Termination::MoveLimit);
                }
            }

            let t0 = Instant::now();
            let planned = self.planner.next_position(&robot, goal);
            let computation_time = t0.elapsed();
            let move_time = move_time(computation_time);
            info!(
                computation_time = format!("{:.6}", computation_time.as_secs_f64()),
                move_time, "Planner call finished"
            );

            let next = match planned {
                Ok(next) => next,
                Err(e) => {
                    error!(error = %e, "Planner failed");
                    break (false, Termination::PlannerFailed(e));
                }
            };
            info!(x = next.x, y = next.y, z = next.z, "New robot position");

            if let Err(rejection) = validate_move(&self.map, &robot, &next) {
                for violation in &rejection.violations {
                    error!("ERROR: {}", violation);
                }
                if rejection.has_collision() {
                    if let Some(pause) = options.collision_pause {
                        thread::sleep(pause);
                    }
                }
                break (false, Termination::Rejected(rejection));
            }

            robot = next;
            steps.push(StepRecord {
                index: steps.len(),
                position: robot,
                computation_time,
                move_time,
            });
            viewer.update_robot(&robot)?;

            if goal_reached(&robot, goal) {
                break (true, Termination::GoalReached);
            }

            if let Some(delay) = options.delay {
                thread::sleep(delay);
            }
        };

        info!(success, moves = steps.len(), "Run finished");
        Ok(RunOutcome {
            success,
            num_moves: steps.len(),
            termination,
            steps,
        })
    }
}

/// Load a map file, build the requested planner and run it
pub fn run_test<P: AsRef<Path>>(
    map_file: P,
    start: &Position,
    goal: &Position,
    planner: PlannerKind,
    params: &HashMap<String, f64>,
    options: &RunOptions,
    viewer: &mut dyn Viewer,
) -> Result<RunOutcome, HarnessError> {
    let map = Arc::new(VoxelMap::load(map_file)?);
    let planner = planner.build(Arc::clone(&map), params)?;
    NavigationHarness::new(map, planner).run(start, goal, options, viewer)
}
