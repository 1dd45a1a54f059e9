//! Motion planner interface

use crate::common::types::Position;
use std::collections::HashMap;

/// Errors reported by a motion planner
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// Every candidate move leaves the map or hits a block.
    #[error("no valid move from {0:?}")]
    NoValidMove(Position),

    /// The search ended without reaching the goal.
    #[error("no path found from {start:?} to {goal:?} after {iterations} iterations")]
    NoPathFound {
        start: Position,
        goal: Position,
        iterations: usize,
    },

    /// The current position is not in free space.
    #[error("start position {0:?} is blocked")]
    StartBlocked(Position),

    /// A parameter passed to `configure` is out of range.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter { name: String, message: String },
}

impl PlannerError {
    pub fn invalid_parameter(name: &str, message: impl Into<String>) -> Self {
        PlannerError::InvalidParameter {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

/// Trait for planners driven by the harness one move at a time
pub trait MotionPlanner: Send {
    /// Next position to command, given where the robot is and where it should go
    fn next_position(&mut self, current: &Position, goal: &Position)
        -> Result<Position, PlannerError>;

    /// Get the name of this planner
    fn name(&self) -> &str;

    /// Configure the planner with parameters
    fn configure(&mut self, params: &HashMap<String, f64>) -> Result<(), PlannerError>;
}

/// Read a parameter that must lie in `(0, max]`
pub(crate) fn positive_param(
    params: &HashMap<String, f64>,
    name: &str,
    max: f64,
) -> Result<Option<f64>, PlannerError> {
    match params.get(name) {
        None => Ok(None),
        Some(&value) if value > 0.0 && value <= max => Ok(Some(value)),
        Some(&value) => Err(PlannerError::invalid_parameter(
            name,
            format!("{} is outside (0, {}]", value, max),
        )),
    }
}
