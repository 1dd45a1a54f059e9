//! Move validation
//!
//! Every commanded position is checked against three rules before the
//! robot is allowed to move: the step length, the map boundary and the
//! obstacle blocks. All rules are evaluated so that a rejected move
//! reports every violation at once.

use crate::common::types::Position;
use crate::map::VoxelMap;
use nalgebra::distance;
use std::fmt;

/// Longest displacement allowed in a single move
pub const MAX_STEP: f64 = 1.0;

/// Squared distance to the goal at which a run is considered complete
pub const GOAL_REACHED_SQ: f64 = 0.1;

/// A single broken movement rule
#[derive(Debug, Clone, PartialEq)]
pub enum MoveViolation {
    /// The commanded step is longer than [`MAX_STEP`].
    TooFast { distance: f64 },
    /// The commanded position lies outside the boundary.
    OutOfBounds { position: Position },
    /// The commanded position lies inside a block.
    Collision { block: usize },
}

impl MoveViolation {
    pub fn is_collision(&self) -> bool {
        matches!(self, MoveViolation::Collision { .. })
    }
}

impl fmt::Display for MoveViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveViolation::TooFast { distance } => {
                write!(f, "the robot cannot move so fast: {:.4}", distance)
            }
            MoveViolation::OutOfBounds { position } => write!(
                f,
                "out-of-map robot position commanded: ({:.3}, {:.3}, {:.3})",
                position.x, position.y, position.z
            ),
            MoveViolation::Collision { block } => {
                write!(f, "collision with block {}", block)
            }
        }
    }
}

/// A commanded move that broke at least one rule
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("move rejected: {}", summary(.violations))]
pub struct MoveRejection {
    pub violations: Vec<MoveViolation>,
}

impl MoveRejection {
    pub fn has_collision(&self) -> bool {
        self.violations.iter().any(MoveViolation::is_collision)
    }
}

fn summary(violations: &[MoveViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check a commanded move from `current` to `next`
pub fn validate_move(
    map: &VoxelMap,
    current: &Position,
    next: &Position,
) -> Result<(), MoveRejection> {
    let mut violations = Vec::new();

    let step = distance(current, next);
    if step > MAX_STEP {
        violations.push(MoveViolation::TooFast { distance: step });
    }

    if !map.in_bounds(next) {
        violations.push(MoveViolation::OutOfBounds { position: *next });
    }

    if let Some(block) = map.colliding_block(next) {
        violations.push(MoveViolation::Collision { block });
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(MoveRejection { violations })
    }
}

/// Check if a position is close enough to the goal to stop
pub fn goal_reached(position: &Position, goal: &Position) -> bool {
    (position - goal).norm_squared() <= GOAL_REACHED_SQ
}
