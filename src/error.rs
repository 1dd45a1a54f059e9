//! Crate-level error type

use crate::config::ConfigError;
use crate::map::MapError;
use crate::navigation::PlannerError;
use crate::render::ViewerError;

/// Errors that stop the harness before or during a run
///
/// A rejected move is not an error: it ends the run with an unsuccessful
/// [`RunOutcome`](crate::harness::RunOutcome).
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error(transparent)]
    Map(#[from] MapError),

    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error(transparent)]
    Viewer(#[from] ViewerError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
