//! Test harness for robot motion planners on voxel maps
//!
//! A map file describes a boundary box and a set of obstacle blocks. The
//! harness asks a [`MotionPlanner`](navigation::MotionPlanner) for one move at
//! a time, validates each move against the map, and animates the accepted
//! moves through a [`Viewer`](render::Viewer).
pub mod common;
pub mod config;
pub mod error;
pub mod harness;
pub mod map;
pub mod navigation;
pub mod render;
pub mod validation;

pub use crate::config::{HarnessConfig, Scenario};
pub use crate::error::HarnessError;
pub use crate::harness::{run_test, NavigationHarness, RunOptions, RunOutcome, Termination};
pub use crate::map::VoxelMap;
pub use crate::navigation::{MotionPlanner, PlannerKind};
