//! Navigation module: the planners the harness can drive
pub mod greedy;
pub mod planner;
pub mod rrt_star;

pub use self::greedy::GreedyPlanner;
pub use self::planner::{MotionPlanner, PlannerError};
pub use self::rrt_star::{RrtStarConfig, RrtStarPlanner};

use crate::map::VoxelMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Planners available to the harness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerKind {
    Greedy,
    #[default]
    RrtStar,
}

impl PlannerKind {
    /// Build and configure a planner of this kind for `map`
    pub fn build(
        self,
        map: Arc<VoxelMap>,
        params: &HashMap<String, f64>,
    ) -> Result<Box<dyn MotionPlanner>, PlannerError> {
        let mut planner: Box<dyn MotionPlanner> = match self {
            PlannerKind::Greedy => Box::new(GreedyPlanner::new(map)),
            PlannerKind::RrtStar => Box::new(RrtStarPlanner::new(map)),
        };
        planner.configure(params)?;
        Ok(planner)
    }
}

impl fmt::Display for PlannerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannerKind::Greedy => write!(f, "greedy"),
            PlannerKind::RrtStar => write!(f, "rrt_star"),
        }
    }
}

impl FromStr for PlannerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "greedy" => Ok(PlannerKind::Greedy),
            "rrt_star" | "rrtstar" | "rrt*" => Ok(PlannerKind::RrtStar),
            other => Err(format!("unknown planner '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::parse_map;

    #[test]
    fn test_parse_planner_kind() {
        assert_eq!("greedy".parse::<PlannerKind>(), Ok(PlannerKind::Greedy));
        assert_eq!("rrt-star".parse::<PlannerKind>(), Ok(PlannerKind::RrtStar));
        assert_eq!("RRT*".parse::<PlannerKind>(), Ok(PlannerKind::RrtStar));
        assert!("astar".parse::<PlannerKind>().is_err());
    }

    #[test]
    fn test_build_applies_params() {
        let map = Arc::new(parse_map("boundary 0 0 0 10 10 10 0 0 0\n").unwrap());
        let mut params = HashMap::new();
        params.insert("step_size".to_string(), 3.0);
        assert!(PlannerKind::Greedy.build(Arc::clone(&map), &params).is_err());

        params.insert("step_size".to_string(), 0.5);
        let planner = PlannerKind::RrtStar.build(map, &params).unwrap();
        assert_eq!(planner.name(), "RrtStarPlanner");
    }
}
