//! Greedy neighbourhood planner
//!
//! Looks one step ahead in the 26 directions of the 3x3x3 neighbourhood and
//! takes the valid step that ends closest to the goal. It has no memory, so
//! it can stall in front of concave obstacles; it is the baseline the RRT*
//! planner is compared against.

use super::planner::{positive_param, MotionPlanner, PlannerError};
use crate::common::types::Position;
use crate::map::VoxelMap;
use crate::validation::MAX_STEP;
use nalgebra::Vector3;
use std::collections::HashMap;
use std::sync::Arc;

/// Greedy one-step planner
#[derive(Debug)]
pub struct GreedyPlanner {
    map: Arc<VoxelMap>,
    step_size: f64,
    directions: Vec<Vector3<f64>>,
}

impl GreedyPlanner {
    pub fn new(map: Arc<VoxelMap>) -> Self {
        let directions = (-1..=1)
            .flat_map(|x| (-1..=1).flat_map(move |y| (-1..=1).map(move |z| (x, y, z))))
            .filter(|&d| d != (0, 0, 0))
            .map(|(x, y, z)| Vector3::new(x as f64, y as f64, z as f64).normalize())
            .collect();

        GreedyPlanner {
            map,
            step_size: 0.5,
            directions,
        }
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }
}

impl MotionPlanner for GreedyPlanner {
    fn next_position(
        &mut self,
        current: &Position,
        goal: &Position,
    ) -> Result<Position, PlannerError> {
        self.directions
            .iter()
            .map(|dir| current + dir * self.step_size)
            .filter(|candidate| self.map.is_free(candidate))
            .min_by(|a, b| {
                let da = (a - goal).norm_squared();
                let db = (b - goal).norm_squared();
                da.total_cmp(&db)
            })
            .ok_or(PlannerError::NoValidMove(*current))
    }

    fn name(&self) -> &str {
        "GreedyPlanner"
    }

    fn configure(&mut self, params: &HashMap<String, f64>) -> Result<(), PlannerError> {
        if let Some(step_size) = positive_param(params, "step_size", MAX_STEP)? {
            self.step_size = step_size;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::parse_map;
    use approx::assert_relative_eq;
    use nalgebra::{distance, Point3};

    fn planner(text: &str) -> GreedyPlanner {
        GreedyPlanner::new(Arc::new(parse_map(text).unwrap()))
    }

    #[test]
    fn test_has_26_unit_directions() {
        let p = planner("boundary 0 0 0 10 10 10 0 0 0\n");
        assert_eq!(p.directions.len(), 26);
        for dir in &p.directions {
            assert_relative_eq!(dir.norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_steps_toward_goal() {
        let mut p = planner("boundary 0 0 0 10 10 10 0 0 0\n");
        let start = Point3::new(1.0, 1.0, 1.0);
        let goal = Point3::new(9.0, 9.0, 9.0);
        let next = p.next_position(&start, &goal).unwrap();
        assert_relative_eq!(distance(&start, &next), 0.5, epsilon = 1e-12);
        assert!(next.x > start.x && next.y > start.y && next.z > start.z);
    }

    #[test]
    fn test_avoids_block() {
        let mut p = planner(
            "boundary 0 0 0 10 10 10 0 0 0\n\
             block 1.2 0 0 3 10 10 0 0 0\n",
        );
        let start = Point3::new(1.0, 5.0, 5.0);
        let goal = Point3::new(9.0, 5.0, 5.0);
        let next = p.next_position(&start, &goal).unwrap();
        assert!(p.map.is_free(&next));
    }

    #[test]
    fn test_no_valid_move() {
        let mut p = planner("boundary 0 0 0 0.1 0.1 0.1 0 0 0\n");
        let start = Point3::new(0.05, 0.05, 0.05);
        let err = p.next_position(&start, &Point3::new(0.1, 0.1, 0.1));
        assert!(matches!(err, Err(PlannerError::NoValidMove(_))));
    }

    #[test]
    fn test_configure_step_size() {
        let mut p = planner("boundary 0 0 0 10 10 10 0 0 0\n");
        let mut params = HashMap::new();
        params.insert("step_size".to_string(), 0.25);
        p.configure(&params).unwrap();
        assert_eq!(p.step_size(), 0.25);

        params.insert("step_size".to_string(), 1.5);
        assert!(p.configure(&params).is_err());
        assert_eq!(p.step_size(), 0.25);
    }
}
