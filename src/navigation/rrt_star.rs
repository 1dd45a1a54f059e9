//! RRT* sampling planner
//!
//! Grows an asymptotically optimal random tree from the robot position to the
//! goal, then hands the resulting waypoints out one move at a time. The tree
//! is rebuilt whenever the goal changes or the robot is not where the last
//! waypoint put it.

use super::planner::{positive_param, MotionPlanner, PlannerError};
use crate::common::types::Position;
use crate::map::VoxelMap;
use crate::validation::MAX_STEP;
use nalgebra::{distance, Point3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Tolerance used to decide whether the robot followed the cached path
const WAYPOINT_EPSILON: f64 = 1e-9;

/// Largest seed that survives the `f64` parameter map unchanged
pub const MAX_EXACT_SEED: u64 = 1 << 53;

/// RRT* parameters
#[derive(Debug, Clone, PartialEq)]
pub struct RrtStarConfig {
    /// Maximum number of samples drawn per plan.
    pub max_iterations: usize,
    /// Longest edge added to the tree.
    pub step_size: f64,
    /// Probability of sampling the goal directly.
    pub goal_bias: f64,
    /// Neighbourhood used for choosing parents and rewiring. Tree edges
    /// become moves, so it never reaches past [`MAX_STEP`].
    pub rewire_radius: f64,
    /// Distance at which a node may connect straight to the goal.
    pub goal_tolerance: f64,
    /// Spacing of collision samples along an edge.
    pub collision_resolution: f64,
    /// Stop refining as soon as the goal is connected.
    pub stop_at_first_solution: bool,
    /// Random seed for reproducible plans.
    pub seed: Option<u64>,
}

impl Default for RrtStarConfig {
    fn default() -> Self {
        RrtStarConfig {
            max_iterations: 5_000,
            step_size: 0.5,
            goal_bias: 0.1,
            rewire_radius: MAX_STEP,
            goal_tolerance: 0.5,
            collision_resolution: 0.05,
            stop_at_first_solution: false,
            seed: None,
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    position: Position,
    parent: Option<usize>,
    children: Vec<usize>,
    cost: f64,
}

/// A tree search over free space
struct Tree<'a> {
    map: &'a VoxelMap,
    config: &'a RrtStarConfig,
    nodes: Vec<Node>,
}

impl<'a> Tree<'a> {
    fn new(map: &'a VoxelMap, config: &'a RrtStarConfig, root: Position) -> Self {
        Tree {
            map,
            config,
            nodes: vec![Node {
                position: root,
                parent: None,
                children: Vec::new(),
                cost: 0.0,
            }],
        }
    }

    fn edge_is_free(&self, a: &Position, b: &Position) -> bool {
        self.map
            .segment_is_free(a, b, self.config.collision_resolution)
    }

    fn nearest(&self, target: &Position) -> usize {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (idx, node) in self.nodes.iter().enumerate() {
            let d = (node.position - target).norm_squared();
            if d < best_dist {
                best_dist = d;
                best = idx;
            }
        }
        best
    }

    fn near(&self, target: &Position) -> Vec<usize> {
        let radius = self.config.rewire_radius.min(MAX_STEP);
        let radius_sq = radius * radius;
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| (node.position - target).norm_squared() <= radius_sq)
            .map(|(idx, _)| idx)
            .collect()
    }

    fn steer(&self, from: &Position, to: &Position) -> Position {
        let delta = to - from;
        let length = delta.norm();
        if length <= self.config.step_size {
            *to
        } else {
            from + delta * (self.config.step_size / length)
        }
    }

    /// Add a sample to the tree, returning the index of the new node
    fn extend(&mut self, sample: &Position) -> Option<usize> {
        let nearest = self.nearest(sample);
        let new_pos = self.steer(&self.nodes[nearest].position, sample);
        if distance(&self.nodes[nearest].position, &new_pos) <= f64::EPSILON {
            return None;
        }
        if !self.edge_is_free(&self.nodes[nearest].position, &new_pos) {
            return None;
        }

        let neighbours = self.near(&new_pos);

        // Choose the cheapest collision-free parent
        let mut parent = nearest;
        let mut cost = self.nodes[nearest].cost + distance(&self.nodes[nearest].position, &new_pos);
        for &idx in &neighbours {
            let candidate = self.nodes[idx].cost + distance(&self.nodes[idx].position, &new_pos);
            if candidate < cost && self.edge_is_free(&self.nodes[idx].position, &new_pos) {
                parent = idx;
                cost = candidate;
            }
        }

        let new_idx = self.nodes.len();
        self.nodes.push(Node {
            position: new_pos,
            parent: Some(parent),
            children: Vec::new(),
            cost,
        });
        self.nodes[parent].children.push(new_idx);

        // Rewire neighbours through the new node when that is cheaper
        for &idx in &neighbours {
            if idx == parent {
                continue;
            }
            let through_new = cost + distance(&new_pos, &self.nodes[idx].position);
            if through_new < self.nodes[idx].cost
                && self.edge_is_free(&new_pos, &self.nodes[idx].position)
            {
                self.reparent(idx, new_idx, through_new);
            }
        }

        Some(new_idx)
    }

    fn reparent(&mut self, idx: usize, new_parent: usize, new_cost: f64) {
        if let Some(old_parent) = self.nodes[idx].parent {
            self.nodes[old_parent].children.retain(|&child| child != idx);
        }
        self.nodes[idx].parent = Some(new_parent);
        self.nodes[new_parent].children.push(idx);

        let delta = new_cost - self.nodes[idx].cost;
        let mut stack = vec![idx];
        while let Some(current) = stack.pop() {
            self.nodes[current].cost += delta;
            stack.extend(self.nodes[current].children.iter().copied());
        }
    }

    /// Root-to-node positions
    fn path_to(&self, idx: usize) -> Vec<Position> {
        let mut path = Vec::new();
        let mut cursor = Some(idx);
        while let Some(current) = cursor {
            path.push(self.nodes[current].position);
            cursor = self.nodes[current].parent;
        }
        path.reverse();
        path
    }
}

/// RRT* planner handing out one waypoint per call
pub struct RrtStarPlanner {
    map: Arc<VoxelMap>,
    config: RrtStarConfig,
    rng: StdRng,
    waypoints: Vec<Position>,
    cursor: usize,
    planned_goal: Option<Position>,
}

impl RrtStarPlanner {
    pub fn new(map: Arc<VoxelMap>) -> Self {
        Self::with_config(map, RrtStarConfig::default())
    }

    pub fn with_config(map: Arc<VoxelMap>, config: RrtStarConfig) -> Self {
        let rng = Self::make_rng(config.seed);
        RrtStarPlanner {
            map,
            config,
            rng,
            waypoints: Vec::new(),
            cursor: 0,
            planned_goal: None,
        }
    }

    fn make_rng(seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    pub fn config(&self) -> &RrtStarConfig {
        &self.config
    }

    /// The waypoints of the current plan, start included
    pub fn waypoints(&self) -> &[Position] {
        &self.waypoints
    }

    /// Run a full RRT* search from `start` to `goal`
    pub fn plan(&mut self, start: &Position, goal: &Position) -> Result<Vec<Position>, PlannerError> {
        if !self.map.is_free(start) {
            return Err(PlannerError::StartBlocked(*start));
        }

        let map = Arc::clone(&self.map);
        let config = self.config.clone();
        let mut tree = Tree::new(&map, &config, *start);
        let bounds = *map.bounds();
        let mut best: Option<(usize, f64)> = None;

        // Direct connection when the goal is already within reach
        if distance(start, goal) <= config.goal_tolerance && tree.edge_is_free(start, goal) {
            best = Some((0, distance(start, goal)));
        }

        let mut iterations = 0;
        while iterations < config.max_iterations {
            if best.is_some() && config.stop_at_first_solution {
                break;
            }
            iterations += 1;

            let sample = if self.rng.gen_bool(config.goal_bias) {
                *goal
            } else {
                Point3::new(
                    self.rng.gen_range(bounds.min.x..=bounds.max.x),
                    self.rng.gen_range(bounds.min.y..=bounds.max.y),
                    self.rng.gen_range(bounds.min.z..=bounds.max.z),
                )
            };

            let Some(new_idx) = tree.extend(&sample) else {
                continue;
            };

            let new_pos = tree.nodes[new_idx].position;
            let to_goal = distance(&new_pos, goal);
            if to_goal <= config.goal_tolerance && tree.edge_is_free(&new_pos, goal) {
                let total = tree.nodes[new_idx].cost + to_goal;
                if best.map_or(true, |(_, cost)| total < cost) {
                    debug!(iteration = iterations, cost = total, "Improved solution");
                    best = Some((new_idx, total));
                }
            }
        }

        // Rewiring may have lowered the cost of earlier candidates, so pick the
        // final winner from the current tree costs
        let winner = tree
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| {
                distance(&node.position, goal) <= config.goal_tolerance
                    && tree.edge_is_free(&node.position, goal)
            })
            .map(|(idx, node)| (idx, node.cost + distance(&node.position, goal)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .or(best);

        let Some((goal_idx, cost)) = winner else {
            return Err(PlannerError::NoPathFound {
                start: *start,
                goal: *goal,
                iterations,
            });
        };

        let mut path = tree.path_to(goal_idx);
        if distance(&path[path.len() - 1], goal) > WAYPOINT_EPSILON {
            path.push(*goal);
        }

        info!(
            nodes = tree.nodes.len(),
            iterations,
            waypoints = path.len(),
            cost = format!("{:.3}", cost),
            "RRT* plan complete"
        );
        Ok(path)
    }

    fn follows_plan(&self, current: &Position, goal: &Position) -> bool {
        let same_goal = self
            .planned_goal
            .map_or(false, |planned| distance(&planned, goal) <= WAYPOINT_EPSILON);
        let on_track = self
            .waypoints
            .get(self.cursor)
            .map_or(false, |expected| distance(expected, current) <= WAYPOINT_EPSILON);
        same_goal && on_track && self.cursor + 1 < self.waypoints.len()
    }
}

impl MotionPlanner for RrtStarPlanner {
    fn next_position(
        &mut self,
        current: &Position,
        goal: &Position,
    ) -> Result<Position, PlannerError> {
        if !self.follows_plan(current, goal) {
            self.waypoints = self.plan(current, goal)?;
            self.cursor = 0;
            self.planned_goal = Some(*goal);
        }

        // A plan from the goal itself is a single waypoint
        self.cursor = (self.cursor + 1).min(self.waypoints.len() - 1);
        Ok(self.waypoints[self.cursor])
    }

    fn name(&self) -> &str {
        "RrtStarPlanner"
    }

    fn configure(&mut self, params: &HashMap<String, f64>) -> Result<(), PlannerError> {
        let mut config = self.config.clone();

        if let Some(&max_iterations) = params.get("max_iterations") {
            if !(max_iterations.is_finite() && max_iterations >= 1.0) {
                return Err(PlannerError::invalid_parameter(
                    "max_iterations",
                    format!("{} is not a finite count of at least 1", max_iterations),
                ));
            }
            config.max_iterations = max_iterations as usize;
        }
        if let Some(step_size) = positive_param(params, "step_size", MAX_STEP)? {
            config.step_size = step_size;
        }
        if let Some(&goal_bias) = params.get("goal_bias") {
            if !(0.0..=1.0).contains(&goal_bias) {
                return Err(PlannerError::invalid_parameter(
                    "goal_bias",
                    "must be within [0, 1]",
                ));
            }
            config.goal_bias = goal_bias;
        }
        if let Some(rewire_radius) = positive_param(params, "rewire_radius", MAX_STEP)? {
            config.rewire_radius = rewire_radius;
        }
        if let Some(goal_tolerance) = positive_param(params, "goal_tolerance", MAX_STEP)? {
            config.goal_tolerance = goal_tolerance;
        }
        if let Some(resolution) = positive_param(params, "collision_resolution", f64::MAX)? {
            config.collision_resolution = resolution;
        }
        if let Some(&stop) = params.get("stop_at_first_solution") {
            config.stop_at_first_solution = stop != 0.0;
        }
        if let Some(&seed) = params.get("seed") {
            if !(seed >= 0.0 && seed.fract() == 0.0 && seed <= MAX_EXACT_SEED as f64) {
                return Err(PlannerError::invalid_parameter(
                    "seed",
                    format!("{} is not a whole number in [0, {}]", seed, MAX_EXACT_SEED),
                ));
            }
            config.seed = Some(seed as u64);
            self.rng = Self::make_rng(config.seed);
        }

        self.config = config;
        // Cached plans were built with the old parameters
        self.waypoints.clear();
        self.cursor = 0;
        self.planned_goal = None;
        Ok(())
    }
}
