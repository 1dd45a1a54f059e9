//! Harness configuration
//!
//! Loaded from a TOML file:
//!
//! ```toml
//! [run]
//! verbose = true
//! delay_secs = 0.5
//! collision_pause_secs = 5.0
//! maps_dir = "maps"
//!
//! [planner]
//! kind = "rrt_star"
//! params = { step_size = 0.5, seed = 42 }
//!
//! [[scenario]]
//! name = "single_cube"
//! map = "single_cube.txt"
//! start = [2.3, 2.3, 1.3]
//! goal = [7.0, 7.0, 6.0]
//! ```

use crate::common::types::{position, Position};
use crate::harness::RunOptions;
use crate::navigation::PlannerKind;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors raised while loading the configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("unknown scenario '{0}'")]
    UnknownScenario(String),
}

/// `[run]` section
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunSection {
    /// Draw the scene and animate the robot.
    pub verbose: bool,
    pub delay_secs: f64,
    pub collision_pause_secs: f64,
    pub max_moves: Option<usize>,
    /// Directory map paths are resolved against.
    pub maps_dir: PathBuf,
}

impl Default for RunSection {
    fn default() -> Self {
        RunSection {
            verbose: true,
            delay_secs: 0.5,
            collision_pause_secs: 5.0,
            max_moves: None,
            maps_dir: PathBuf::from("maps"),
        }
    }
}

/// `[planner]` section
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlannerSection {
    pub kind: PlannerKind,
    /// Handed to `MotionPlanner::configure`.
    pub params: HashMap<String, f64>,
}

/// A start/goal pair on a map
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub map: PathBuf,
    pub start: [f64; 3],
    pub goal: [f64; 3],
}

impl Scenario {
    pub fn new(name: &str, map: &str, start: [f64; 3], goal: [f64; 3]) -> Self {
        Scenario {
            name: name.to_string(),
            map: PathBuf::from(map),
            start,
            goal,
        }
    }

    pub fn start(&self) -> Position {
        position(self.start)
    }

    pub fn goal(&self) -> Position {
        position(self.goal)
    }

    /// Map path, resolved against `maps_dir` when relative
    pub fn map_path(&self, maps_dir: &Path) -> PathBuf {
        if self.map.is_absolute() {
            self.map.clone()
        } else {
            maps_dir.join(&self.map)
        }
    }
}

/// The start/goal pairs of the classic benchmark maps
pub fn builtin_scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("single_cube", "single_cube.txt", [2.3, 2.3, 1.3], [7.0, 7.0, 6.0]),
        Scenario::new("maze", "maze.txt", [0.0, 0.0, 1.0], [12.0, 12.0, 5.0]),
        Scenario::new("window", "window.txt", [0.2, -4.9, 0.2], [6.0, 18.0, 3.0]),
        Scenario::new("tower", "tower.txt", [2.5, 4.0, 0.5], [4.0, 2.5, 19.5]),
        Scenario::new("flappy_bird", "flappy_bird.txt", [0.5, 2.5, 5.5], [19.0, 2.5, 5.5]),
        Scenario::new("room", "room.txt", [1.0, 5.0, 1.5], [9.0, 7.0, 1.5]),
        Scenario::new("monza", "monza.txt", [0.5, 1.0, 4.9], [3.8, 1.0, 0.1]),
    ]
}

/// Full harness configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub run: RunSection,
    pub planner: PlannerSection,
    #[serde(rename = "scenario")]
    pub scenarios: Vec<Scenario>,
}

impl HarnessConfig {
    /// Load the configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse()
    }

    /// Find a scenario by name, configured entries first, then built-ins
    pub fn scenario(&self, name: &str) -> Result<Scenario, ConfigError> {
        self.scenarios
            .iter()
            .cloned()
            .chain(builtin_scenarios())
            .find(|s| s.name == name)
            .ok_or_else(|| ConfigError::UnknownScenario(name.to_string()))
    }

    /// Run options described by the `[run]` section
    pub fn run_options(&self) -> Result<RunOptions, ConfigError> {
        Ok(RunOptions {
            delay: seconds("delay_secs", self.run.delay_secs)?,
            collision_pause: seconds("collision_pause_secs", self.run.collision_pause_secs)?,
            max_moves: self.run.max_moves,
        })
    }
}

impl std::str::FromStr for HarnessConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

fn seconds(name: &str, value: f64) -> Result<Option<Duration>, ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::Invalid(format!(
            "{} must be a non-negative number of seconds",
            name
        )));
    }
    Ok((value > 0.0).then(|| Duration::from_secs_f64(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config: HarnessConfig = "".parse().unwrap();
        assert!(config.run.verbose);
        assert_eq!(config.planner.kind, PlannerKind::RrtStar);
        assert!(config.scenarios.is_empty());

        let options = config.run_options().unwrap();
        assert_eq!(options.delay, Some(Duration::from_millis(500)));
        assert_eq!(options.collision_pause, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_full_config() {
        let text = r#"
[run]
verbose = false
delay_secs = 0.0
collision_pause_secs = 0
max_moves = 300
maps_dir = "assets/maps"

[planner]
kind = "greedy"
params = { step_size = 0.25 }

[[scenario]]
name = "corner"
map = "corner.txt"
start = [1.0, 1.0, 1.0]
goal = [2.0, 2.0, 2.0]
"#;
        let config: HarnessConfig = text.parse().unwrap();
        assert!(!config.run.verbose);
        assert_eq!(config.planner.kind, PlannerKind::Greedy);
        assert_eq!(config.planner.params.get("step_size"), Some(&0.25));

        let options = config.run_options().unwrap();
        assert_eq!(options.delay, None);
        assert_eq!(options.collision_pause, None);
        assert_eq!(options.max_moves, Some(300));

        let corner = config.scenario("corner").unwrap();
        assert_eq!(
            corner.map_path(&config.run.maps_dir),
            PathBuf::from("assets/maps/corner.txt")
        );
    }

    #[test]
    fn test_collision_pause_accepts_integer() {
        let config: HarnessConfig = "[run]\ncollision_pause_secs = 2\n".parse().unwrap();
        assert_eq!(config.run_options().unwrap().collision_pause, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_builtin_scenarios() {
        let config = HarnessConfig::default();
        let cube = config.scenario("single_cube").unwrap();
        assert_eq!(cube.start, [2.3, 2.3, 1.3]);
        assert_eq!(cube.goal(), position([7.0, 7.0, 6.0]));
        assert_eq!(builtin_scenarios().len(), 7);
        assert!(matches!(
            config.scenario("nowhere"),
            Err(ConfigError::UnknownScenario(_))
        ));
    }

    #[test]
    fn test_configured_scenario_shadows_builtin() {
        let text = r#"
[[scenario]]
name = "single_cube"
map = "/tmp/cube.txt"
start = [0.0, 0.0, 0.0]
goal = [1.0, 1.0, 1.0]
"#;
        let config: HarnessConfig = text.parse().unwrap();
        let cube = config.scenario("single_cube").unwrap();
        assert_eq!(cube.start, [0.0, 0.0, 0.0]);
        assert_eq!(cube.map_path(Path::new("maps")), PathBuf::from("/tmp/cube.txt"));
    }

    #[test]
    fn test_negative_delay_rejected() {
        let config: HarnessConfig = "[run]\ndelay_secs = -1.0\n".parse().unwrap();
        assert!(matches!(config.run_options(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_planner_kind() {
        let err = "[planner]\nkind = \"dijkstra\"\n".parse::<HarnessConfig>();
        assert!(matches!(err, Err(ConfigError::Toml(_))));
    }
}
