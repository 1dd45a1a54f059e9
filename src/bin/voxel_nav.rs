use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use voxel_nav::common::types::position;
use voxel_nav::navigation::rrt_star::MAX_EXACT_SEED;
use voxel_nav::render::{NullViewer, Viewer};
use voxel_nav::{HarnessConfig, NavigationHarness, PlannerKind, Scenario, VoxelMap};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Harness configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scenario to run, from the config file or the built-in list
    #[arg(short, long)]
    scenario: Option<String>,

    /// Map file to run instead of a named scenario
    #[arg(long, requires_all = ["start", "goal"])]
    map: Option<PathBuf>,

    /// Start position
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
    start: Option<Vec<f64>>,

    /// Goal position
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
    goal: Option<Vec<f64>>,

    /// Planner to test (greedy, rrt-star)
    #[arg(short, long)]
    planner: Option<PlannerKind>,

    /// Seed for sampling planners (at most 2^53)
    #[arg(long, value_parser = clap::value_parser!(u64).range(..=MAX_EXACT_SEED))]
    seed: Option<u64>,

    /// Pause between moves in seconds
    #[arg(long)]
    delay: Option<f64>,

    /// Give up after this many moves
    #[arg(long)]
    max_moves: Option<usize>,

    /// Run without drawing
    #[arg(long)]
    no_display: bool,

    /// Save the visualization to a recording file instead of opening a window
    #[arg(long)]
    record: Option<PathBuf>,
}

fn triple(values: &[f64]) -> [f64; 3] {
    [values[0], values[1], values[2]]
}

/// Scenario to run and the resolved path of its map
fn select_scenario(args: &Args, config: &HarnessConfig) -> Result<(Scenario, PathBuf)> {
    if let Some(map) = &args.map {
        let (Some(start), Some(goal)) = (&args.start, &args.goal) else {
            bail!("--map needs --start and --goal");
        };
        let mut scenario = Scenario::new("custom", "", triple(start), triple(goal));
        scenario.map = map.clone();
        // Paths given on the command line are relative to the working directory
        return Ok((scenario, map.clone()));
    }

    let name = args.scenario.as_deref().unwrap_or("single_cube");
    let mut scenario = config.scenario(name)?;
    if let Some(start) = &args.start {
        scenario.start = triple(start);
    }
    if let Some(goal) = &args.goal {
        scenario.goal = triple(goal);
    }
    let map_path = scenario.map_path(&config.run.maps_dir);
    Ok((scenario, map_path))
}

#[cfg(feature = "visualization")]
fn make_viewer(args: &Args) -> Result<Box<dyn Viewer>> {
    use voxel_nav::render::RerunViewer;

    let viewer = match &args.record {
        Some(path) => RerunViewer::save("voxel_nav", &path.to_string_lossy())?,
        None => RerunViewer::spawn("voxel_nav")?,
    };
    Ok(Box::new(viewer))
}

#[cfg(not(feature = "visualization"))]
fn make_viewer(args: &Args) -> Result<Box<dyn Viewer>> {
    use tracing::warn;

    if args.record.is_some() {
        warn!("--record ignored: built without the `visualization` feature");
    } else {
        warn!("Built without the `visualization` feature, drawing disabled");
    }
    Ok(Box::new(NullViewer))
}

fn run(args: &Args) -> Result<bool> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => HarnessConfig::default(),
    };

    if let Some(kind) = args.planner {
        config.planner.kind = kind;
    }
    if let Some(seed) = args.seed {
        config.planner.params.insert("seed".to_string(), seed as f64);
    }
    if let Some(delay) = args.delay {
        config.run.delay_secs = delay;
    }
    if args.max_moves.is_some() {
        config.run.max_moves = args.max_moves;
    }
    if args.no_display {
        config.run.verbose = false;
    }

    let (scenario, map_path) = select_scenario(args, &config)?;
    let map = Arc::new(
        VoxelMap::load(&map_path).with_context(|| format!("loading map {}", map_path.display()))?,
    );

    let options = config.run_options()?;
    let mut viewer: Box<dyn Viewer> = if config.run.verbose {
        make_viewer(args)?
    } else {
        Box::new(NullViewer)
    };

    let planner = config
        .planner
        .kind
        .build(Arc::clone(&map), &config.planner.params)?;

    println!("Running scenario '{}' with {}", scenario.name, config.planner.kind);
    let mut harness = NavigationHarness::new(map, planner);
    let outcome = harness.run(
        &position(scenario.start),
        &position(scenario.goal),
        &options,
        viewer.as_mut(),
    )?;

    println!("Success: {}", outcome.success);
    println!("Number of Moves: {}", outcome.num_moves);
    Ok(outcome.success)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
