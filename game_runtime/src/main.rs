// main.rs - Headless rolling-ball maze: generate, play (stdin / autopilot / replay), submit.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use maze_ball_runtime::input::{spawn_stdin_reader, Autopilot};
use maze_ball_runtime::{
    stop_channel, FileSink, FrameLoop, GameConfig, GameController, GridBallWorld, LogSink, LoopSettings,
    NullRenderer, PhysicsWorld, RenderSurface, ScriptedPhysics, SnapshotRenderer, Solution, SolutionSink,
};
use rust_maze_generator::{exit_cell, exit_opening, generate_seeded, ENTRANCE};

/// Scripted frames spent on each cell of a replayed path
const REPLAY_FRAMES_PER_CELL: usize = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum InputMode {
    /// One command per line: up/down/left/right or w/a/s/d
    Stdin,
    /// Follow the shortest route to the exit
    Autopilot,
    None,
}

/// CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Maze side length (odd, >= 3)
    #[arg(short, long)]
    dimension: Option<usize>,

    /// Generation seed; random when omitted
    #[arg(short, long)]
    seed: Option<u64>,

    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the solution payload here instead of logging it
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Save a top-down PNG of the last frame
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Frames per second
    #[arg(long)]
    fps: Option<u32>,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Where direction commands come from
    #[arg(long, value_enum, default_value = "stdin")]
    input: InputMode,

    /// Replay a previously written solution file
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Print the maze as ASCII and exit
    #[arg(long)]
    print_maze: bool,

    /// Delay between reaching the exit and submitting
    #[arg(long)]
    submit_delay_ms: Option<u64>,
}

async fn load_config(args: &Args) -> Result<GameConfig> {
    let mut config = match &args.config {
        Some(path) => GameConfig::load(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => GameConfig::default(),
    };

    if let Some(dimension) = args.dimension {
        config.dimension = dimension;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(fps) = args.fps {
        config.fps = fps;
    }
    if args.max_frames.is_some() {
        config.max_frames = args.max_frames;
    }
    if let Some(delay) = args.submit_delay_ms {
        config.submit_delay_ms = delay;
    }
    Ok(config)
}

async fn load_replay(path: &Path) -> Result<Solution> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read replay {}", path.display()))?;
    let solution = Solution::from_json(&text).context("Replay file is not a solution payload")?;
    if solution.seed.is_none() {
        bail!("Replay {} carries no seed; the maze cannot be rebuilt", path.display());
    }
    Ok(solution)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    info!("Starting with {args:?}");

    let mut config = load_config(&args).await?;
    let replay = match &args.replay {
        Some(path) => {
            let solution = load_replay(path).await?;
            config.dimension = solution.dimension;
            config.seed = solution.seed;
            Some(solution)
        }
        None => None,
    };
    config.validate().context("Invalid configuration")?;

    let seed = config.seed.unwrap_or_else(rand::random);
    info!("Maze {0}x{0}, seed {seed}", config.dimension);

    let grid = generate_seeded(config.dimension, seed).context("Maze generation failed")?;
    info!(
        "Maze has {} open cells, {} dead ends",
        grid.open_cells().count(),
        grid.dead_ends().len()
    );

    if args.print_maze {
        let marks = [(ENTRANCE, 'S'), (exit_opening(config.dimension), 'E')];
        println!("{}", grid.to_ascii(&marks));
        return Ok(());
    }

    let physics: Box<dyn PhysicsWorld> = match &replay {
        Some(solution) => {
            info!("Replaying {} recorded cells", solution.path.len());
            Box::new(ScriptedPhysics::from_path(&solution.path, REPLAY_FRAMES_PER_CELL))
        }
        None => Box::new(GridBallWorld::new(config.physics)),
    };
    let renderer: Box<dyn RenderSurface> = match &args.snapshot {
        Some(path) => Box::new(SnapshotRenderer::new(path, config.snapshot_cell_px)),
        None => Box::new(NullRenderer::new()),
    };
    let file_sink = args.output.as_ref().map(FileSink::new);
    let sink: Arc<dyn SolutionSink> = match &file_sink {
        Some(sink) => Arc::new(sink.clone()),
        None => Arc::new(LogSink),
    };

    let controller = GameController::new(grid.clone(), physics, renderer, config.controller_settings(Some(seed)))
        .context("Failed to set up the game")?;

    // Assets are ready once the output location exists
    let (loaded, gate) = oneshot::channel();
    tokio::spawn(async move {
        if let Some(sink) = file_sink {
            if let Err(e) = sink.prepare().await {
                error!("Cannot prepare {}: {e}", sink.path().display());
                return;
            }
        }
        let _ = loaded.send(());
    });

    let (stop, token) = stop_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted; stopping");
            stop.stop();
        }
    });

    let mut frame_loop = FrameLoop::new(controller, sink, LoopSettings::from_config(&config))
        .with_asset_gate(gate)
        .with_stop(token);

    let input = if replay.is_some() { InputMode::None } else { args.input };
    match input {
        InputMode::Stdin => {
            let (tx, commands) = mpsc::unbounded_channel();
            spawn_stdin_reader(tx).context("Failed to start the command reader")?;
            frame_loop = frame_loop.with_commands(commands);
        }
        InputMode::Autopilot => {
            let goal = exit_cell(config.dimension);
            let pilot = Autopilot::new(grid, ENTRANCE, goal).ok_or_else(|| anyhow!("No route from {ENTRANCE} to {goal}"))?;
            frame_loop = frame_loop.with_autopilot(pilot);
        }
        InputMode::None => {}
    }

    let report = frame_loop.run().await.context("Frame loop failed")?;
    match &report.solution {
        Some(solution) => info!(
            "Solved in {} ms, {} cells, submitted: {}",
            solution.elapsed_ms,
            solution.path.len(),
            report.submitted
        ),
        None => info!("Finished after {} frames without reaching the exit", report.frames),
    }
    Ok(())
}
