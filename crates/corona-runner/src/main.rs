//! Command-line driver: runs a simulation and exports its frames.

mod export;
mod render;
mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use corona_core::SimulationConfig;
use corona_world::World;
use export::{ExportOptions, Exporter};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "corona-run")]
#[command(about = "Simulate an epidemic spreading through agents on a grid")]
struct Args {
    /// JSON file with a full or partial simulation configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of steps to simulate
    #[arg(long)]
    steps: Option<u64>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Grid width in cells
    #[arg(long)]
    width: Option<i32>,

    /// Grid height in cells
    #[arg(long)]
    height: Option<i32>,

    /// Number of agents
    #[arg(long)]
    agents: Option<usize>,

    /// Number of agents infected at the start
    #[arg(long)]
    initial_infections: Option<usize>,

    /// Steps between census log lines
    #[arg(long)]
    census_interval: Option<u64>,

    /// Directory receiving frames and snapshots
    #[arg(long, default_value = "corona_export")]
    output_dir: PathBuf,

    /// Write one PNG frame per step
    #[arg(long)]
    frames: bool,

    /// Write newline-delimited JSON snapshots
    #[arg(long)]
    snapshots: bool,

    /// Edge length in pixels of one grid cell in rendered frames
    #[arg(long, default_value_t = 8)]
    tile_size: u32,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    /// Reference run settings, then the config file, then individual flags
    fn resolve_config(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {:?}", path))?;
                SimulationConfig::from_json(&text)
                    .with_context(|| format!("invalid config {:?}", path))?
            }
            None => SimulationConfig::reference(),
        };

        if let Some(steps) = self.steps {
            config.num_steps = steps;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(width) = self.width {
            config.world.width = width;
        }
        if let Some(height) = self.height {
            config.world.height = height;
        }
        if let Some(agents) = self.agents {
            config.world.agents = agents;
        }
        if let Some(initial_infections) = self.initial_infections {
            config.world.initial_infections = initial_infections;
        }
        if let Some(interval) = self.census_interval {
            config.census_interval = interval;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    telemetry::init_telemetry(args.json_logs)?;

    let config = args.resolve_config()?;
    info!(
        seed = config.seed,
        steps = config.num_steps,
        width = config.world.width,
        height = config.world.height,
        agents = config.world.agents,
        "Starting coronator run"
    );

    let mut exporter = Exporter::new(ExportOptions {
        output_dir: args.output_dir.clone(),
        frames: args.frames,
        snapshots: args.snapshots,
        tile_size: args.tile_size,
    })?;

    let steps = config.num_steps;
    let mut world = World::new(config)?;
    let started = Instant::now();

    for _ in 0..steps {
        world.step()?;
        exporter.record(&world.snapshot())?;
    }
    let census = world.census();

    exporter.finish()?;

    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        steps,
        "Run finished: {}",
        census
    );
    Ok(())
}
