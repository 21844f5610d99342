use anyhow::{Result, anyhow};
use clap::Parser;
use snake_dqn::modes::{TrainConfig, TrainMode};
use snake_dqn::rl::{TrainingBackend, default_device};
use snake_dqn::scheduler::ResetPolicy;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "snake_dqn")]
#[command(version, about = "Train a deep Q-learning agent on many snake games at once")]
struct Cli {
    /// JSON configuration file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of game instances
    #[arg(long)]
    instances: Option<usize>,

    /// Grid width
    #[arg(long)]
    width: Option<usize>,

    /// Grid height
    #[arg(long)]
    height: Option<usize>,

    /// Simulation ticks per second
    #[arg(long)]
    tick_rate: Option<f64>,

    /// Ticks a dead instance waits before restarting
    #[arg(long)]
    cooldown: Option<u32>,

    /// Stop after this many episodes
    #[arg(long)]
    max_episodes: Option<usize>,

    /// Model path (weights and metadata are written next to it)
    #[arg(long)]
    model_path: Option<PathBuf>,

    /// Run without loading or saving a model
    #[arg(long, conflicts_with = "model_path")]
    no_save: bool,

    /// Seed for the simulation RNG
    #[arg(long)]
    seed: Option<u64>,

    /// RESET also restarts the agent's exploration schedule
    #[arg(long)]
    reset_agent_on_reset: bool,
}

impl Cli {
    fn into_config(self) -> Result<TrainConfig> {
        let mut config = match &self.config {
            Some(path) => TrainConfig::from_json_file(path)?,
            None => TrainConfig::default(),
        };

        let scheduler = &mut config.scheduler;
        if let Some(instances) = self.instances {
            scheduler.instances = instances;
        }
        if let Some(width) = self.width {
            scheduler.game.grid_width = width;
        }
        if let Some(height) = self.height {
            scheduler.game.grid_height = height;
        }
        if let Some(tick_rate) = self.tick_rate {
            scheduler.tick_rate = tick_rate;
        }
        if let Some(cooldown) = self.cooldown {
            scheduler.death_cooldown_ticks = cooldown;
        }
        if self.seed.is_some() {
            scheduler.seed = self.seed;
        }
        if self.reset_agent_on_reset {
            scheduler.reset_policy = ResetPolicy::InstancesAndAgent;
        }

        if self.max_episodes.is_some() {
            config.max_episodes = self.max_episodes;
        }
        if self.no_save {
            config.model_path = None;
        } else if self.model_path.is_some() {
            config.model_path = self.model_path;
        }

        config
            .validate()
            .map_err(|e| anyhow!("invalid configuration: {e}"))?;
        Ok(config)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Cli::parse().into_config()?;
    info!(version = env!("CARGO_PKG_VERSION"), "starting snake_dqn");

    let mut train_mode = TrainMode::<TrainingBackend>::new(config, default_device())?;
    train_mode.run().await
}
