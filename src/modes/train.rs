//! Headless training mode
//!
//! Runs the scheduler on a tokio interval: every frame the elapsed wall time
//! is handed to [`Scheduler::run_iteration`], which applies pending control
//! input, simulates as many fixed ticks as are due and publishes telemetry.
//! The loop ends on Ctrl+C or once the episode limit is reached, and the model
//! is saved one last time.
//!
//! # Example
//!
//! ```rust,no_run
//! use snake_dqn::modes::{TrainConfig, TrainMode};
//! use snake_dqn::rl::{default_device, TrainingBackend};
//!
//! # async fn train() -> anyhow::Result<()> {
//! let config = TrainConfig {
//!     max_episodes: Some(500),
//!     ..TrainConfig::default()
//! };
//!
//! let mut train_mode = TrainMode::<TrainingBackend>::new(config, default_device())?;
//! let control = train_mode.control();
//! control.send_command("SET_EPSILON_5")?;
//! train_mode.run().await?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result, anyhow};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::control::{self, ControlEndpoint, ControlHandle, DEFAULT_COMMAND_CAPACITY, Settings};
use crate::render::TextRenderer;
use crate::rl::{DqnAgent, DqnConfig};
use crate::scheduler::{Scheduler, SchedulerConfig};

/// Configuration for training mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Agent hyperparameters
    pub dqn: DqnConfig,

    /// Instances, game rules and timing
    pub scheduler: SchedulerConfig,

    /// Where the model is loaded from and saved to, `None` disables persistence
    pub model_path: Option<PathBuf>,

    /// Stop after this many completed episodes
    pub max_episodes: Option<usize>,

    /// Period of the outer loop in milliseconds
    pub frame_interval_ms: u64,

    /// Log progress every N completed episodes
    pub log_frequency: usize,

    /// Depth of the control command queue
    pub command_capacity: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            dqn: DqnConfig::default(),
            scheduler: SchedulerConfig::default(),
            model_path: Some(PathBuf::from("models/snake")),
            max_episodes: None,
            frame_interval_ms: 16,
            log_frequency: 50,
            command_capacity: DEFAULT_COMMAND_CAPACITY,
        }
    }
}

impl TrainConfig {
    /// Read a configuration from JSON, missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config from {:?}", path))
    }

    /// Validate every nested configuration
    pub fn validate(&self) -> Result<(), String> {
        self.dqn.validate()?;
        self.scheduler.validate()?;

        if self.frame_interval_ms == 0 {
            return Err("frame_interval_ms must be at least 1".to_string());
        }

        if self.log_frequency == 0 {
            return Err("log_frequency must be at least 1".to_string());
        }

        if self.max_episodes == Some(0) {
            return Err("max_episodes must be at least 1 when set".to_string());
        }

        Ok(())
    }
}

/// Training mode for the DQN agent
pub struct TrainMode<B: AutodiffBackend> {
    scheduler: Scheduler<B>,
    config: TrainConfig,
    handle: ControlHandle,
    endpoint: ControlEndpoint,
    renderer: TextRenderer,

    /// Episode count at the last progress report
    last_logged: usize,
}

impl<B: AutodiffBackend> TrainMode<B> {
    /// Build the agent (restoring a saved model when present) and the scheduler
    pub fn new(config: TrainConfig, device: B::Device) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow!("invalid training configuration: {e}"))?;

        // A scheduler seed also fixes the initial weights unless the agent has its own.
        let dqn = DqnConfig {
            seed: config.dqn.seed.or(config.scheduler.seed),
            ..config.dqn.clone()
        };
        let agent = match &config.model_path {
            Some(path) => DqnAgent::load_or_init(dqn, path.clone(), device)
                .with_context(|| format!("Failed to load model from {:?}", path))?,
            None => DqnAgent::new(dqn, device),
        };
        let last_logged = agent.episode_count();
        let scheduler = Scheduler::new(config.scheduler.clone(), agent)?;

        let settings = Settings {
            tick_rate: config.scheduler.tick_rate,
            paused: false,
        };
        let (handle, endpoint) = control::channel(settings, config.command_capacity);

        Ok(Self {
            scheduler,
            config,
            handle,
            endpoint,
            renderer: TextRenderer::new(),
            last_logged,
        })
    }

    /// Handle for steering and observing the running trainer
    pub fn control(&self) -> ControlHandle {
        self.handle.clone()
    }

    pub fn scheduler(&self) -> &Scheduler<B> {
        &self.scheduler
    }

    /// Run until Ctrl+C or the episode limit, then save the model
    pub async fn run(&mut self) -> Result<()> {
        self.log_header();

        let mut frame_timer = interval(Duration::from_millis(self.config.frame_interval_ms));
        frame_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_frame = Instant::now();

        loop {
            tokio::select! {
                _ = frame_timer.tick() => {
                    let now = Instant::now();
                    let elapsed_ms = now.duration_since(last_frame).as_secs_f64() * 1000.0;
                    last_frame = now;

                    self.scheduler.run_iteration(elapsed_ms, &mut self.endpoint);
                    self.report_progress();

                    if self.reached_episode_limit() {
                        info!("Episode limit reached");
                        break;
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, stopping training");
                    break;
                }
            }
        }

        self.finish()
    }

    fn reached_episode_limit(&self) -> bool {
        self.config
            .max_episodes
            .is_some_and(|limit| self.scheduler.agent().episode_count() >= limit)
    }

    fn report_progress(&mut self) {
        let episodes = self.scheduler.agent().episode_count();
        if episodes < self.last_logged {
            // RESET restarted the count
            self.last_logged = episodes;
        }
        if episodes - self.last_logged < self.config.log_frequency {
            return;
        }
        self.last_logged = episodes;

        let agent = self.scheduler.agent();
        info!(
            episodes,
            epsilon = agent.epsilon(),
            ticks = self.scheduler.total_ticks(),
            "{}",
            agent.stats().format_summary()
        );

        self.scheduler.render(&mut self.renderer);
        if let Some(frame) = self.renderer.focused_frame() {
            debug!("instance {}\n{}", self.scheduler.focused(), frame);
        }
    }

    fn finish(&self) -> Result<()> {
        let agent = self.scheduler.agent();
        agent.save().context("Failed to save final model")?;

        info!(
            episodes = agent.episode_count(),
            best_score = agent.stats().best_score(),
            mean_score = agent.stats().mean_score(),
            "Training complete"
        );
        if let Some(path) = agent.model_path() {
            info!(path = %path.display(), "Final model saved");
        }

        Ok(())
    }

    fn log_header(&self) {
        let scheduler = &self.config.scheduler;
        let dqn = &self.config.dqn;

        info!(
            instances = scheduler.instances,
            grid_width = scheduler.game.grid_width,
            grid_height = scheduler.game.grid_height,
            tick_rate = scheduler.tick_rate,
            cooldown_ticks = scheduler.death_cooldown_ticks,
            reset_policy = ?scheduler.reset_policy,
            "DQN training - snake"
        );
        info!(
            learning_rate = dqn.learning_rate,
            gamma = dqn.gamma,
            hidden_size = dqn.hidden_size,
            batch_size = dqn.batch_size,
            replay_capacity = dqn.replay_capacity,
            max_episodes = ?self.config.max_episodes,
            model_path = ?self.config.model_path,
            "Agent configuration"
        );
    }
}
