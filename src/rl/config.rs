//! DQN hyperparameter configuration

use serde::{Deserialize, Serialize};

/// Exploration schedule for epsilon-greedy action selection
///
/// `ε(n) = max(initial - n * decay_per_episode, floor)` where `n` is the
/// number of completed episodes. The floor keeps a trained agent exploring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    /// Probability of a random action before any episode completed
    ///
    /// Default: 0.4
    pub initial: f64,

    /// Linear decrease per completed episode
    ///
    /// Default: 0.005 (reaches the floor after ~80 episodes)
    pub decay_per_episode: f64,

    /// Lowest exploration probability, must be positive
    ///
    /// Default: 0.01
    pub floor: f64,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            initial: 0.4,
            decay_per_episode: 0.005,
            floor: 0.01,
        }
    }
}

impl ExplorationConfig {
    /// Exploration probability after `episode_count` completed episodes
    pub fn epsilon(&self, episode_count: usize) -> f64 {
        let decayed = self.initial - episode_count as f64 * self.decay_per_episode;
        decayed.max(self.floor)
    }
}

/// Configuration for the deep Q-learning agent
///
/// # Example
///
/// ```rust
/// use snake_dqn::rl::DqnConfig;
///
/// let config = DqnConfig {
///     learning_rate: 5e-4,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DqnConfig {
    /// Learning rate for the Adam optimizer
    ///
    /// Default: 1e-3
    pub learning_rate: f64,

    /// Discount factor for future rewards (gamma), in (0, 1)
    ///
    /// Default: 0.9
    pub gamma: f32,

    /// Width of the hidden layer
    ///
    /// Default: 256
    pub hidden_size: usize,

    /// Replay buffer capacity
    ///
    /// Default: 100_000
    pub replay_capacity: usize,

    /// Minibatch size for the per-episode replay update
    ///
    /// Default: 1000
    pub batch_size: usize,

    /// Window of the trailing mean score
    ///
    /// Default: 100
    pub mean_window: usize,

    /// Exploration schedule
    pub exploration: ExplorationConfig,

    /// Seed for the initial weights; `None` draws them from entropy
    ///
    /// Default: None
    pub seed: Option<u64>,
}

impl DqnConfig {
    /// Create a new configuration with default hyperparameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration parameters
    ///
    /// # Returns
    ///
    /// `Ok(())` if all parameters are valid, `Err(String)` with an error message otherwise.
    pub fn validate(&self) -> Result<(), String> {
        if self.learning_rate <= 0.0 {
            return Err(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }

        if !(self.gamma > 0.0 && self.gamma < 1.0) {
            return Err(format!("gamma must be in (0, 1), got {}", self.gamma));
        }

        if self.hidden_size == 0 {
            return Err("hidden_size must be at least 1".to_string());
        }

        if self.replay_capacity == 0 {
            return Err("replay_capacity must be at least 1".to_string());
        }

        if self.batch_size == 0 {
            return Err("batch_size must be at least 1".to_string());
        }

        if self.mean_window == 0 {
            return Err("mean_window must be at least 1".to_string());
        }

        let exploration = &self.exploration;
        if !(0.0..=1.0).contains(&exploration.initial) {
            return Err(format!(
                "exploration.initial must be in [0, 1], got {}",
                exploration.initial
            ));
        }

        if exploration.decay_per_episode < 0.0 {
            return Err(format!(
                "exploration.decay_per_episode must be non-negative, got {}",
                exploration.decay_per_episode
            ));
        }

        if exploration.floor <= 0.0 || exploration.floor > exploration.initial {
            return Err(format!(
                "exploration.floor must be in (0, initial], got {}",
                exploration.floor
            ));
        }

        Ok(())
    }
}

impl Default for DqnConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            gamma: 0.9,
            hidden_size: 256,
            replay_capacity: 100_000,
            batch_size: 1000,
            mean_window: 100,
            exploration: ExplorationConfig::default(),
            seed: None,
        }
    }
}
