use serde::{Deserialize, Serialize};

use crate::game::GameConfig;

/// How the `RESET` command treats the shared agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// Restart every game instance; the agent keeps its episode count
    #[default]
    InstancesOnly,
    /// Restart every game instance and the agent's exploration schedule
    InstancesAndAgent,
}

/// Configuration for the multi-instance training scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of concurrently simulated game instances
    ///
    /// Default: 6
    pub instances: usize,

    /// Game configuration shared by all instances
    pub game: GameConfig,

    /// Initial simulation rate in ticks per second
    ///
    /// Default: 30.0
    pub tick_rate: f64,

    /// Upper bound on ticks run by a single `advance`
    ///
    /// Default: 5
    pub max_ticks_per_advance: usize,

    /// Ticks a dead instance waits before it is reset, 0 resets immediately
    ///
    /// Default: 15
    pub death_cooldown_ticks: u32,

    pub reset_policy: ResetPolicy,

    /// Seed for the scheduler's random generator, entropy when `None`
    pub seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            instances: 6,
            game: GameConfig::default(),
            tick_rate: 30.0,
            max_ticks_per_advance: 5,
            death_cooldown_ticks: 15,
            reset_policy: ResetPolicy::default(),
            seed: None,
        }
    }
}

impl SchedulerConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.instances == 0 {
            return Err("instances must be at least 1".to_string());
        }

        if !(self.tick_rate.is_finite() && self.tick_rate > 0.0) {
            return Err(format!("tick_rate must be positive, got {}", self.tick_rate));
        }

        if self.max_ticks_per_advance == 0 {
            return Err("max_ticks_per_advance must be at least 1".to_string());
        }

        self.game.validate()
    }
}
