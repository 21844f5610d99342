use serde::{Deserialize, Serialize};

/// Configuration for a single game instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Width of the game grid
    pub grid_width: usize,
    /// Height of the game grid
    pub grid_height: usize,
    /// Initial length of the snake
    pub initial_snake_length: usize,

    /// Episode ends once `steps > timeout_factor * snake length`
    pub timeout_factor: u32,

    // Rewards
    /// Reward for eating food
    pub food_reward: f32,
    /// Existence penalty for every other surviving step
    pub step_penalty: f32,
    /// Penalty for dying (collision or timeout)
    pub death_penalty: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_width: 17,
            grid_height: 17,
            initial_snake_length: 3,
            timeout_factor: 100,
            food_reward: 10.0,
            step_penalty: -0.01,
            death_penalty: -10.0,
        }
    }
}

impl GameConfig {
    /// Create a new configuration with custom grid size
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            grid_width: width,
            grid_height: height,
            ..Default::default()
        }
    }

    /// Create a small grid for testing
    pub fn small() -> Self {
        Self::new(10, 10)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.initial_snake_length < 3 {
            return Err(format!(
                "initial_snake_length must be at least 3, got {}",
                self.initial_snake_length
            ));
        }

        // The initial body extends left of the centre cell.
        if self.grid_width / 2 + 1 < self.initial_snake_length {
            return Err(format!(
                "grid_width {} is too narrow for a snake of length {}",
                self.grid_width, self.initial_snake_length
            ));
        }

        if self.grid_height == 0 {
            return Err("grid_height must be positive".to_string());
        }

        if self.timeout_factor == 0 {
            return Err("timeout_factor must be at least 1".to_string());
        }

        if self.step_penalty > 0.0 {
            return Err(format!(
                "step_penalty must not be positive, got {}",
                self.step_penalty
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GameConfig::default();
        assert_eq!(config.grid_width, 17);
        assert_eq!(config.grid_height, 17);
        assert_eq!(config.initial_snake_length, 3);
        assert_eq!(config.food_reward, 10.0);
        assert_eq!(config.death_penalty, -10.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_custom_config() {
        let config = GameConfig::new(15, 12);
        assert_eq!(config.grid_width, 15);
        assert_eq!(config.grid_height, 12);
        assert_eq!(config.timeout_factor, 100);
    }

    #[test]
    fn test_validation_rejects_narrow_grid() {
        let config = GameConfig::new(3, 10);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_short_snake() {
        let config = GameConfig {
            initial_snake_length: 2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_positive_step_penalty() {
        let config = GameConfig {
            step_penalty: 0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: GameConfig = serde_json::from_str(r#"{"grid_width": 20}"#).unwrap();
        assert_eq!(config.grid_width, 20);
        assert_eq!(config.grid_height, 17);
    }
}
