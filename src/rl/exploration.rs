//! Epsilon-greedy exploration state

use super::config::ExplorationConfig;

/// Decaying exploration schedule with an optional manual override
#[derive(Debug, Clone)]
pub struct Exploration {
    config: ExplorationConfig,
    pinned: Option<f64>,
}

impl Exploration {
    pub fn new(config: ExplorationConfig) -> Self {
        Self {
            config,
            pinned: None,
        }
    }

    /// Current exploration probability
    ///
    /// The override, when set, wins over the decay schedule.
    pub fn epsilon(&self, episode_count: usize) -> f64 {
        self.pinned
            .unwrap_or_else(|| self.config.epsilon(episode_count))
    }

    /// Pin epsilon to a fixed value, or return to the schedule with `None`
    ///
    /// Values are clamped to `[0, 1]`.
    pub fn set_override(&mut self, epsilon: Option<f64>) {
        self.pinned = epsilon.map(|e| e.clamp(0.0, 1.0));
    }

    pub fn override_value(&self) -> Option<f64> {
        self.pinned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_without_override() {
        let exploration = Exploration::new(ExplorationConfig::default());
        assert!((exploration.epsilon(0) - 0.4).abs() < 1e-12);
        assert_eq!(exploration.epsilon(10_000), 0.01);
    }

    #[test]
    fn test_override_pins_and_clears() {
        let mut exploration = Exploration::new(ExplorationConfig::default());

        exploration.set_override(Some(0.25));
        assert_eq!(exploration.epsilon(0), 0.25);
        assert_eq!(exploration.epsilon(500), 0.25);

        exploration.set_override(None);
        assert_eq!(exploration.epsilon(500), 0.01);
    }

    #[test]
    fn test_override_clamped() {
        let mut exploration = Exploration::new(ExplorationConfig::default());
        exploration.set_override(Some(3.0));
        assert_eq!(exploration.override_value(), Some(1.0));
    }
}
