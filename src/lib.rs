//! Snake DQN - many snake games training one shared deep Q-learning agent
//!
//! This library provides:
//! - Deterministic grid-world game instances (game module)
//! - Observation features, Q-network, replay memory and the DQN agent (rl module)
//! - Training statistics (metrics module)
//! - The fixed-timestep multi-instance scheduler (scheduler module)
//! - Settings, command and telemetry channels for external surfaces (control module)
//! - Read-only render hooks (render module)
//! - The headless training loop (modes module)

pub mod control;
pub mod game;
pub mod metrics;
pub mod modes;
pub mod render;
pub mod rl;
pub mod scheduler;
