//! Deep Q-learning for the Snake game
//!
//! Provides:
//! - 11-feature observations (danger, heading, food direction)
//! - Two-layer Q-network built with Burn
//! - Fixed-capacity experience replay
//! - Epsilon-greedy DQN agent with online and replayed updates
//! - Weight persistence through Burn's record system

pub mod agent;
pub mod backend;
pub mod buffer;
pub mod config;
pub mod exploration;
pub mod network;
pub mod observation;
pub mod persistence;

pub use agent::{ActivationSnapshot, DqnAgent, LearnError};
pub use backend::{TrainingBackend, default_device};
pub use buffer::{Experience, ReplayBuffer};
pub use config::{DqnConfig, ExplorationConfig};
pub use exploration::Exploration;
pub use network::{QNetwork, QNetworkConfig};
pub use observation::{OBSERVATION_SIZE, Observation, observe};
pub use persistence::{ModelMetadata, load_network, save_model};
