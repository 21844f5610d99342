//! Backend type aliases and device management
//!
//! - **TrainingBackend**: Autodiff-enabled NdArray backend used by the DQN agent (CPU).
//!   No-grad forward passes run on its inner backend.
//!
//! The Q-network is a two-layer perceptron over 11 features, so the CPU NdArray
//! backend is plenty.
//!
//! # Example
//!
//! ```rust
//! use snake_dqn::rl::{default_device, DqnAgent, DqnConfig, TrainingBackend};
//!
//! let device = default_device();
//! let agent = DqnAgent::<TrainingBackend>::new(DqnConfig::default(), device);
//! assert_eq!(agent.episode_count(), 0);
//! ```

use burn::backend::{
    Autodiff,
    ndarray::{NdArray, NdArrayDevice},
};

/// Backend type for training (with autodiff)
pub type TrainingBackend = Autodiff<NdArray<f32>>;

/// Get the default device for computation
pub fn default_device() -> NdArrayDevice {
    NdArrayDevice::default()
}
