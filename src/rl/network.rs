//! Q-network for the Snake agent
//!
//! A two-layer perceptron mapping the 11-feature observation to one Q-value per
//! relative action.
//!
//! # Architecture
//!
//! ```text
//! Input: [batch, 11]
//!   ↓ Linear(11 → hidden) + ReLU
//!   ↓ Linear(hidden → 3)
//! Output: [batch, 3] Q-values (forward, turn right, turn left)
//! ```
//!
//! # Example
//!
//! ```rust
//! use snake_dqn::rl::QNetworkConfig;
//! use burn::backend::ndarray::NdArrayDevice;
//! use burn::backend::NdArray;
//! use burn::tensor::Tensor;
//!
//! type Backend = NdArray<f32>;
//!
//! let device = NdArrayDevice::default();
//! let network = QNetworkConfig::new(256).init::<Backend>(&device);
//!
//! let observation = Tensor::zeros([4, 11], &device);
//! let q_values = network.forward(observation);
//!
//! assert_eq!(q_values.dims(), [4, 3]);
//! ```

use std::sync::{Mutex, PoisonError};

use burn::{
    module::Module,
    nn::{Linear, LinearConfig},
    tensor::{Tensor, activation::relu, backend::Backend},
};

use super::observation::OBSERVATION_SIZE;
use crate::game::RelativeAction;

/// Serializes weight initialization, which draws from the backend's global RNG
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// Configuration for the Q-network
#[derive(Debug, Clone)]
pub struct QNetworkConfig {
    /// Number of input features (default: 11)
    pub input_size: usize,

    /// Hidden layer width
    pub hidden_size: usize,

    /// Number of actions (default: 3 relative actions)
    pub num_actions: usize,
}

impl QNetworkConfig {
    /// Create a configuration for the Snake feature vector
    pub fn new(hidden_size: usize) -> Self {
        Self {
            input_size: OBSERVATION_SIZE,
            hidden_size,
            num_actions: RelativeAction::COUNT,
        }
    }

    /// Initialize the network from this configuration
    pub fn init<B: Backend>(&self, device: &B::Device) -> QNetwork<B> {
        let _guard = INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        self.build(device)
    }

    /// Initialize with the backend RNG reseeded first, for reproducible weights
    pub fn init_seeded<B: Backend>(&self, seed: u64, device: &B::Device) -> QNetwork<B> {
        let _guard = INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        B::seed(seed);
        self.build(device)
    }

    fn build<B: Backend>(&self, device: &B::Device) -> QNetwork<B> {
        let network = QNetwork {
            hidden: LinearConfig::new(self.input_size, self.hidden_size).init(device),
            output: LinearConfig::new(self.hidden_size, self.num_actions).init(device),
        };

        // Parameters are lazy; draw them now while the caller holds the lock.
        for layer in [&network.hidden, &network.output] {
            layer.weight.val();
            if let Some(bias) = &layer.bias {
                bias.val();
            }
        }
        network
    }
}

impl Default for QNetworkConfig {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Two-layer Q-value approximator
#[derive(Module, Debug)]
pub struct QNetwork<B: Backend> {
    /// Input → hidden layer
    pub(super) hidden: Linear<B>,
    /// Hidden → Q-values
    pub(super) output: Linear<B>,
}

impl<B: Backend> QNetwork<B> {
    /// Q-values for a batch of observations, shape `[batch, 3]`
    pub fn forward(&self, observation: Tensor<B, 2>) -> Tensor<B, 2> {
        let (_, q_values) = self.forward_with_hidden(observation);
        q_values
    }

    /// Forward pass that also returns the post-ReLU hidden activations
    pub fn forward_with_hidden(&self, observation: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let hidden = relu(self.hidden.forward(observation));
        let q_values = self.output.forward(hidden.clone());
        (hidden, q_values)
    }
}
