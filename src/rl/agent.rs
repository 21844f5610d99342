//! Deep Q-learning agent
//!
//! One agent is shared by every game instance. Each tick it learns online from
//! the single transition it just produced, and after every episode it replays
//! a minibatch sampled from the shared replay buffer.

use std::path::{Path, PathBuf};

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    nn::loss::{MseLoss, Reduction},
    optim::{Adam, AdamConfig, GradientsParams, Optimizer, adaptor::OptimizerAdaptor},
    tensor::{ElementConversion, Int, Tensor, TensorData, backend::AutodiffBackend},
};
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use super::buffer::{Experience, ReplayBuffer};
use super::config::DqnConfig;
use super::exploration::Exploration;
use super::network::{QNetwork, QNetworkConfig};
use super::observation::{self, Observation, observations_to_tensor};
use super::persistence;
use crate::game::{GameError, GameInstance, RelativeAction};
use crate::metrics::TrainingStats;

/// Failure of a single learning update
///
/// The update is skipped and the weights are left untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LearnError {
    #[error("non-finite loss {loss}")]
    NonFinite { loss: f32 },

    #[error("tensor data conversion failed: {0}")]
    TensorData(String),
}

/// Activations of the most recent forward pass, for visualization only
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivationSnapshot {
    pub input: Vec<f32>,
    pub hidden: Vec<f32>,
    pub output: Vec<f32>,
}

/// DQN agent: Q-network, optimizer, replay memory and training history
///
/// # Type Parameters
///
/// * `B` - Autodiff backend for gradient computation
pub struct DqnAgent<B: AutodiffBackend> {
    network: QNetwork<B>,
    optim: OptimizerAdaptor<Adam, QNetwork<B>, B>,
    config: DqnConfig,
    exploration: Exploration,
    memory: ReplayBuffer,
    stats: TrainingStats,

    /// Completed episodes, drives the exploration schedule
    episode_count: usize,

    activations: Option<ActivationSnapshot>,
    model_path: Option<PathBuf>,
    device: B::Device,
}

impl<B: AutodiffBackend> DqnAgent<B> {
    /// Create an agent with freshly initialized weights
    ///
    /// With `config.seed` set the weights are reproducible.
    pub fn new(config: DqnConfig, device: B::Device) -> Self {
        let network_config = QNetworkConfig::new(config.hidden_size);
        let network = match config.seed {
            Some(seed) => network_config.init_seeded::<B>(seed, &device),
            None => network_config.init::<B>(&device),
        };
        Self::with_network(network, config, device)
    }

    fn with_network(network: QNetwork<B>, config: DqnConfig, device: B::Device) -> Self {
        Self {
            network,
            optim: AdamConfig::new().init(),
            exploration: Exploration::new(config.exploration.clone()),
            memory: ReplayBuffer::new(config.replay_capacity),
            stats: TrainingStats::new(config.mean_window),
            episode_count: 0,
            activations: None,
            model_path: None,
            config,
            device,
        }
    }

    /// Create an agent bound to `model_path`
    ///
    /// Weights, episode count and best score are restored when a model was
    /// saved there before; otherwise the agent starts fresh. Either way later
    /// calls to [`save`](Self::save) write to `model_path`.
    pub fn load_or_init(
        config: DqnConfig,
        model_path: impl Into<PathBuf>,
        device: B::Device,
    ) -> Result<Self> {
        let model_path = model_path.into();

        let mut agent = if persistence::model_exists(&model_path) {
            let (network, metadata) = persistence::load_network::<B>(&model_path, &device)?;
            info!(
                path = %model_path.display(),
                episodes = metadata.episode_count,
                best_score = metadata.best_score,
                "Loaded saved model"
            );

            let config = DqnConfig {
                hidden_size: metadata.config.hidden_size,
                ..config
            };
            let mut agent = Self::with_network(network, config, device);
            agent.episode_count = metadata.episode_count;
            agent.stats.restore_best_score(metadata.best_score);
            agent
        } else {
            debug!(path = %model_path.display(), "No saved model, starting fresh");
            Self::new(config, device)
        };

        agent.model_path = Some(model_path);
        Ok(agent)
    }

    /// Feature vector for an instance
    pub fn observe(&self, instance: &GameInstance) -> Observation {
        observation::observe(instance)
    }

    /// Current exploration probability
    pub fn epsilon(&self) -> f64 {
        self.exploration.epsilon(self.episode_count)
    }

    /// Epsilon-greedy action selection
    ///
    /// The greedy forward pass always runs so the activation snapshot matches
    /// the observation even when a random action is taken. A greedy index the
    /// game cannot map fails with [`GameError::InvalidAction`].
    pub fn select_action<R: Rng + ?Sized>(
        &mut self,
        observation: &Observation,
        rng: &mut R,
    ) -> Result<RelativeAction, GameError> {
        let network = self.network.clone().valid();
        let input = observations_to_tensor::<B::InnerBackend, _>([observation], &self.device);
        let (hidden, q_values) = network.forward_with_hidden(input);

        let hidden: Vec<f32> = hidden.into_data().iter::<f32>().collect();
        let output: Vec<f32> = q_values.into_data().iter::<f32>().collect();

        let explore = rng.gen_bool(self.epsilon().clamp(0.0, 1.0));
        let index = if explore {
            rng.gen_range(0..RelativeAction::COUNT)
        } else {
            argmax(&output)
        };

        self.activations = Some(ActivationSnapshot {
            input: observation.to_vec(),
            hidden,
            output,
        });

        RelativeAction::try_from(index)
    }

    /// One gradient step on a single transition
    pub fn learn_step(&mut self, experience: &Experience) -> Result<f32, LearnError> {
        self.update(std::slice::from_ref(experience))
    }

    /// Store a transition in replay memory
    pub fn remember(&mut self, experience: Experience) {
        self.memory.push(experience);
    }

    /// One gradient step on a minibatch sampled from replay memory
    ///
    /// Returns `Ok(None)` without touching the weights when memory is empty.
    pub fn learn_batch<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Option<f32>, LearnError> {
        if self.memory.is_empty() {
            return Ok(None);
        }

        let batch = self.memory.sample(self.config.batch_size, rng);
        self.update(&batch).map(Some)
    }

    /// Close an episode: update histories and advance the exploration schedule
    ///
    /// Returns `true` when `score` is a new best.
    pub fn record_episode(&mut self, score: u32) -> bool {
        self.episode_count += 1;
        self.stats.record_episode(score)
    }

    /// Persist weights and metadata to the configured model path
    ///
    /// Does nothing when the agent has no model path.
    pub fn save(&self) -> Result<()> {
        match &self.model_path {
            Some(path) => persistence::save_model(self, path),
            None => Ok(()),
        }
    }

    /// Activations of the most recent `select_action`
    pub fn activations(&self) -> Option<&ActivationSnapshot> {
        self.activations.as_ref()
    }

    /// Pin exploration to a fixed probability, or return to the schedule
    pub fn set_exploration_override(&mut self, epsilon: Option<f64>) {
        self.exploration.set_override(epsilon);
    }

    /// Restart the exploration schedule as if no episode had been played
    ///
    /// Histories and weights are kept.
    pub fn reset_progress(&mut self) {
        self.episode_count = 0;
        self.exploration.set_override(None);
    }

    /// MSE between `Q(s)[a]` and the Bellman target, followed by one Adam step
    fn update(&mut self, batch: &[Experience]) -> Result<f32, LearnError> {
        let batch_size = batch.len();

        // Targets come from a no-grad copy of the current network
        let next_observations = observations_to_tensor::<B::InnerBackend, _>(
            batch.iter().map(|e| &e.next_observation),
            &self.device,
        );
        let next_q = self.network.clone().valid().forward(next_observations);
        let max_next: Vec<f32> = next_q
            .max_dim(1)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| LearnError::TensorData(format!("{e:?}")))?;

        let targets: Vec<f32> = batch
            .iter()
            .zip(max_next)
            .map(|(e, next)| {
                if e.terminal {
                    e.reward
                } else {
                    e.reward + self.config.gamma * next
                }
            })
            .collect();

        let observations =
            observations_to_tensor::<B, _>(batch.iter().map(|e| &e.observation), &self.device);
        let actions: Vec<i32> = batch.iter().map(|e| e.action.index() as i32).collect();
        let actions = Tensor::<B, 1, Int>::from_ints(actions.as_slice(), &self.device);
        let targets = Tensor::<B, 1>::from_data(TensorData::new(targets, [batch_size]), &self.device);

        let q_taken = self
            .network
            .forward(observations)
            .gather(1, actions.unsqueeze_dim(1))
            .squeeze::<1>(1);

        let loss = MseLoss::new().forward(q_taken, targets, Reduction::Mean);
        let loss_value = loss.clone().into_scalar().elem::<f32>();
        if !loss_value.is_finite() {
            return Err(LearnError::NonFinite { loss: loss_value });
        }

        let grads = GradientsParams::from_grads(loss.backward(), &self.network);
        self.network = self
            .optim
            .step(self.config.learning_rate, self.network.clone(), grads);

        self.stats.record_loss(loss_value);
        Ok(loss_value)
    }

    pub fn episode_count(&self) -> usize {
        self.episode_count
    }

    pub fn network(&self) -> &QNetwork<B> {
        &self.network
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    pub fn stats(&self) -> &TrainingStats {
        &self.stats
    }

    pub fn memory(&self) -> &ReplayBuffer {
        &self.memory
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    pub fn score_history(&self) -> &[u32] {
        self.stats.score_history()
    }

    pub fn mean_score_history(&self) -> &[f32] {
        self.stats.mean_score_history()
    }

    pub fn loss_history(&self) -> &[f32] {
        self.stats.loss_history()
    }
}

/// Index of the largest value, the first one on ties
fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &value) in values.iter().enumerate().skip(1) {
        if value > values[best] {
            best = i;
        }
    }
    best
}
