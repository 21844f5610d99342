//! Experience replay buffer for off-policy Q-learning
//!
//! Fixed-capacity FIFO: once full, every push evicts the oldest experience.
//! Minibatches are sampled uniformly and returned as owned copies.

use std::collections::VecDeque;

use rand::Rng;
use rand::seq::index;

use super::observation::Observation;
use crate::game::RelativeAction;

/// One transition `(s, a, r, s', done)`
#[derive(Debug, Clone, PartialEq)]
pub struct Experience {
    pub observation: Observation,
    pub action: RelativeAction,
    pub reward: f32,
    pub next_observation: Observation,
    pub terminal: bool,
}

/// Replay memory shared by all game instances
///
/// # Example
///
/// ```rust
/// use snake_dqn::game::RelativeAction;
/// use snake_dqn::rl::{Experience, ReplayBuffer};
///
/// let mut buffer = ReplayBuffer::new(2);
/// for reward in [1.0, 2.0, 3.0] {
///     buffer.push(Experience {
///         observation: [0.0; 11],
///         action: RelativeAction::Forward,
///         reward,
///         next_observation: [0.0; 11],
///         terminal: false,
///     });
/// }
///
/// assert_eq!(buffer.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    items: VecDeque<Experience>,
    capacity: usize,
}

impl ReplayBuffer {
    /// Create an empty buffer holding at most `capacity` experiences
    ///
    /// A zero capacity is bumped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    /// Append an experience, evicting the oldest one when full
    pub fn push(&mut self, experience: Experience) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(experience);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest-first iterator over the stored experiences
    pub fn iter(&self) -> impl Iterator<Item = &Experience> {
        self.items.iter()
    }

    /// Draw a minibatch of `batch_size` experiences
    ///
    /// With fewer items than `batch_size`, indices are drawn uniformly with
    /// replacement; otherwise `batch_size` distinct items are drawn.
    /// Returns an empty batch when the buffer is empty.
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Vec<Experience> {
        let len = self.items.len();
        if len == 0 || batch_size == 0 {
            return Vec::new();
        }

        if len < batch_size {
            (0..batch_size)
                .map(|_| self.items[rng.gen_range(0..len)].clone())
                .collect()
        } else {
            index::sample(rng, len, batch_size)
                .into_iter()
                .map(|i| self.items[i].clone())
                .collect()
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
