//! Training statistics tracking for the DQN agent
//!
//! Keeps the full per-episode score history, the trailing mean score after
//! every episode, and the loss of every update, plus rolling windows for
//! smoothed progress reports.

use std::collections::VecDeque;

/// Training statistics tracker with rolling averages
///
/// # Example
///
/// ```rust
/// use snake_dqn::metrics::TrainingStats;
///
/// let mut stats = TrainingStats::new(100);
///
/// stats.record_episode(4);
/// stats.record_episode(6);
/// stats.record_loss(0.5);
///
/// assert_eq!(stats.total_episodes(), 2);
/// assert_eq!(stats.mean_score_history(), &[4.0, 5.0]);
/// assert_eq!(stats.best_score(), 6);
/// ```
#[derive(Debug, Clone)]
pub struct TrainingStats {
    /// Final score of every episode, in order
    score_history: Vec<u32>,

    /// Trailing mean score, one entry per episode
    mean_score_history: Vec<f32>,

    /// Loss of every learning update, in order
    loss_history: Vec<f32>,

    /// Scores inside the trailing window
    recent_scores: VecDeque<u32>,

    /// Losses inside the trailing window
    recent_losses: VecDeque<f32>,

    /// Highest episode score seen
    best_score: u32,

    /// Window size for rolling averages
    window_size: usize,
}

impl TrainingStats {
    /// Create a new tracker averaging over the last `window_size` values
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            score_history: Vec::new(),
            mean_score_history: Vec::new(),
            loss_history: Vec::new(),
            recent_scores: VecDeque::with_capacity(window_size),
            recent_losses: VecDeque::with_capacity(window_size),
            best_score: 0,
            window_size,
        }
    }

    /// Record the final score of a finished episode
    ///
    /// Returns `true` when the score beats every earlier one.
    pub fn record_episode(&mut self, score: u32) -> bool {
        Self::push_deque(&mut self.recent_scores, score, self.window_size);
        self.score_history.push(score);
        self.mean_score_history.push(self.mean_score());

        let new_best = score > self.best_score;
        if new_best {
            self.best_score = score;
        }
        new_best
    }

    /// Record the loss of a learning update
    pub fn record_loss(&mut self, loss: f32) {
        Self::push_deque(&mut self.recent_losses, loss, self.window_size);
        self.loss_history.push(loss);
    }

    /// Mean score over the trailing window, 0.0 before the first episode
    pub fn mean_score(&self) -> f32 {
        if self.recent_scores.is_empty() {
            0.0
        } else {
            let sum: u32 = self.recent_scores.iter().sum();
            sum as f32 / self.recent_scores.len() as f32
        }
    }

    /// Mean loss over the trailing window, 0.0 before the first update
    pub fn mean_loss(&self) -> f32 {
        if self.recent_losses.is_empty() {
            0.0
        } else {
            self.recent_losses.iter().sum::<f32>() / self.recent_losses.len() as f32
        }
    }

    pub fn score_history(&self) -> &[u32] {
        &self.score_history
    }

    pub fn mean_score_history(&self) -> &[f32] {
        &self.mean_score_history
    }

    pub fn loss_history(&self) -> &[f32] {
        &self.loss_history
    }

    pub fn best_score(&self) -> u32 {
        self.best_score
    }

    /// Restore the best score from a saved model
    pub fn restore_best_score(&mut self, best_score: u32) {
        self.best_score = self.best_score.max(best_score);
    }

    /// Number of episodes recorded since this tracker was created
    pub fn total_episodes(&self) -> usize {
        self.score_history.len()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// One-line progress summary
    ///
    /// ```text
    /// Episodes: 120 | Best: 31 | Mean score: 12.40 | Loss: 0.8123
    /// ```
    pub fn format_summary(&self) -> String {
        format!(
            "Episodes: {} | Best: {} | Mean score: {:.2} | Loss: {:.4}",
            self.total_episodes(),
            self.best_score,
            self.mean_score(),
            self.mean_loss(),
        )
    }

    fn push_deque<T>(deque: &mut VecDeque<T>, value: T, window_size: usize) {
        if deque.len() >= window_size {
            deque.pop_front();
        }
        deque.push_back(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let stats = TrainingStats::new(100);
        assert_eq!(stats.window_size(), 100);
        assert_eq!(stats.total_episodes(), 0);
        assert_eq!(stats.mean_score(), 0.0);
        assert_eq!(stats.mean_loss(), 0.0);
    }

    #[test]
    fn test_histories_are_append_only() {
        let mut stats = TrainingStats::new(100);
        for score in [1, 2, 3] {
            stats.record_episode(score);
        }

        assert_eq!(stats.score_history(), &[1, 2, 3]);
        assert_eq!(stats.mean_score_history(), &[1.0, 1.5, 2.0]);
    }

    #[test]
    fn test_mean_uses_trailing_window() {
        let mut stats = TrainingStats::new(2);
        stats.record_episode(10);
        stats.record_episode(0);
        stats.record_episode(4);

        assert!((stats.mean_score() - 2.0).abs() < 1e-6);
        assert_eq!(stats.mean_score_history(), &[10.0, 5.0, 2.0]);
        assert_eq!(stats.score_history().len(), 3);
    }

    #[test]
    fn test_best_score_tracking() {
        let mut stats = TrainingStats::new(10);
        assert!(stats.record_episode(3));
        assert!(!stats.record_episode(3));
        assert!(!stats.record_episode(1));
        assert!(stats.record_episode(7));
        assert_eq!(stats.best_score(), 7);
    }

    #[test]
    fn test_zero_score_is_not_a_new_best() {
        let mut stats = TrainingStats::new(10);
        assert!(!stats.record_episode(0));
    }

    #[test]
    fn test_restore_best_score() {
        let mut stats = TrainingStats::new(10);
        stats.restore_best_score(12);
        assert!(!stats.record_episode(12));
        assert!(stats.record_episode(13));
    }

    #[test]
    fn test_record_loss() {
        let mut stats = TrainingStats::new(2);
        stats.record_loss(1.0);
        stats.record_loss(2.0);
        stats.record_loss(4.0);

        assert_eq!(stats.loss_history(), &[1.0, 2.0, 4.0]);
        assert!((stats.mean_loss() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_format_summary() {
        let mut stats = TrainingStats::new(100);
        stats.record_episode(5);
        stats.record_loss(0.25);

        let summary = stats.format_summary();
        assert!(summary.contains("Episodes: 1"));
        assert!(summary.contains("Best: 5"));
        assert!(summary.contains("Loss: 0.2500"));
    }
}
