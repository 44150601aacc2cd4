//! Training statistics tracking for the actor-critic driver
//!
//! Rolling windows over episode rewards and lengths, and over the losses and
//! mean returns reported by each learning step.

use std::collections::VecDeque;

/// Training statistics tracker with rolling averages
///
/// # Example
///
/// ```rust
/// use doom_a2c::metrics::TrainingStats;
///
/// let mut stats = TrainingStats::new(100);
///
/// stats.record_episode(15.5, 150);
/// stats.record_update(-0.02, 0.05, 0.4);
///
/// println!("Mean reward: {}", stats.mean_episode_reward());
/// println!("{}", stats.format_summary());
/// ```
#[derive(Debug, Clone)]
pub struct TrainingStats {
    /// Episode rewards, summed over steps and batch elements (rolling window)
    episode_rewards: VecDeque<f32>,

    /// Episode lengths in steps (rolling window)
    episode_lengths: VecDeque<usize>,

    policy_losses: VecDeque<f32>,
    value_losses: VecDeque<f32>,

    /// Mean discounted return of each learning step (rolling window)
    mean_returns: VecDeque<f32>,

    /// Mean reward of the most recent evaluation run
    last_evaluation: Option<f32>,

    total_episodes: usize,
    total_steps: usize,
    total_updates: usize,

    window_size: usize,
}

impl TrainingStats {
    /// Create a tracker keeping the last `window_size` values of each series
    pub fn new(window_size: usize) -> Self {
        Self {
            episode_rewards: VecDeque::with_capacity(window_size),
            episode_lengths: VecDeque::with_capacity(window_size),
            policy_losses: VecDeque::with_capacity(window_size),
            value_losses: VecDeque::with_capacity(window_size),
            mean_returns: VecDeque::with_capacity(window_size),
            last_evaluation: None,
            total_episodes: 0,
            total_steps: 0,
            total_updates: 0,
            window_size,
        }
    }

    /// Record the completion of a training episode
    ///
    /// ```rust
    /// use doom_a2c::metrics::TrainingStats;
    ///
    /// let mut stats = TrainingStats::new(100);
    /// stats.record_episode(15.5, 150);
    ///
    /// assert_eq!(stats.total_episodes(), 1);
    /// assert_eq!(stats.total_steps(), 150);
    /// ```
    pub fn record_episode(&mut self, reward: f32, length: usize) {
        Self::push_deque(&mut self.episode_rewards, reward, self.window_size);
        Self::push_deque(&mut self.episode_lengths, length, self.window_size);
        self.total_episodes += 1;
        self.total_steps += length;
    }

    /// Record the outcome of one learning step
    pub fn record_update(&mut self, policy_loss: f32, value_loss: f32, mean_return: f32) {
        Self::push_deque(&mut self.policy_losses, policy_loss, self.window_size);
        Self::push_deque(&mut self.value_losses, value_loss, self.window_size);
        Self::push_deque(&mut self.mean_returns, mean_return, self.window_size);
        self.total_updates += 1;
    }

    /// Record the mean episode reward of an evaluation run
    pub fn record_evaluation(&mut self, mean_reward: f32) {
        self.last_evaluation = Some(mean_reward);
    }

    /// Mean episode reward over the window, 0.0 if empty
    pub fn mean_episode_reward(&self) -> f32 {
        Self::mean(&self.episode_rewards)
    }

    /// Mean episode length over the window, 0.0 if empty
    pub fn mean_episode_length(&self) -> f32 {
        if self.episode_lengths.is_empty() {
            return 0.0;
        }
        let sum: usize = self.episode_lengths.iter().sum();
        sum as f32 / self.episode_lengths.len() as f32
    }

    pub fn mean_policy_loss(&self) -> f32 {
        Self::mean(&self.policy_losses)
    }

    pub fn mean_value_loss(&self) -> f32 {
        Self::mean(&self.value_losses)
    }

    pub fn mean_return(&self) -> f32 {
        Self::mean(&self.mean_returns)
    }

    pub fn last_evaluation(&self) -> Option<f32> {
        self.last_evaluation
    }

    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn total_updates(&self) -> usize {
        self.total_updates
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// One-line summary of the current windows
    ///
    /// ```text
    /// Episodes: 1 | Steps: 150 | Updates: 1 | Reward: 15.50 | Len: 150.0 | P_Loss: -0.0200 | V_Loss: 0.0500 | Return: 0.4000
    /// ```
    pub fn format_summary(&self) -> String {
        let mut summary = format!(
            "Episodes: {} | Steps: {} | Updates: {} | Reward: {:.2} | Len: {:.1} | P_Loss: {:.4} | V_Loss: {:.4} | Return: {:.4}",
            self.total_episodes,
            self.total_steps,
            self.total_updates,
            self.mean_episode_reward(),
            self.mean_episode_length(),
            self.mean_policy_loss(),
            self.mean_value_loss(),
            self.mean_return(),
        );
        if let Some(eval) = self.last_evaluation {
            summary.push_str(&format!(" | Eval: {:.2}", eval));
        }
        summary
    }

    fn mean(deque: &VecDeque<f32>) -> f32 {
        if deque.is_empty() {
            0.0
        } else {
            deque.iter().sum::<f32>() / deque.len() as f32
        }
    }

    fn push_deque<T>(deque: &mut VecDeque<T>, value: T, window_size: usize) {
        if deque.len() >= window_size {
            deque.pop_front();
        }
        deque.push_back(value);
    }
}
