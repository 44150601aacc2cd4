//! Training mode for the actor-critic agent
//!
//! Runs episodes against a [`NoiseEnvironment`], feeds rewards to the agent and
//! applies the gradients of each learning step with Adam. A learning step happens
//! at the end of every episode and, if `update_frequency` is set, every that many
//! steps inside an episode.
//!
//! # Example
//!
//! ```rust,no_run
//! use doom_a2c::modes::{TrainConfig, TrainMode};
//! use doom_a2c::rl::{AgentConfig, TrainingBackend, default_device};
//!
//! let mut config = TrainConfig::new(500);
//! config.agent = AgentConfig::new([3, 60, 80], 4);
//!
//! let mut train_mode = TrainMode::<TrainingBackend>::new(config, default_device())?;
//! train_mode.run()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context, Result, ensure};
use burn::{
    optim::{Adam, AdamConfig, Optimizer, adaptor::OptimizerAdaptor},
    tensor::backend::AutodiffBackend,
};
use tracing::info;

use crate::metrics::TrainingStats;
use crate::rl::{
    ActorCriticAgent, ActorCriticNetwork, AgentConfig, Environment, Mode, NoiseEnvConfig,
    NoiseEnvironment,
};

/// Configuration for training mode
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Number of episodes to train
    pub num_episodes: usize,

    /// Hard cap on steps per episode
    pub max_steps: usize,

    /// Learn every N steps inside an episode; `None` learns at episode end only
    pub update_frequency: Option<usize>,

    /// Adam learning rate
    pub learning_rate: f64,

    /// Log training progress every N episodes
    pub log_frequency: usize,

    /// Evaluation-mode episodes run after training (0 disables evaluation)
    pub eval_episodes: usize,

    /// Agent hyperparameters
    pub agent: AgentConfig,

    /// Synthetic environment settings
    pub env: NoiseEnvConfig,
}

impl TrainConfig {
    /// Create a training configuration with defaults
    ///
    /// ```rust
    /// use doom_a2c::modes::TrainConfig;
    ///
    /// let config = TrainConfig::new(1000);
    /// assert_eq!(config.num_episodes, 1000);
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn new(num_episodes: usize) -> Self {
        Self {
            num_episodes,
            max_steps: 1000,
            update_frequency: None,
            learning_rate: 1e-4,
            log_frequency: 10,
            eval_episodes: 5,
            agent: AgentConfig::default(),
            env: NoiseEnvConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_steps == 0 {
            return Err("max_steps must be at least 1".to_string());
        }

        if self.update_frequency == Some(0) {
            return Err("update_frequency must be at least 1".to_string());
        }

        if !(self.learning_rate > 0.0) {
            return Err(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }

        if self.log_frequency == 0 {
            return Err("log_frequency must be at least 1".to_string());
        }

        self.agent.validate()?;
        self.env.validate(self.agent.action_count)
    }
}

/// Training mode for the actor-critic agent
pub struct TrainMode<B: AutodiffBackend> {
    agent: ActorCriticAgent<B>,

    /// External optimizer applied to the agent's gradients
    optim: OptimizerAdaptor<Adam, ActorCriticNetwork<B>, B>,

    env: NoiseEnvironment<B::InnerBackend>,

    stats: TrainingStats,

    config: TrainConfig,
}

impl<B: AutodiffBackend> TrainMode<B> {
    /// Build the agent, optimizer and environment on `device`
    pub fn new(config: TrainConfig, device: B::Device) -> Result<Self> {
        config
            .validate()
            .map_err(anyhow::Error::msg)
            .context("Invalid training configuration")?;

        let agent = ActorCriticAgent::new(config.agent.clone(), device.clone())
            .context("Failed to build actor-critic agent")?;
        let env = NoiseEnvironment::new(
            config.env.clone(),
            config.agent.screen_size,
            config.agent.action_count,
            device,
        );
        ensure!(
            env.action_count() == agent.config().action_count,
            "environment offers {} actions but the agent chooses between {}",
            env.action_count(),
            agent.config().action_count
        );

        Ok(Self {
            agent,
            optim: AdamConfig::new().init(),
            env,
            // 100-episode rolling window
            stats: TrainingStats::new(100),
            config,
        })
    }

    /// Train for the configured number of episodes, then evaluate
    pub fn run(&mut self) -> Result<()> {
        self.log_header();

        for episode in 0..self.config.num_episodes {
            let (episode_reward, episode_steps) = self
                .run_episode()
                .with_context(|| format!("Training episode {} failed", episode + 1))?;
            self.stats.record_episode(episode_reward, episode_steps);

            if (episode + 1) % self.config.log_frequency == 0 {
                info!(
                    "[Episode {}/{}] {}",
                    episode + 1,
                    self.config.num_episodes,
                    self.stats.format_summary()
                );
            }
        }

        if self.config.eval_episodes > 0 {
            let mean_reward = self.evaluate(self.config.eval_episodes)?;
            self.stats.record_evaluation(mean_reward);
            info!(
                episodes = self.config.eval_episodes,
                mean_reward, "evaluation complete"
            );
        }

        info!("Training complete: {}", self.stats.format_summary());
        Ok(())
    }

    /// Run one training episode
    ///
    /// Returns the total reward (over steps and batch elements) and the number
    /// of steps taken.
    pub fn run_episode(&mut self) -> Result<(f32, usize)> {
        let mut state = self.env.reset();
        let mut episode_reward = 0.0;
        let mut episode_steps = 0;

        loop {
            let actions = self.agent.get_action(&state, Mode::Training)?;
            let step = self.env.step(&actions);
            self.agent.set_rewards(&step.rewards)?;

            episode_reward += step.rewards.iter().sum::<f32>();
            episode_steps += 1;
            state = step.state;

            let done = step.done || episode_steps >= self.config.max_steps;
            let boundary = self
                .config
                .update_frequency
                .is_some_and(|n| episode_steps % n == 0);

            if done || boundary {
                self.learn()?;
            }
            if done {
                break;
            }
        }

        Ok((episode_reward, episode_steps))
    }

    /// Turn the recorded trajectory into one optimizer step
    fn learn(&mut self) -> Result<()> {
        let update = self.agent.backward()?;

        let network = self.optim.step(
            self.config.learning_rate,
            self.agent.network().clone(),
            update.gradients,
        );
        self.agent.set_network(network);

        self.stats
            .record_update(update.policy_loss, update.value_loss, update.mean_return);
        Ok(())
    }

    /// Run evaluation-mode episodes and return the mean episode reward
    ///
    /// Nothing is recorded in the agent's trajectory.
    pub fn evaluate(&mut self, episodes: usize) -> Result<f32> {
        let mut total_reward = 0.0;

        for _ in 0..episodes {
            let mut state = self.env.reset();
            for _ in 0..self.config.max_steps {
                let actions = self.agent.get_action(&state, Mode::Evaluation)?;
                let step = self.env.step(&actions);
                total_reward += step.rewards.iter().sum::<f32>();
                state = step.state;
                if step.done {
                    break;
                }
            }
        }

        Ok(total_reward / episodes.max(1) as f32)
    }

    pub fn stats(&self) -> &TrainingStats {
        &self.stats
    }

    pub fn agent(&self) -> &ActorCriticAgent<B> {
        &self.agent
    }

    fn log_header(&self) {
        let agent = &self.config.agent;
        info!(
            episodes = self.config.num_episodes,
            max_steps = self.config.max_steps,
            update_frequency = ?self.config.update_frequency,
            learning_rate = self.config.learning_rate,
            "A2C training"
        );
        info!(
            screen = ?agent.screen_size,
            actions = agent.action_count,
            discount = agent.discount,
            feature_dim = agent.feature_dim,
            batch_size = self.config.env.batch_size,
            episode_length = self.config.env.episode_length,
            "agent configuration"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::{TrainingBackend, default_device};

    fn small_config(num_episodes: usize) -> TrainConfig {
        let mut config = TrainConfig::new(num_episodes);
        config.agent = AgentConfig {
            seed: Some(3),
            ..AgentConfig::new([3, 30, 40], 4)
        };
        config.env = NoiseEnvConfig {
            batch_size: 2,
            episode_length: 4,
            target_action: 1,
        };
        config.eval_episodes = 1;
        config.log_frequency = 1;
        config
    }

    #[test]
    fn test_train_config_creation() {
        let config = TrainConfig::new(1000);
        assert_eq!(config.num_episodes, 1000);
        assert_eq!(config.update_frequency, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_train_config_validation() {
        let mut config = small_config(1);
        config.update_frequency = Some(0);
        assert!(config.validate().is_err());

        let mut config = small_config(1);
        config.learning_rate = 0.0;
        assert!(config.validate().is_err());

        let mut config = small_config(1);
        config.env.target_action = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_train_config_rejects_single_screen_batches() {
        let mut config = small_config(1);
        config.env.batch_size = 1;

        assert!(config.validate().is_err());
        assert!(TrainMode::<TrainingBackend>::new(config, default_device()).is_err());
    }

    #[test]
    fn test_train_mode_rejects_small_screen() {
        let mut config = small_config(1);
        config.agent.screen_size = [3, 8, 8];

        assert!(TrainMode::<TrainingBackend>::new(config, default_device()).is_err());
    }

    #[test]
    fn test_run_single_episode() {
        let mut train_mode =
            TrainMode::<TrainingBackend>::new(small_config(1), default_device()).unwrap();

        let (reward, steps) = train_mode.run_episode().unwrap();

        assert_eq!(steps, 4);
        assert!((0.0..=8.0).contains(&reward));
        assert_eq!(train_mode.stats().total_updates(), 1);
        assert!(train_mode.agent().trajectory().is_empty());
    }

    #[test]
    fn test_periodic_updates() {
        let mut config = small_config(1);
        config.update_frequency = Some(2);
        let mut train_mode = TrainMode::<TrainingBackend>::new(config, default_device()).unwrap();

        train_mode.run_episode().unwrap();

        // Steps 2 and 4; the episode end coincides with the second boundary.
        assert_eq!(train_mode.stats().total_updates(), 2);
        assert!(train_mode.agent().trajectory().is_empty());
    }

    #[test]
    fn test_max_steps_cuts_episode() {
        let mut config = small_config(1);
        config.max_steps = 2;
        let mut train_mode = TrainMode::<TrainingBackend>::new(config, default_device()).unwrap();

        let (_, steps) = train_mode.run_episode().unwrap();
        assert_eq!(steps, 2);
    }

    #[test]
    fn test_evaluate_leaves_trajectory_empty() {
        let mut train_mode =
            TrainMode::<TrainingBackend>::new(small_config(1), default_device()).unwrap();

        let mean_reward = train_mode.evaluate(2).unwrap();

        assert!((0.0..=8.0).contains(&mean_reward));
        assert!(train_mode.agent().trajectory().is_empty());
    }

    #[test]
    fn test_full_run() {
        let mut train_mode =
            TrainMode::<TrainingBackend>::new(small_config(2), default_device()).unwrap();

        train_mode.run().unwrap();

        let stats = train_mode.stats();
        assert_eq!(stats.total_episodes(), 2);
        assert_eq!(stats.total_steps(), 8);
        assert_eq!(stats.total_updates(), 2);
        assert!(stats.last_evaluation().is_some());
    }
}
