//! Environment interface seen by the agent
//!
//! The agent never drives a game itself. Whatever produces screens implements
//! [`Environment`], and its states implement [`Observation`] so the agent can
//! pull a `[batch, C, H, W]` screen tensor out of them.

use burn::tensor::{Distribution, Tensor, backend::Backend};
use serde::{Deserialize, Serialize};

use super::agent::MIN_TRAINING_BATCH;

/// Anything the agent can read a batch of screens from
pub trait Observation<B: Backend> {
    /// Screen tensor with shape `[batch, channels, height, width]`
    fn screen(&self) -> Tensor<B, 4>;
}

impl<B: Backend> Observation<B> for Tensor<B, 4> {
    fn screen(&self) -> Tensor<B, 4> {
        self.clone()
    }
}

/// Screen plus the number of steps taken since the last reset
#[derive(Debug, Clone)]
pub struct ScreenState<B: Backend> {
    pub screen: Tensor<B, 4>,
    pub step: usize,
}

impl<B: Backend> ScreenState<B> {
    pub fn new(screen: Tensor<B, 4>) -> Self {
        Self { screen, step: 0 }
    }

    pub fn batch_size(&self) -> usize {
        self.screen.dims()[0]
    }
}

impl<B: Backend> Observation<B> for ScreenState<B> {
    fn screen(&self) -> Tensor<B, 4> {
        self.screen.clone()
    }
}

/// Outcome of one environment step
#[derive(Debug, Clone)]
pub struct EnvStep<S> {
    /// State after the actions were applied
    pub state: S,
    /// Raw (unscaled) reward per batch element
    pub rewards: Vec<f32>,
    /// `true` once the episode has ended
    pub done: bool,
}

/// A batched environment with a discrete action space
pub trait Environment<B: Backend> {
    type State: Observation<B>;

    /// Start a new episode
    fn reset(&mut self) -> Self::State;

    /// Apply one action per batch element
    fn step(&mut self, actions: &[usize]) -> EnvStep<Self::State>;

    /// Size of the discrete action space
    fn action_count(&self) -> usize;
}

/// Settings for [`NoiseEnvironment`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseEnvConfig {
    /// Screens per step, at least 2 for training (default: 2)
    pub batch_size: usize,

    /// Steps before `done` is reported (default: 32)
    pub episode_length: usize,

    /// The action that pays a reward of 1 (default: 0)
    pub target_action: usize,
}

impl Default for NoiseEnvConfig {
    fn default() -> Self {
        Self {
            batch_size: 2,
            episode_length: 32,
            target_action: 0,
        }
    }
}

impl NoiseEnvConfig {
    pub fn validate(&self, action_count: usize) -> Result<(), String> {
        if self.batch_size < MIN_TRAINING_BATCH {
            return Err(format!(
                "batch_size must be at least {}, got {}",
                MIN_TRAINING_BATCH, self.batch_size
            ));
        }

        if self.episode_length == 0 {
            return Err("episode_length must be at least 1".to_string());
        }

        if self.target_action >= action_count {
            return Err(format!(
                "target_action {} is outside the action space of {}",
                self.target_action, action_count
            ));
        }

        Ok(())
    }
}

/// Synthetic environment emitting uniform noise screens
///
/// Pays 1 for the target action and 0 otherwise, so a learning agent drifts
/// toward the target. Used to drive the training binary and tests.
pub struct NoiseEnvironment<B: Backend> {
    config: NoiseEnvConfig,
    screen_size: [usize; 3],
    action_count: usize,
    step: usize,
    device: B::Device,
}

impl<B: Backend> NoiseEnvironment<B> {
    pub fn new(
        config: NoiseEnvConfig,
        screen_size: [usize; 3],
        action_count: usize,
        device: B::Device,
    ) -> Self {
        Self {
            config,
            screen_size,
            action_count,
            step: 0,
            device,
        }
    }

    fn observe(&self) -> ScreenState<B> {
        let [channels, height, width] = self.screen_size;
        let screen = Tensor::random(
            [self.config.batch_size, channels, height, width],
            Distribution::Uniform(0.0, 1.0),
            &self.device,
        );
        ScreenState {
            screen,
            step: self.step,
        }
    }
}

impl<B: Backend> Environment<B> for NoiseEnvironment<B> {
    type State = ScreenState<B>;

    fn reset(&mut self) -> ScreenState<B> {
        self.step = 0;
        self.observe()
    }

    fn step(&mut self, actions: &[usize]) -> EnvStep<ScreenState<B>> {
        self.step += 1;

        let rewards = actions
            .iter()
            .map(|&action| {
                if action == self.config.target_action {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();

        EnvStep {
            state: self.observe(),
            rewards,
            done: self.step >= self.config.episode_length,
        }
    }

    fn action_count(&self) -> usize {
        self.action_count
    }
}
