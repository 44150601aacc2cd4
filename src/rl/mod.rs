//! Convolutional advantage actor-critic
//!
//! Provides:
//! - A convolutional actor-critic network over `[batch, C, H, W]` screens
//! - An agent that samples actions, records an episode and turns it into gradients
//! - Bootstrapped discounted returns and the joint actor-critic loss
//! - The environment interface the agent is driven through

pub mod agent;
pub mod backend;
pub mod config;
pub mod environment;
pub mod error;
pub mod loss;
pub mod network;
pub mod returns;
pub mod trajectory;

pub use agent::{
    ActorCriticAgent, MIN_TRAINING_BATCH, Mode, PolicyOutput, REWARD_SCALE, TrainingUpdate,
    sample_categorical,
};
#[cfg(feature = "wgpu")]
pub use backend::{AcceleratedBackend, accelerated_device};
pub use backend::{
    InferenceBackend, TrainingBackend, accelerator_available, default_device, to_model_device,
};
pub use config::AgentConfig;
pub use environment::{
    EnvStep, Environment, NoiseEnvConfig, NoiseEnvironment, Observation, ScreenState,
};
pub use error::AgentError;
pub use loss::{policy_gradient_loss, smooth_l1_loss};
pub use network::{ActorCriticConfig, ActorCriticNetwork};
pub use returns::discounted_returns;
pub use trajectory::{StepRecord, Trajectory};
