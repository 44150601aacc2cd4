//! Error type for the actor-critic agent

use std::fmt;

/// Errors raised by [`ActorCriticAgent`](super::ActorCriticAgent) operations.
///
/// Every variant aborts the current call. None of them leave the trajectory
/// buffer half-updated.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentError {
    /// A tensor did not have the shape the network or trajectory expects.
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Reward count and output count diverged.
    BufferDesync { outputs: usize, rewards: usize },

    /// `backward()` was called with nothing recorded.
    EmptyEpisode,

    /// Configuration failed validation.
    InvalidConfig(String),

    /// Tensor data could not be read back into host memory.
    TensorData(String),
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch {
                what,
                expected,
                actual,
            } => write!(f, "{what}: expected shape {expected:?}, got {actual:?}"),
            Self::BufferDesync { outputs, rewards } => write!(
                f,
                "trajectory out of sync: {outputs} recorded outputs but {rewards} rewards"
            ),
            Self::EmptyEpisode => write!(f, "backward called on an empty trajectory"),
            Self::InvalidConfig(msg) => write!(f, "invalid agent configuration: {msg}"),
            Self::TensorData(msg) => write!(f, "failed to read tensor data: {msg}"),
        }
    }
}

impl std::error::Error for AgentError {}
