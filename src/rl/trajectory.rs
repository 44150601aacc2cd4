//! Episode-scoped trajectory buffer
//!
//! Holds what the learning step needs from each training-mode forward pass
//! (sampled actions, their log-probabilities and the value estimate, all still
//! attached to the autodiff graph) next to the rewards that followed them.
//!
//! The two sequences advance in lockstep: a reward may only be recorded for an
//! output that does not have one yet. [`Trajectory::drain`] hands out both
//! sequences and leaves the buffer empty in the same call.

use burn::tensor::{Tensor, backend::AutodiffBackend};

use super::error::AgentError;

/// What a single training-mode forward pass leaves behind
#[derive(Debug, Clone)]
pub struct StepRecord<B: AutodiffBackend> {
    /// Sampled action per batch element
    pub actions: Vec<usize>,

    /// log π(a|s) of the sampled actions `[batch]`
    pub log_probs: Tensor<B, 1>,

    /// Critic estimate V(s) `[batch, 1]`
    pub value: Tensor<B, 2>,
}

impl<B: AutodiffBackend> StepRecord<B> {
    /// Number of batch elements in this step
    pub fn batch_size(&self) -> usize {
        self.actions.len()
    }
}

/// Ordered outputs and rewards of the current episode
///
/// # Example
///
/// ```rust
/// use doom_a2c::rl::{StepRecord, Trajectory};
/// use burn::backend::{Autodiff, ndarray::{NdArray, NdArrayDevice}};
/// use burn::tensor::Tensor;
///
/// type Backend = Autodiff<NdArray<f32>>;
///
/// let device = NdArrayDevice::default();
/// let mut trajectory = Trajectory::<Backend>::new();
///
/// trajectory.push_output(StepRecord {
///     actions: vec![1],
///     log_probs: Tensor::from_floats([-0.5], &device),
///     value: Tensor::from_floats([[0.2]], &device),
/// });
/// trajectory.push_reward(Tensor::from_floats([0.01], &device)).unwrap();
///
/// assert_eq!(trajectory.len(), 1);
/// assert!(trajectory.is_consistent());
/// ```
#[derive(Debug)]
pub struct Trajectory<B: AutodiffBackend> {
    outputs: Vec<StepRecord<B>>,
    rewards: Vec<Tensor<B::InnerBackend, 1>>,
}

impl<B: AutodiffBackend> Trajectory<B> {
    /// Create an empty trajectory
    pub fn new() -> Self {
        Self {
            outputs: Vec::new(),
            rewards: Vec::new(),
        }
    }

    /// Record the output of a training-mode forward pass
    pub fn push_output(&mut self, record: StepRecord<B>) {
        self.outputs.push(record);
    }

    /// Record the reward for the oldest output that has none yet
    ///
    /// The reward must already be scaled and on the model device.
    ///
    /// # Errors
    ///
    /// - [`AgentError::BufferDesync`] if every output already has its reward
    /// - [`AgentError::ShapeMismatch`] if the reward batch differs from the step's batch
    pub fn push_reward(&mut self, reward: Tensor<B::InnerBackend, 1>) -> Result<(), AgentError> {
        let Some(record) = self.outputs.get(self.rewards.len()) else {
            return Err(AgentError::BufferDesync {
                outputs: self.outputs.len(),
                rewards: self.rewards.len() + 1,
            });
        };

        let [reward_batch] = reward.dims();
        if reward_batch != record.batch_size() {
            return Err(AgentError::ShapeMismatch {
                what: "reward batch",
                expected: vec![record.batch_size()],
                actual: vec![reward_batch],
            });
        }

        self.rewards.push(reward);
        Ok(())
    }

    /// Number of recorded outputs
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Number of recorded rewards
    pub fn reward_count(&self) -> usize {
        self.rewards.len()
    }

    /// `true` if no output has been recorded
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// `true` if every recorded output has exactly one reward
    pub fn is_consistent(&self) -> bool {
        self.outputs.len() == self.rewards.len()
    }

    /// Batch size of the most recent output
    pub fn last_batch_size(&self) -> Option<usize> {
        self.outputs.last().map(StepRecord::batch_size)
    }

    /// Recorded rewards in step order
    pub fn rewards(&self) -> &[Tensor<B::InnerBackend, 1>] {
        &self.rewards
    }

    /// Recorded outputs in step order
    pub fn outputs(&self) -> &[StepRecord<B>] {
        &self.outputs
    }

    /// Take both sequences out, leaving the trajectory empty
    pub fn drain(&mut self) -> (Vec<StepRecord<B>>, Vec<Tensor<B::InnerBackend, 1>>) {
        (
            std::mem::take(&mut self.outputs),
            std::mem::take(&mut self.rewards),
        )
    }

    /// Drop everything recorded so far
    pub fn clear(&mut self) {
        self.outputs.clear();
        self.rewards.clear();
    }
}

impl<B: AutodiffBackend> Default for Trajectory<B> {
    fn default() -> Self {
        Self::new()
    }
}
