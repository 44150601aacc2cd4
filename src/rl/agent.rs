//! Advantage actor-critic agent
//!
//! The agent owns the network and the trajectory of the running episode. A
//! training loop drives it through three calls:
//!
//! 1. [`ActorCriticAgent::forward`] (or [`get_action`](ActorCriticAgent::get_action))
//!    in [`Mode::Training`] samples an action and records the step
//! 2. [`ActorCriticAgent::set_reward`] records what the environment paid for it
//! 3. [`ActorCriticAgent::backward`] at the episode boundary turns the trajectory
//!    into gradients and empties it
//!
//! Applying the gradients is left to the caller's optimizer.

use burn::{
    module::AutodiffModule,
    optim::GradientsParams,
    tensor::{
        ElementConversion, Int, Tensor, TensorData,
        activation::{log_softmax, softmax},
        backend::{AutodiffBackend, Backend},
    },
};
use rand::{Rng, SeedableRng, distributions::Standard, rngs::StdRng};
use tracing::{debug, warn};

use super::backend::to_model_device;
use super::config::AgentConfig;
use super::environment::Observation;
use super::error::AgentError;
use super::loss::{policy_gradient_loss, smooth_l1_loss};
use super::network::ActorCriticNetwork;
use super::returns::discounted_returns;
use super::trajectory::{StepRecord, Trajectory};

/// Factor applied to every reward before it is recorded
pub const REWARD_SCALE: f32 = 0.01;

/// Smallest batch a training-mode forward accepts
///
/// With a single row the batch variance is zero and every screen maps to the
/// same features.
pub const MIN_TRAINING_BATCH: usize = 2;

/// Selects how the policy is used in a forward pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Sample actions, evaluate the critic and record the step
    Training,
    /// Take the most probable action; the critic is not evaluated
    Evaluation,
}

/// Result of a forward pass
#[derive(Debug, Clone)]
pub struct PolicyOutput<B: Backend> {
    /// Chosen action per batch element, in `[0, action_count)`
    pub actions: Vec<usize>,

    /// Critic estimate `[batch, 1]`, only populated in [`Mode::Training`]
    pub value: Option<Tensor<B, 2>>,
}

/// Result of a learning step
#[derive(Debug)]
pub struct TrainingUpdate {
    /// Parameter gradients for an external optimizer
    pub gradients: GradientsParams,

    /// Policy-gradient surrogate summed over the episode
    pub policy_loss: f32,

    /// Smooth L1 critic loss summed over the episode
    pub value_loss: f32,

    /// Number of steps consumed
    pub steps: usize,

    /// Mean discounted return over steps and batch elements
    pub mean_return: f32,
}

/// Convolutional advantage actor-critic agent
///
/// # Type Parameters
///
/// * `B` - Autodiff backend for gradient computation
///
/// # Example
///
/// ```rust
/// use doom_a2c::rl::{ActorCriticAgent, AgentConfig, Mode, TrainingBackend, default_device};
/// use burn::tensor::Tensor;
///
/// let device = default_device();
/// let config = AgentConfig::new([3, 30, 40], 4);
/// let mut agent = ActorCriticAgent::<TrainingBackend>::new(config, device.clone()).unwrap();
///
/// for reward in [1.0, 0.0, 1.0] {
///     let screen = Tensor::zeros([2, 3, 30, 40], &device);
///     let output = agent.forward(screen, Mode::Training).unwrap();
///     assert_eq!(output.actions.len(), 2);
///     agent.set_scalar_reward(reward).unwrap();
/// }
///
/// let update = agent.backward().unwrap();
/// assert_eq!(update.steps, 3);
/// assert!(agent.trajectory().is_empty());
/// ```
pub struct ActorCriticAgent<B: AutodiffBackend> {
    network: ActorCriticNetwork<B>,
    /// Inference copy of `network`, rebuilt after any change to it
    inference: Option<ActorCriticNetwork<B::InnerBackend>>,
    config: AgentConfig,
    trajectory: Trajectory<B>,
    rng: StdRng,
    device: B::Device,
}

impl<B: AutodiffBackend> ActorCriticAgent<B> {
    /// Build an agent and its network on `device`
    ///
    /// # Errors
    ///
    /// - [`AgentError::ShapeMismatch`] if the screen is too small for the convolutional stack
    /// - [`AgentError::InvalidConfig`] for any other invalid setting
    pub fn new(config: AgentConfig, device: B::Device) -> Result<Self, AgentError> {
        let network_config = config.network_config();
        network_config.check_screen()?;
        config.validate().map_err(AgentError::InvalidConfig)?;

        let network = network_config.init::<B>(&device)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            network,
            inference: None,
            config,
            trajectory: Trajectory::new(),
            rng,
            device,
        })
    }

    /// Run the network on a batch of screens `[batch, C, H, W]`
    ///
    /// In [`Mode::Training`] exactly one step is appended to the trajectory. Batch
    /// normalization needs at least two screens per training batch.
    pub fn forward(
        &mut self,
        observation: Tensor<B::InnerBackend, 4>,
        mode: Mode,
    ) -> Result<PolicyOutput<B::InnerBackend>, AgentError> {
        self.check_observation(&observation, mode)?;

        match mode {
            Mode::Evaluation => self.forward_evaluation(observation),
            Mode::Training => self.forward_training(observation),
        }
    }

    /// Choose actions for an environment state
    ///
    /// The returned indices carry no graph and can be handed straight to the
    /// environment.
    pub fn get_action<S>(&mut self, state: &S, mode: Mode) -> Result<Vec<usize>, AgentError>
    where
        S: Observation<B::InnerBackend>,
    {
        let screen = to_model_device(state.screen(), &self.device);
        Ok(self.forward(screen, mode)?.actions)
    }

    fn forward_evaluation(
        &mut self,
        observation: Tensor<B::InnerBackend, 4>,
    ) -> Result<PolicyOutput<B::InnerBackend>, AgentError> {
        let network = self.inference.get_or_insert_with(|| self.network.valid());
        let action_logits = network.policy(network.features(observation));

        let best = softmax(action_logits, 1).argmax(1).squeeze::<1>(1);
        let actions = read_actions(best)?;

        Ok(PolicyOutput {
            actions,
            value: None,
        })
    }

    fn forward_training(
        &mut self,
        observation: Tensor<B::InnerBackend, 4>,
    ) -> Result<PolicyOutput<B::InnerBackend>, AgentError> {
        // Batch statistics move the running averages the inference copy was built from.
        self.inference = None;
        let observation = Tensor::<B, 4>::from_inner(observation);

        let features = self.network.features(observation);
        let action_logits = self.network.policy(features.clone());

        let probs = read_floats(softmax(action_logits.clone(), 1).inner())?;
        let actions = sample_categorical(&probs, self.config.action_count, &mut self.rng);

        let indices: Vec<i64> = actions.iter().map(|&a| a as i64).collect();
        let action_tensor = Tensor::<B, 1, Int>::from_data(
            TensorData::new(indices, [actions.len()]).convert::<B::IntElem>(),
            &self.device,
        );
        let log_probs = log_softmax(action_logits, 1)
            .gather(1, action_tensor.unsqueeze_dim::<2>(1))
            .squeeze::<1>(1);

        let value = self.network.value(features);

        self.trajectory.push_output(StepRecord {
            actions: actions.clone(),
            log_probs,
            value: value.clone(),
        });

        Ok(PolicyOutput {
            actions,
            value: Some(value.inner()),
        })
    }

    /// Record the rewards for the oldest step still waiting for one
    ///
    /// `reward` holds one entry per batch element and is scaled by
    /// [`REWARD_SCALE`] before it is stored.
    pub fn set_reward(&mut self, reward: Tensor<B::InnerBackend, 1>) -> Result<(), AgentError> {
        let reward = to_model_device(reward, &self.device) * REWARD_SCALE;
        self.trajectory
            .push_reward(reward)
            .inspect_err(|err| warn!(%err, "rejected reward"))
    }

    /// Record per-batch-element rewards from host memory
    pub fn set_rewards(&mut self, rewards: &[f32]) -> Result<(), AgentError> {
        let reward = Tensor::<B::InnerBackend, 1>::from_floats(rewards, &self.device);
        self.set_reward(reward)
    }

    /// Record one reward shared by every batch element of the pending step
    pub fn set_scalar_reward(&mut self, reward: f32) -> Result<(), AgentError> {
        let batch_size = self
            .trajectory
            .outputs()
            .get(self.trajectory.reward_count())
            .map(StepRecord::batch_size)
            .unwrap_or(1);
        let reward = Tensor::<B::InnerBackend, 1>::full([batch_size], reward, &self.device);
        self.set_reward(reward)
    }

    /// Turn the recorded episode into gradients
    ///
    /// The trajectory is empty afterwards, whether or not the call succeeds.
    ///
    /// # Errors
    ///
    /// - [`AgentError::EmptyEpisode`] if nothing was recorded
    /// - [`AgentError::BufferDesync`] if output and reward counts differ
    pub fn backward(&mut self) -> Result<TrainingUpdate, AgentError> {
        if self.trajectory.is_empty() {
            return Err(AgentError::EmptyEpisode);
        }

        let (outputs, rewards) = self.trajectory.drain();
        if outputs.len() != rewards.len() {
            let err = AgentError::BufferDesync {
                outputs: outputs.len(),
                rewards: rewards.len(),
            };
            warn!(%err, "discarding trajectory");
            return Err(err);
        }
        let steps = outputs.len();

        let bootstrap = outputs[steps - 1].value.clone().inner().squeeze::<1>(1);
        let returns = discounted_returns(&rewards, bootstrap, self.config.discount);
        let mean_return = Tensor::cat(returns.clone(), 0)
            .mean()
            .into_scalar()
            .elem::<f32>();

        let mut policy_loss = Tensor::<B, 1>::zeros([1], &self.device);
        let mut value_loss = Tensor::<B, 1>::zeros([1], &self.device);

        for (record, step_return) in outputs.into_iter().zip(returns) {
            let value = record.value.squeeze::<1>(1);
            let advantage = step_return.clone() - value.clone().inner();

            policy_loss =
                policy_loss + policy_gradient_loss(record.log_probs, Tensor::from_inner(advantage));
            value_loss = value_loss + smooth_l1_loss(value, Tensor::from_inner(step_return));
        }

        let objective = value_loss.clone() + policy_loss.clone();
        let gradients = GradientsParams::from_grads(objective.backward(), &self.network);

        let policy_loss = policy_loss.into_scalar().elem::<f32>();
        let value_loss = value_loss.into_scalar().elem::<f32>();
        debug!(steps, policy_loss, value_loss, mean_return, "learning step");

        Ok(TrainingUpdate {
            gradients,
            policy_loss,
            value_loss,
            steps,
            mean_return,
        })
    }

    /// Drop the current trajectory without learning from it
    pub fn reset(&mut self) {
        self.trajectory.clear();
    }

    fn check_observation(
        &self,
        observation: &Tensor<B::InnerBackend, 4>,
        mode: Mode,
    ) -> Result<(), AgentError> {
        let [batch_size, channels, height, width] = observation.dims();
        let [expected_channels, expected_height, expected_width] = self.config.screen_size;
        let min_batch = match mode {
            Mode::Training => MIN_TRAINING_BATCH,
            Mode::Evaluation => 1,
        };

        if batch_size < min_batch
            || channels != expected_channels
            || height != expected_height
            || width != expected_width
        {
            let what = if batch_size < min_batch {
                "observation (batch too small)"
            } else {
                "observation"
            };
            return Err(AgentError::ShapeMismatch {
                what,
                expected: vec![
                    batch_size.max(min_batch),
                    expected_channels,
                    expected_height,
                    expected_width,
                ],
                actual: vec![batch_size, channels, height, width],
            });
        }

        Ok(())
    }

    /// Get a reference to the neural network
    pub fn network(&self) -> &ActorCriticNetwork<B> {
        &self.network
    }

    /// Replace the network, typically with the result of an optimizer step
    pub fn set_network(&mut self, network: ActorCriticNetwork<B>) {
        self.network = network;
        self.inference = None;
    }

    /// Get a reference to the agent configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Get a reference to the current trajectory
    pub fn trajectory(&self) -> &Trajectory<B> {
        &self.trajectory
    }

    /// Device the model lives on
    pub fn device(&self) -> &B::Device {
        &self.device
    }
}

/// Sample one action per row of a row-major `[batch, num_actions]` probability table
pub fn sample_categorical<R: Rng>(probs: &[f32], num_actions: usize, rng: &mut R) -> Vec<usize> {
    probs
        .chunks(num_actions)
        .map(|row| {
            let random_val: f32 = rng.sample(Standard);
            let mut cumsum = 0.0;

            for (idx, &prob) in row.iter().enumerate() {
                cumsum += prob;
                if random_val < cumsum {
                    return idx;
                }
            }

            // Rounding can leave the cumulative sum just under 1.
            row.len() - 1
        })
        .collect()
}

fn read_floats<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>, AgentError> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|err| AgentError::TensorData(format!("{err:?}")))
}

fn read_actions<B: Backend>(tensor: Tensor<B, 1, Int>) -> Result<Vec<usize>, AgentError> {
    let indices = tensor
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|err| AgentError::TensorData(format!("{err:?}")))?;
    Ok(indices.into_iter().map(|idx| idx as usize).collect())
}
