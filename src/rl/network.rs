//! Convolutional actor-critic network
//!
//! A convolutional trunk feeds a batch-normalized shared feature vector, which
//! splits into two heads:
//! - **Actor head**: Outputs action logits for the policy
//! - **Critic head**: Outputs a scalar value estimate
//!
//! # Architecture
//!
//! ```text
//! Input: [batch, C, H, W]
//!   ↓ Conv2d(C→32, k=3, s=1) + ReLU
//!   ↓ Conv2d(32→64, k=3, s=1) + MaxPool(2, 2) + ReLU
//!   ↓ Conv2d(64→64, k=3, s=1) + MaxPool(2, 2) + ReLU
//!   ↓ Conv2d(64→64, k=3, s=2) + MaxPool(2, 2) + ReLU
//!   ↓ Flatten: [batch, 64*h*w]
//!   ↓ Linear(64*h*w → 64) + BatchNorm + ReLU
//!   ↓ Split
//!   ├─→ Actor: Linear(64 → num_actions) → Action logits
//!   └─→ Critic: Linear(64 → 1) → Value estimate
//! ```
//!
//! The convolutions use no padding, so `h` and `w` depend on the screen size. For
//! a 240x320 screen the trunk ends at 14x19.
//!
//! # Example
//!
//! ```rust
//! use doom_a2c::rl::ActorCriticConfig;
//! use burn::backend::ndarray::NdArrayDevice;
//! use burn::backend::NdArray;
//! use burn::tensor::Tensor;
//!
//! type Backend = NdArray<f32>;
//!
//! let device = NdArrayDevice::default();
//! let config = ActorCriticConfig::new([3, 30, 40], 4);
//! let network = config.init::<Backend>(&device).unwrap();
//!
//! let observation = Tensor::zeros([2, 3, 30, 40], &device);
//! let (action_logits, value) = network.forward(observation);
//!
//! assert_eq!(action_logits.dims(), [2, 4]);
//! assert_eq!(value.dims(), [2, 1]);
//! ```

use burn::{
    module::Module,
    nn::{
        BatchNorm, BatchNormConfig, Linear, LinearConfig,
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
    },
    tensor::{Tensor, activation::relu, backend::Backend},
};

use super::error::AgentError;

const KERNEL: usize = 3;
const POOL: usize = 2;

/// Configuration for the actor-critic network
#[derive(Debug, Clone)]
pub struct ActorCriticConfig {
    /// Number of input channels
    pub input_channels: usize,

    /// Number of actions the policy can output
    pub num_actions: usize,

    /// Screen height in pixels
    pub screen_height: usize,

    /// Screen width in pixels
    pub screen_width: usize,

    /// Output channels of the four convolutional layers (default: [32, 64, 64, 64])
    pub conv_channels: [usize; 4],

    /// Strides of the four convolutional layers (default: [1, 1, 1, 2])
    pub conv_strides: [usize; 4],

    /// Size of the shared feature vector (default: 64)
    pub feature_dim: usize,
}

impl ActorCriticConfig {
    /// Create a configuration for `[channels, height, width]` screens
    pub fn new(screen_size: [usize; 3], num_actions: usize) -> Self {
        let [input_channels, screen_height, screen_width] = screen_size;
        Self {
            input_channels,
            num_actions,
            screen_height,
            screen_width,
            conv_channels: [32, 64, 64, 64],
            conv_strides: [1, 1, 1, 2],
            feature_dim: 64,
        }
    }

    /// Override the shared feature size
    pub fn with_feature_dim(mut self, feature_dim: usize) -> Self {
        self.feature_dim = feature_dim;
        self
    }

    /// Spatial size `[height, width]` left after the convolutional trunk
    ///
    /// Returns `None` if the screen is too small for every stage to produce at
    /// least one output cell.
    pub fn output_spatial(&self) -> Option<[usize; 2]> {
        Some([
            self.trunk_extent(self.screen_height)?,
            self.trunk_extent(self.screen_width)?,
        ])
    }

    /// Length of the flattened trunk output fed to the feature projection
    pub fn flattened_dim(&self) -> Option<usize> {
        let [height, width] = self.output_spatial()?;
        Some(self.conv_channels[3] * height * width)
    }

    /// Smallest square screen side the trunk accepts
    pub fn min_screen_extent(&self) -> usize {
        (1..=4096)
            .find(|&size| self.trunk_extent(size).is_some())
            .unwrap_or(4096)
    }

    fn trunk_extent(&self, size: usize) -> Option<usize> {
        let mut size = conv_extent(size, self.conv_strides[0])?;
        for stride in &self.conv_strides[1..] {
            size = pool_extent(conv_extent(size, *stride)?)?;
        }
        Some(size)
    }

    /// Flattened trunk size, or [`AgentError::ShapeMismatch`] if the screen is
    /// too small for the convolutional stack
    pub fn check_screen(&self) -> Result<usize, AgentError> {
        self.flattened_dim().ok_or_else(|| {
            let min = self.min_screen_extent();
            AgentError::ShapeMismatch {
                what: "screen (minimum for the convolutional stack)",
                expected: vec![self.input_channels, min, min],
                actual: vec![self.input_channels, self.screen_height, self.screen_width],
            }
        })
    }

    /// Initialize the network
    ///
    /// Fails with [`AgentError::ShapeMismatch`] if the screen is too small for the trunk.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<ActorCriticNetwork<B>, AgentError> {
        let flattened_dim = self.check_screen()?;
        let channels = self.conv_channels;
        let strides = self.conv_strides;

        let conv = |input: usize, index: usize| -> Conv2d<B> {
            Conv2dConfig::new([input, channels[index]], [KERNEL, KERNEL])
                .with_stride([strides[index], strides[index]])
                .init(device)
        };

        Ok(ActorCriticNetwork {
            conv1: conv(self.input_channels, 0),
            conv2: conv(channels[0], 1),
            conv3: conv(channels[1], 2),
            conv4: conv(channels[2], 3),
            pool: MaxPool2dConfig::new([POOL, POOL])
                .with_strides([POOL, POOL])
                .init(),
            features: LinearConfig::new(flattened_dim, self.feature_dim).init(device),
            batch_norm: BatchNormConfig::new(self.feature_dim).init(device),
            action_head: LinearConfig::new(self.feature_dim, self.num_actions).init(device),
            value_head: LinearConfig::new(self.feature_dim, 1).init(device),
        })
    }
}

fn conv_extent(size: usize, stride: usize) -> Option<usize> {
    size.checked_sub(KERNEL).map(|rest| rest / stride + 1)
}

fn pool_extent(size: usize) -> Option<usize> {
    size.checked_sub(POOL).map(|rest| rest / POOL + 1)
}

/// Convolutional actor-critic network
///
/// Generic over the backend. On an autodiff backend the batch normalization
/// layer uses batch statistics and updates its running averages; on the inner
/// backend (after `valid()`) it normalizes with the running averages.
#[derive(Module, Debug)]
pub struct ActorCriticNetwork<B: Backend> {
    pub conv1: Conv2d<B>,
    pub conv2: Conv2d<B>,
    pub conv3: Conv2d<B>,
    pub conv4: Conv2d<B>,
    pub pool: MaxPool2d,
    /// Projection of the flattened trunk onto the shared feature vector
    pub features: Linear<B>,
    pub batch_norm: BatchNorm<B, 0>,
    /// Actor head: outputs action logits
    pub action_head: Linear<B>,
    /// Critic head: outputs value estimate
    pub value_head: Linear<B>,
}

impl<B: Backend> ActorCriticNetwork<B> {
    /// Shared feature vector for a batch of screens
    ///
    /// `[batch, C, H, W]` → `[batch, feature_dim]`
    pub fn features(&self, observation: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = relu(self.conv1.forward(observation));
        let x = relu(self.pool.forward(self.conv2.forward(x)));
        let x = relu(self.pool.forward(self.conv3.forward(x)));
        let x = relu(self.pool.forward(self.conv4.forward(x)));

        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);

        relu(self.batch_norm.forward(self.features.forward(x)))
    }

    /// Action logits from shared features: `[batch, num_actions]`
    pub fn policy(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        self.action_head.forward(features)
    }

    /// Value estimate from shared features: `[batch, 1]`
    pub fn value(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        self.value_head.forward(features)
    }

    /// Full forward pass returning `(action_logits, value)`
    pub fn forward(&self, observation: Tensor<B, 4>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let features = self.features(observation);
        let action_logits = self.policy(features.clone());
        let value = self.value(features);
        (action_logits, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::Autodiff;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};
    use burn::tensor::{Distribution, TensorData};

    type TestBackend = NdArray<f32>;
    type TestAutodiffBackend = Autodiff<NdArray<f32>>;

    fn small_config() -> ActorCriticConfig {
        ActorCriticConfig::new([3, 30, 40], 4)
    }

    #[test]
    fn test_default_screen_flattens_to_14_by_19() {
        let config = ActorCriticConfig::new([3, 240, 320], 8);
        assert_eq!(config.output_spatial(), Some([14, 19]));
        assert_eq!(config.flattened_dim(), Some(64 * 14 * 19));
    }

    #[test]
    fn test_small_screen_spatial() {
        // 30: 28 -> 26/13 -> 11/5 -> 2/1
        // 40: 38 -> 36/18 -> 16/8 -> 3/1
        assert_eq!(small_config().output_spatial(), Some([1, 1]));
        assert_eq!(small_config().flattened_dim(), Some(64));
    }

    #[test]
    fn test_too_small_screen() {
        let config = ActorCriticConfig::new([3, 8, 8], 4);
        assert_eq!(config.output_spatial(), None);
        assert_eq!(config.flattened_dim(), None);

        let min = config.min_screen_extent();
        assert!(min > 8);
        assert!(ActorCriticConfig::new([3, min, min], 4).output_spatial().is_some());
        assert!(ActorCriticConfig::new([3, min - 1, min - 1], 4).output_spatial().is_none());
    }

    #[test]
    fn test_init_rejects_too_small_screen() {
        let device = NdArrayDevice::default();
        let result = ActorCriticConfig::new([3, 8, 8], 4).init::<TestBackend>(&device);

        match result {
            Err(AgentError::ShapeMismatch { expected, actual, .. }) => {
                assert_eq!(actual, vec![3, 8, 8]);
                assert!(expected[1] > 8);
            }
            other => panic!("expected ShapeMismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_forward_pass_shapes() {
        let device = NdArrayDevice::default();
        let network = small_config().init::<TestBackend>(&device).unwrap();

        let observation = Tensor::zeros([2, 3, 30, 40], &device);
        let (action_logits, value) = network.forward(observation);

        assert_eq!(action_logits.dims(), [2, 4]);
        assert_eq!(value.dims(), [2, 1]);
    }

    #[test]
    fn test_feature_dim_override() {
        let device = NdArrayDevice::default();
        let network = small_config()
            .with_feature_dim(16)
            .init::<TestBackend>(&device).unwrap();

        let features = network.features(Tensor::zeros([3, 3, 30, 40], &device));
        assert_eq!(features.dims(), [3, 16]);
    }

    #[test]
    fn test_features_are_non_negative() {
        let device = NdArrayDevice::default();
        let network = small_config().init::<TestBackend>(&device).unwrap();

        let observation =
            Tensor::random([4, 3, 30, 40], Distribution::Uniform(0.0, 1.0), &device);
        let features: TensorData = network.features(observation).into_data();

        for &val in features.as_slice::<f32>().unwrap() {
            assert!(val >= 0.0 && val.is_finite());
        }
    }

    #[test]
    fn test_gradient_reaches_every_head() {
        let device = NdArrayDevice::default();
        let network = small_config().init::<TestAutodiffBackend>(&device).unwrap();

        let observation =
            Tensor::random([4, 3, 30, 40], Distribution::Uniform(0.0, 1.0), &device)
                .require_grad();
        let (action_logits, value) = network.forward(observation.clone());

        let loss = action_logits.sum() + value.sum();
        let gradients = loss.backward();

        assert!(observation.grad(&gradients).is_some());
        assert!(network.action_head.weight.grad(&gradients).is_some());
        assert!(network.value_head.weight.grad(&gradients).is_some());
        assert!(network.conv1.weight.grad(&gradients).is_some());
    }

    #[test]
    fn test_output_finite() {
        let device = NdArrayDevice::default();
        let network = small_config().init::<TestBackend>(&device).unwrap();

        let observation =
            Tensor::random([8, 3, 30, 40], Distribution::Uniform(0.0, 1.0), &device);
        let (action_logits, value) = network.forward(observation);

        let logits_data: TensorData = action_logits.into_data();
        for &val in logits_data.as_slice::<f32>().unwrap() {
            assert!(val.is_finite(), "Logits should be finite, got: {}", val);
        }

        let value_data: TensorData = value.into_data();
        for &val in value_data.as_slice::<f32>().unwrap() {
            assert!(val.is_finite(), "Values should be finite, got: {}", val);
        }
    }
}
