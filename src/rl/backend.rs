//! Backend type aliases and device placement
//!
//! The agent trains on an autodiff-wrapped backend and evaluates on its inner
//! backend. Which device the model lives on is decided once, when the agent is
//! built. External data (rewards) is moved onto that device through
//! [`to_model_device`] before it takes part in any arithmetic.
//!
//! # Backend Selection
//!
//! - **TrainingBackend**: Autodiff-enabled NdArray backend (CPU)
//! - **InferenceBackend**: Plain NdArray backend (CPU)
//! - **AcceleratedBackend**: Autodiff-enabled Wgpu backend, only with the `wgpu` feature
//!
//! # Example
//!
//! ```rust
//! use doom_a2c::rl::{default_device, accelerator_available};
//!
//! let device = default_device();
//! if !accelerator_available() {
//!     // Everything runs on the NdArray CPU backend.
//! }
//! ```

use burn::{
    backend::{
        Autodiff,
        ndarray::{NdArray, NdArrayDevice},
    },
    tensor::{Tensor, backend::Backend},
};

/// Backend type for training (with autodiff)
pub type TrainingBackend = Autodiff<NdArray<f32>>;

/// Backend type for evaluation-mode forward passes (without autodiff)
pub type InferenceBackend = NdArray<f32>;

/// Autodiff backend running on the GPU through wgpu
#[cfg(feature = "wgpu")]
pub type AcceleratedBackend = Autodiff<burn::backend::Wgpu>;

/// Get the default CPU device
pub fn default_device() -> NdArrayDevice {
    NdArrayDevice::default()
}

/// Get the default wgpu device
#[cfg(feature = "wgpu")]
pub fn accelerated_device() -> burn::backend::wgpu::WgpuDevice {
    burn::backend::wgpu::WgpuDevice::default()
}

/// Whether an accelerator backend was compiled into this build
pub fn accelerator_available() -> bool {
    cfg!(feature = "wgpu")
}

/// Move a tensor onto the device the model lives on
///
/// This is the single entry point for data coming from outside the agent.
pub fn to_model_device<B: Backend, const D: usize>(
    tensor: Tensor<B, D>,
    device: &B::Device,
) -> Tensor<B, D> {
    if &tensor.device() == device {
        tensor
    } else {
        tensor.to_device(device)
    }
}
