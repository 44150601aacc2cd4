//! Actor-critic agent configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::network::ActorCriticConfig;

/// Configuration for the advantage actor-critic agent
///
/// Fixed for the lifetime of an agent. The screen size determines the size of
/// the flattened convolutional output, so changing it requires a new network.
///
/// # Example
///
/// ```rust
/// use doom_a2c::rl::AgentConfig;
///
/// // Defaults: 3x240x320 screens, 8 actions, gamma 0.99
/// let config = AgentConfig::default();
/// assert!(config.validate().is_ok());
///
/// // Small screens for quick experiments
/// let config = AgentConfig {
///     screen_size: [3, 30, 40],
///     action_count: 4,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Discount factor applied per step when computing returns
    ///
    /// Must be in (0, 1].
    ///
    /// Default: 0.99
    pub discount: f32,

    /// Input shape as `[channels, height, width]`
    ///
    /// Default: [3, 240, 320]
    pub screen_size: [usize; 3],

    /// Number of discrete actions the policy chooses between
    ///
    /// Default: 8
    pub action_count: usize,

    /// Size of the shared feature vector feeding both heads
    ///
    /// Default: 64
    pub feature_dim: usize,

    /// Seed for the action sampler; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl AgentConfig {
    /// Create a configuration for the given screen shape and action count
    pub fn new(screen_size: [usize; 3], action_count: usize) -> Self {
        Self {
            screen_size,
            action_count,
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file
    ///
    /// Missing fields fall back to their defaults. The loaded configuration is
    /// validated before it is returned.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read agent config from {:?}", path))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse agent config {:?}", path))?;
        config
            .validate()
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("Invalid agent config in {:?}", path))?;
        Ok(config)
    }

    /// Network hyperparameters implied by this configuration
    pub fn network_config(&self) -> ActorCriticConfig {
        ActorCriticConfig::new(self.screen_size, self.action_count).with_feature_dim(self.feature_dim)
    }

    /// Validate configuration parameters
    ///
    /// # Returns
    ///
    /// `Ok(())` if all parameters are valid, `Err(String)` with an error message otherwise.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.discount > 0.0 && self.discount <= 1.0) {
            return Err(format!(
                "discount must be in (0, 1], got {}",
                self.discount
            ));
        }

        if self.screen_size[0] == 0 {
            return Err("screen must have at least one channel".to_string());
        }

        if self.action_count == 0 {
            return Err("action_count must be at least 1".to_string());
        }

        if self.feature_dim == 0 {
            return Err("feature_dim must be at least 1".to_string());
        }

        if self.network_config().output_spatial().is_none() {
            return Err(format!(
                "screen {}x{} is too small for the convolutional stack",
                self.screen_size[1], self.screen_size[2]
            ));
        }

        Ok(())
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            discount: 0.99,
            screen_size: [3, 240, 320],
            action_count: 8,
            feature_dim: 64,
            seed: None,
        }
    }
}
