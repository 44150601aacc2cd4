//! Doom A2C - a convolutional advantage actor-critic agent for screen-based environments
//!
//! This library provides:
//! - The agent, its network and the learning step (rl module)
//! - Rolling training statistics (metrics module)
//! - A training driver against a synthetic environment (modes module)

pub mod metrics;
pub mod modes;
pub mod rl;
