//! Discounted Monte Carlo returns
//!
//! ```text
//! G_{n-1} = γ * V_last + r_{n-1}
//! G_t     = γ * G_{t+1} + r_t
//! ```
//!
//! The scan is seeded with the critic's estimate for the last recorded step
//! rather than zero, so a trajectory cut off mid-episode still gets a
//! non-degenerate tail.

use burn::tensor::{Tensor, backend::Backend};

/// Compute per-step returns for a trajectory of (already scaled) rewards
///
/// Each reward tensor holds one entry per batch element, as does `bootstrap`.
/// The output is in forward time order: `returns[t]` belongs to step `t`.
pub fn discounted_returns<B: Backend>(
    rewards: &[Tensor<B, 1>],
    bootstrap: Tensor<B, 1>,
    discount: f32,
) -> Vec<Tensor<B, 1>> {
    let mut returns = vec![bootstrap.clone(); rewards.len()];
    let mut running = bootstrap;

    for t in (0..rewards.len()).rev() {
        running = running * discount + rewards[t].clone();
        returns[t] = running.clone();
    }

    returns
}
