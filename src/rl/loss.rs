//! Loss terms for the joint actor-critic objective

use burn::tensor::{Tensor, backend::Backend};

/// Smooth L1 (Huber, β = 1) loss averaged over the batch
///
/// ```text
/// l(x) = 0.5 * x²      if |x| < 1
///        |x| - 0.5     otherwise
/// ```
pub fn smooth_l1_loss<B: Backend>(predictions: Tensor<B, 1>, targets: Tensor<B, 1>) -> Tensor<B, 1> {
    let diff = (predictions - targets).abs();
    let quadratic = diff.clone().powf_scalar(2.0) * 0.5;
    let linear = diff.clone() - 0.5;
    linear.mask_where(diff.lower_elem(1.0), quadratic).mean()
}

/// REINFORCE surrogate for one step: `-Σ_batch advantage * log π(a|s)`
///
/// `advantages` must not carry gradient; only the log-probabilities do. Minimizing
/// the result raises the likelihood of actions with positive advantage.
pub fn policy_gradient_loss<B: Backend>(
    log_probs: Tensor<B, 1>,
    advantages: Tensor<B, 1>,
) -> Tensor<B, 1> {
    (advantages * log_probs).sum().neg()
}
