pub mod mse;
pub mod cross_entropy;
pub mod bce;
pub mod mae;
pub mod huber;
pub mod loss_type;

pub use mse::MseLoss;
pub use cross_entropy::CrossEntropyLoss;
pub use bce::BceLoss;
pub use mae::MaeLoss;
pub use huber::HuberLoss;
pub use loss_type::LossType;

/// Probabilities are clamped to `[PROB_EPS, 1 - PROB_EPS]` before any log.
pub const PROB_EPS: f64 = 1e-7;

pub(crate) fn clamp_probability(p: f64) -> f64 {
    p.clamp(PROB_EPS, 1.0 - PROB_EPS)
}

/// A per-sample loss over an output vector and its target.
///
/// `derivative` must be the exact gradient of `loss` with respect to
/// `predicted`; backward relies on it for every output unit.
pub trait Loss {
    fn loss(&self, predicted: &[f64], expected: &[f64]) -> f64;

    /// Writes ∂L/∂predicted into `out` (same length as `predicted`).
    fn derivative(&self, predicted: &[f64], expected: &[f64], out: &mut [f64]);
}
