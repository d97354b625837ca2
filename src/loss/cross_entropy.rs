use super::{clamp_probability, Loss};

/// Categorical cross-entropy, `-Σ y·ln p`, over a probability vector
/// (normally a softmax output).
///
/// Not averaged over classes. The gradient is taken with respect to the
/// probabilities; the softmax Jacobian is applied by backward.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropyLoss;

impl Loss for CrossEntropyLoss {
    fn loss(&self, predicted: &[f64], expected: &[f64]) -> f64 {
        -predicted.iter()
            .zip(expected)
            .map(|(p, y)| y * clamp_probability(*p).ln())
            .sum::<f64>()
    }

    fn derivative(&self, predicted: &[f64], expected: &[f64], out: &mut [f64]) {
        for (g, (p, y)) in out.iter_mut().zip(predicted.iter().zip(expected)) {
            *g = -y / clamp_probability(*p);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_target_class_contributes() {
        let loss = CrossEntropyLoss.loss(&[0.25, 0.5, 0.25], &[0.0, 1.0, 0.0]);
        assert!((loss - 2.0_f64.ln()).abs() < 1e-12);

        let mut grad = [1.0; 3];
        CrossEntropyLoss.derivative(&[0.25, 0.5, 0.25], &[0.0, 1.0, 0.0], &mut grad);
        assert_eq!(grad, [0.0, -2.0, 0.0]);
    }
}
