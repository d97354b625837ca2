use super::{clamp_probability, Loss};

/// Binary cross-entropy averaged over independent sigmoid outputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct BceLoss;

impl Loss for BceLoss {
    fn loss(&self, predicted: &[f64], expected: &[f64]) -> f64 {
        let total: f64 = predicted.iter()
            .zip(expected)
            .map(|(p, y)| {
                let p = clamp_probability(*p);
                -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
            })
            .sum();
        total / predicted.len() as f64
    }

    fn derivative(&self, predicted: &[f64], expected: &[f64], out: &mut [f64]) {
        let n = predicted.len() as f64;
        for (g, (p, y)) in out.iter_mut().zip(predicted.iter().zip(expected)) {
            let p = clamp_probability(*p);
            *g = (p - y) / (p * (1.0 - p) * n);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturated_wrong_prediction_is_large_but_finite() {
        let loss = BceLoss.loss(&[1.0], &[0.0]);
        assert!(loss.is_finite() && loss > 15.0);
    }
}
