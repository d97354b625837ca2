use super::Loss;

/// Huber loss: quadratic within `delta` of the target, linear beyond it,
/// averaged over outputs.
#[derive(Debug, Clone, Copy)]
pub struct HuberLoss {
    pub delta: f64,
}

impl HuberLoss {
    pub const DEFAULT_DELTA: f64 = 1.0;
}

impl Default for HuberLoss {
    fn default() -> Self {
        HuberLoss { delta: HuberLoss::DEFAULT_DELTA }
    }
}

impl Loss for HuberLoss {
    fn loss(&self, predicted: &[f64], expected: &[f64]) -> f64 {
        let d = self.delta;
        let sum: f64 = predicted.iter()
            .zip(expected)
            .map(|(p, y)| {
                let r = (p - y).abs();
                if r <= d { 0.5 * r * r } else { d * (r - 0.5 * d) }
            })
            .sum();
        sum / predicted.len() as f64
    }

    fn derivative(&self, predicted: &[f64], expected: &[f64], out: &mut [f64]) {
        let n = predicted.len() as f64;
        for (g, (p, y)) in out.iter_mut().zip(predicted.iter().zip(expected)) {
            *g = (p - y).clamp(-self.delta, self.delta) / n;
        }
    }
}
