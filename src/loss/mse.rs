use super::Loss;

/// Mean squared error, `Σ (p - y)² / n`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MseLoss;

impl Loss for MseLoss {
    fn loss(&self, predicted: &[f64], expected: &[f64]) -> f64 {
        let sum: f64 = predicted.iter().zip(expected).map(|(p, y)| (p - y) * (p - y)).sum();
        sum / predicted.len() as f64
    }

    fn derivative(&self, predicted: &[f64], expected: &[f64], out: &mut [f64]) {
        let scale = 2.0 / predicted.len() as f64;
        for (g, (p, y)) in out.iter_mut().zip(predicted.iter().zip(expected)) {
            *g = scale * (p - y);
        }
    }
}
