use super::Loss;

/// Mean absolute error. Its subgradient at `p == y` is taken as 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaeLoss;

impl Loss for MaeLoss {
    fn loss(&self, predicted: &[f64], expected: &[f64]) -> f64 {
        let sum: f64 = predicted.iter().zip(expected).map(|(p, y)| (p - y).abs()).sum();
        sum / predicted.len() as f64
    }

    fn derivative(&self, predicted: &[f64], expected: &[f64], out: &mut [f64]) {
        let step = 1.0 / predicted.len() as f64;
        for (g, (p, y)) in out.iter_mut().zip(predicted.iter().zip(expected)) {
            *g = match p.partial_cmp(y) {
                Some(std::cmp::Ordering::Greater) => step,
                Some(std::cmp::Ordering::Less) => -step,
                _ => 0.0,
            };
        }
    }
}
