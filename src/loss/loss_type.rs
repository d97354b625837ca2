use serde::{Serialize, Deserialize};

use super::{BceLoss, CrossEntropyLoss, HuberLoss, Loss, MaeLoss, MseLoss};

/// Loss used by a training run, as named in a JSON config
/// (`"mse"`, `"crossEntropy"`, `"binaryCrossEntropy"`, `"mae"`, `"huber"`).
///
/// `crossEntropy` expects a softmax output layer and `binaryCrossEntropy`
/// a sigmoid one; `huber` uses δ = 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LossType {
    #[default]
    Mse,
    CrossEntropy,
    BinaryCrossEntropy,
    Mae,
    Huber,
}

impl LossType {
    /// Scalar loss for one sample.
    pub fn loss(self, predicted: &[f64], expected: &[f64]) -> f64 {
        self.with(|l| l.loss(predicted, expected))
    }

    /// Writes ∂L/∂predicted for one sample into `out`.
    pub fn derivative(self, predicted: &[f64], expected: &[f64], out: &mut [f64]) {
        self.with(|l| l.derivative(predicted, expected, out))
    }

    fn with<R>(self, f: impl FnOnce(&dyn Loss) -> R) -> R {
        match self {
            LossType::Mse => f(&MseLoss),
            LossType::CrossEntropy => f(&CrossEntropyLoss),
            LossType::BinaryCrossEntropy => f(&BceLoss),
            LossType::Mae => f(&MaeLoss),
            LossType::Huber => f(&HuberLoss::default()),
        }
    }
}
