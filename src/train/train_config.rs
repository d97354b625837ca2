use serde::{Serialize, Deserialize};

use crate::data::{Normalization, DEFAULT_VALIDATION_SPLIT};
use crate::error::{Result, TrainError};
use crate::loss::LossType;
use crate::optim::optimizer::{
    OptimizerKind, OptimizerParams, DEFAULT_BETA1, DEFAULT_BETA2, DEFAULT_EPSILON, DEFAULT_MOMENTUM,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskKind {
    /// Labels are class indices (or one-hot vectors); accuracy is reported.
    Classification,
    /// Labels are real values.
    #[default]
    Regression,
}

/// Stop early once the monitored loss stops improving.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarlyStopping {
    /// Epochs without improvement tolerated before completing the run.
    pub patience: usize,
    /// Smallest decrease that counts as an improvement.
    #[serde(default)]
    pub min_delta: f64,
}

/// Immutable settings for one training run.
///
/// Every field has a default, so a JSON config only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrainingConfig {
    pub task: TaskKind,
    pub loss: LossType,
    pub optimizer: OptimizerKind,
    pub learning_rate: f64,
    pub batch_size: usize,
    /// Epoch budget; the run completes when it is reached.
    pub epochs: usize,
    pub momentum: Option<f64>,
    pub beta1: Option<f64>,
    pub beta2: Option<f64>,
    pub epsilon: Option<f64>,
    /// L2 penalty applied to weights (never biases).
    pub weight_decay: Option<f64>,
    /// Maximum L2 norm of the combined gradient.
    pub gradient_clip: Option<f64>,
    pub early_stopping: Option<EarlyStopping>,
    /// Fraction of the dataset held out for validation.
    pub validation_split: f64,
    /// Seeds the shuffle and dropout; `None` draws from OS entropy.
    pub seed: Option<u64>,
    pub normalization: Normalization,
    /// Run the validation pass after every N-th batch (1 = every batch).
    pub validate_every: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            task: TaskKind::default(),
            loss: LossType::default(),
            optimizer: OptimizerKind::default(),
            learning_rate: 0.01,
            batch_size: 32,
            epochs: 100,
            momentum: None,
            beta1: None,
            beta2: None,
            epsilon: None,
            weight_decay: None,
            gradient_clip: None,
            early_stopping: None,
            validation_split: DEFAULT_VALIDATION_SPLIT,
            seed: None,
            normalization: Normalization::None,
            validate_every: 1,
        }
    }
}

impl TrainingConfig {
    pub fn optimizer_params(&self) -> OptimizerParams {
        OptimizerParams {
            momentum: self.momentum.unwrap_or(DEFAULT_MOMENTUM),
            beta1: self.beta1.unwrap_or(DEFAULT_BETA1),
            beta2: self.beta2.unwrap_or(DEFAULT_BETA2),
            epsilon: self.epsilon.unwrap_or(DEFAULT_EPSILON),
        }
    }

    /// Rejects values the training loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(TrainError::InvalidConfig(msg)) };

        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return invalid(format!("learning rate must be finite and > 0, got {}", self.learning_rate));
        }
        if self.batch_size == 0 {
            return invalid("batch size must be at least 1".into());
        }
        if self.epochs == 0 {
            return invalid("epoch budget must be at least 1".into());
        }
        if self.validate_every == 0 {
            return invalid("validateEvery must be at least 1".into());
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return invalid(format!("validation split must be in [0, 1), got {}", self.validation_split));
        }

        let hyper = self.optimizer_params();
        for (name, value) in [("momentum", hyper.momentum), ("beta1", hyper.beta1), ("beta2", hyper.beta2)] {
            if !(value.is_finite() && (0.0..1.0).contains(&value)) {
                return invalid(format!("{name} must be finite and in [0, 1), got {value}"));
            }
        }
        if !(hyper.epsilon.is_finite() && hyper.epsilon > 0.0) {
            return invalid(format!("epsilon must be finite and > 0, got {}", hyper.epsilon));
        }
        for (name, value) in [("weight decay", self.weight_decay), ("gradient clip", self.gradient_clip)] {
            if let Some(v) = value {
                if !(v.is_finite() && v >= 0.0) {
                    return invalid(format!("{name} must be finite and >= 0, got {v}"));
                }
            }
        }
        Ok(())
    }
}
