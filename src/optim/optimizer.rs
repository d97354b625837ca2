use serde::{Serialize, Deserialize};

/// Parameter update rule for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OptimizerKind {
    /// Plain gradient descent: `p -= lr * g`.
    Sgd,
    /// Exponential moving average of gradients: `v = β·v + (1-β)·g; p -= lr * v`.
    Momentum,
    /// Bias-corrected adaptive moment estimation.
    #[default]
    Adam,
}

/// Hyperparameters read by the update rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerParams {
    pub momentum: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
}

pub const DEFAULT_MOMENTUM: f64 = 0.9;
pub const DEFAULT_BETA1: f64 = 0.9;
pub const DEFAULT_BETA2: f64 = 0.999;
pub const DEFAULT_EPSILON: f64 = 1e-8;

impl Default for OptimizerParams {
    fn default() -> Self {
        OptimizerParams {
            momentum: DEFAULT_MOMENTUM,
            beta1: DEFAULT_BETA1,
            beta2: DEFAULT_BETA2,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

/// Accumulators for one run, sized to the combined weight+bias vector.
///
/// Weights occupy indices `0..weights.len()` and biases follow them.
#[derive(Debug, Clone, PartialEq)]
pub enum OptimizerState {
    Sgd { parameter_count: usize },
    Momentum { velocity: Vec<f64> },
    Adam { m: Vec<f64>, v: Vec<f64> },
}

impl OptimizerState {
    pub fn new(kind: OptimizerKind, parameter_count: usize) -> OptimizerState {
        match kind {
            OptimizerKind::Sgd => OptimizerState::Sgd { parameter_count },
            OptimizerKind::Momentum => OptimizerState::Momentum {
                velocity: vec![0.0; parameter_count],
            },
            OptimizerKind::Adam => OptimizerState::Adam {
                m: vec![0.0; parameter_count],
                v: vec![0.0; parameter_count],
            },
        }
    }

    pub fn kind(&self) -> OptimizerKind {
        match self {
            OptimizerState::Sgd { .. } => OptimizerKind::Sgd,
            OptimizerState::Momentum { .. } => OptimizerKind::Momentum,
            OptimizerState::Adam { .. } => OptimizerKind::Adam,
        }
    }

    /// Number of parameters this state was created for.
    pub fn parameter_count(&self) -> usize {
        match self {
            OptimizerState::Sgd { parameter_count } => *parameter_count,
            OptimizerState::Momentum { velocity } => velocity.len(),
            OptimizerState::Adam { m, .. } => m.len(),
        }
    }

    /// Updates `params` in place, where `params[i]` is logical parameter
    /// `offset + i` of the combined vector.
    ///
    /// `step` is the 1-based update count used for Adam's bias correction.
    pub fn step_segment(
        &mut self,
        offset: usize,
        params: &mut [f64],
        grads: &[f64],
        hyper: &OptimizerParams,
        lr: f64,
        step: usize,
    ) {
        debug_assert_eq!(params.len(), grads.len());
        debug_assert!(offset + params.len() <= self.parameter_count());

        match self {
            OptimizerState::Sgd { .. } => {
                for (p, g) in params.iter_mut().zip(grads) {
                    *p -= lr * g;
                }
            }
            OptimizerState::Momentum { velocity } => {
                let beta = hyper.momentum;
                let velocity = &mut velocity[offset..offset + params.len()];
                for ((p, g), v) in params.iter_mut().zip(grads).zip(velocity) {
                    *v = beta * *v + (1.0 - beta) * g;
                    *p -= lr * *v;
                }
            }
            OptimizerState::Adam { m, v } => {
                let t = i32::try_from(step.max(1)).unwrap_or(i32::MAX);
                let corr1 = 1.0 - hyper.beta1.powi(t);
                let corr2 = 1.0 - hyper.beta2.powi(t);
                let range = offset..offset + params.len();
                for ((p, g), (m, v)) in params.iter_mut()
                    .zip(grads)
                    .zip(m[range.clone()].iter_mut().zip(v[range].iter_mut()))
                {
                    *m = hyper.beta1 * *m + (1.0 - hyper.beta1) * g;
                    *v = hyper.beta2 * *v + (1.0 - hyper.beta2) * g * g;
                    let m_hat = *m / corr1;
                    let v_hat = *v / corr2;
                    *p -= lr * m_hat / (v_hat.sqrt() + hyper.epsilon);
                }
            }
        }
    }
}
