use rand::Rng;

use crate::data::{argmax, Label, Split};
use crate::data::encode::one_hot_into;
use crate::error::{Result, TrainError};
use crate::network::compiled::CompiledNetwork;
use crate::optim::update_parameters;
use crate::propagation::{accumulate_backward, forward, forward_training};
use crate::train::train_config::{TaskKind, TrainingConfig};

/// Loss and hit count of one training batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchOutcome {
    /// Mean loss over the batch's samples.
    pub loss: f64,
    /// Correct predictions; `None` for regression.
    pub correct: Option<usize>,
    pub samples: usize,
}

/// Loss (and accuracy) of a full inference pass over a split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub loss: f64,
    pub accuracy: Option<f64>,
}

/// Turns a label into a target vector of length `width`.
///
/// Scalar class labels are one-hot encoded, except for single-output
/// classifiers where the label itself is the target. Regression scalars
/// become a length-1 vector; vector labels are used as given.
pub fn encode_target(label: &Label, task: TaskKind, width: usize, out: &mut Vec<f64>) {
    out.clear();
    match (label, task) {
        (Label::Vector(values), _) => out.extend_from_slice(values),
        (Label::Scalar(value), TaskKind::Classification) if width > 1 => {
            out.resize(width, 0.0);
            one_hot_into(value.round().max(0.0) as usize, out);
        }
        (Label::Scalar(value), _) => out.push(*value),
    }
}

/// Argmax match, or a 0.5 threshold for single-output classifiers.
pub fn is_correct(output: &[f64], target: &[f64]) -> bool {
    match (output, target) {
        ([p], [t]) => (*p >= 0.5) == (*t >= 0.5),
        _ => argmax(output) == argmax(target),
    }
}

/// Runs one mini-batch and applies a single parameter update.
///
/// Takes `batch_size` samples starting at `(step * batch_size) mod n`,
/// wrapping around the training split. Gradients are summed over the batch,
/// divided by the batch size, and handed to the optimizer as update
/// number `step + 1`.
pub fn train_batch<R: Rng + ?Sized>(
    network: &mut CompiledNetwork,
    train: &Split,
    config: &TrainingConfig,
    step: usize,
    rng: &mut R,
) -> Result<BatchOutcome> {
    let n = train.len();
    if n == 0 {
        return Err(TrainError::InvalidConfig("training split is empty".into()));
    }
    let batch_size = config.batch_size;
    let classify = config.task == TaskKind::Classification;
    let width = network.output_width();

    network.zero_gradients();
    let start = (step * batch_size) % n;
    let mut target = Vec::with_capacity(width);
    let mut loss_sum = 0.0;
    let mut correct = 0;

    for i in 0..batch_size {
        let idx = (start + i) % n;
        encode_target(&train.labels[idx], config.task, width, &mut target);
        let output = forward_training(network, &train.features[idx], rng)?;
        if classify && is_correct(output, &target) {
            correct += 1;
        }
        loss_sum += accumulate_backward(network, &target, config.loss)?;
    }

    network.scale_gradients(1.0 / batch_size as f64);
    update_parameters(network, config, step + 1);

    Ok(BatchOutcome {
        loss: loss_sum / batch_size as f64,
        correct: classify.then_some(correct),
        samples: batch_size,
    })
}

/// Inference over a whole split, no backward pass. `None` for an empty split.
///
/// The per-layer activations of the preceding training pass are restored
/// afterwards, so snapshots keep showing the training sample.
pub fn evaluate(network: &mut CompiledNetwork, split: &Split, config: &TrainingConfig) -> Result<Option<Evaluation>> {
    if split.is_empty() {
        return Ok(None);
    }
    let trained = network.activations.clone();
    let classify = config.task == TaskKind::Classification;
    let width = network.output_width();
    let mut target = Vec::with_capacity(width);
    let mut loss_sum = 0.0;
    let mut correct = 0;

    for (features, label) in split.features.iter().zip(&split.labels) {
        encode_target(label, config.task, width, &mut target);
        let output = forward(network, features)?;
        if output.len() != target.len() {
            return Err(TrainError::ShapeMismatch { what: "target", expected: output.len(), got: target.len() });
        }
        if classify && is_correct(output, &target) {
            correct += 1;
        }
        loss_sum += config.loss.loss(output, &target);
    }

    network.activations = trained;
    let n = split.len() as f64;
    Ok(Some(Evaluation {
        loss: loss_sum / n,
        accuracy: classify.then(|| correct as f64 / n),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationFunction;
    use crate::loss::LossType;
    use crate::network::{compile, LayerGraph};
    use crate::optim::OptimizerKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn scalar_class_labels_are_one_hot_encoded_per_output_width() {
        let mut out = Vec::new();
        encode_target(&Label::Scalar(2.0), TaskKind::Classification, 3, &mut out);
        assert_eq!(out, vec![0.0, 0.0, 1.0]);
        encode_target(&Label::Scalar(1.0), TaskKind::Classification, 1, &mut out);
        assert_eq!(out, vec![1.0]);
        encode_target(&Label::Scalar(2.5), TaskKind::Regression, 1, &mut out);
        assert_eq!(out, vec![2.5]);
        encode_target(&Label::Vector(vec![0.2, 0.8]), TaskKind::Classification, 2, &mut out);
        assert_eq!(out, vec![0.2, 0.8]);
    }

    #[test]
    fn correctness_uses_threshold_or_argmax() {
        assert!(is_correct(&[0.7], &[1.0]));
        assert!(!is_correct(&[0.3], &[1.0]));
        assert!(is_correct(&[0.1, 0.6, 0.3], &[0.0, 1.0, 0.0]));
    }

    #[test]
    fn batch_averages_gradients_before_updating() {
        let mut net = compile(&LayerGraph::dense(1, &[(1, ActivationFunction::Linear)], Some(0))).unwrap();
        net.weights_mut()[0] = 0.0;
        net.biases_mut()[0] = 0.0;
        let split = Split {
            features: vec![vec![1.0], vec![1.0]],
            labels: vec![Label::Scalar(1.0), Label::Scalar(3.0)],
        };
        let config = TrainingConfig {
            optimizer: OptimizerKind::Sgd,
            loss: LossType::Mse,
            learning_rate: 0.5,
            batch_size: 2,
            ..TrainingConfig::default()
        };
        let outcome = train_batch(&mut net, &split, &config, 0, &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(outcome.loss, 5.0);
        assert_eq!(outcome.correct, None);
        // mean bias gradient = (-2 + -6) / 2 = -4 → b = 0 + 0.5·4
        assert_eq!(net.biases()[0], 2.0);
    }

    #[test]
    fn batches_wrap_around_the_training_split() {
        let mut net = compile(&LayerGraph::dense(1, &[(1, ActivationFunction::Linear)], Some(0))).unwrap();
        let split = Split {
            features: vec![vec![0.0], vec![1.0], vec![2.0]],
            labels: vec![Label::Scalar(0.0), Label::Scalar(1.0), Label::Scalar(2.0)],
        };
        let config = TrainingConfig { batch_size: 4, ..TrainingConfig::default() };
        let outcome = train_batch(&mut net, &split, &config, 1, &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(outcome.samples, 4);
    }

    #[test]
    fn evaluate_leaves_training_activations_in_place() {
        let mut net = compile(&LayerGraph::dense(2, &[(3, ActivationFunction::Tanh), (1, ActivationFunction::Sigmoid)], Some(4))).unwrap();
        forward(&mut net, &[0.3, -0.8]).unwrap();
        let hidden = net.activations(1).to_vec();
        let output = net.activations(2).to_vec();

        let holdout = Split {
            features: vec![vec![1.0, 1.0], vec![-2.0, 0.5]],
            labels: vec![Label::Scalar(1.0), Label::Scalar(0.0)],
        };
        evaluate(&mut net, &holdout, &TrainingConfig::default()).unwrap();
        assert_eq!(net.activations(1), hidden.as_slice());
        assert_eq!(net.activations(2), output.as_slice());
        assert_eq!(net.activations(0), &[0.3, -0.8]);
    }

    #[test]
    fn evaluate_reports_accuracy_for_classification_only() {
        let mut net = compile(&LayerGraph::dense(1, &[(1, ActivationFunction::Sigmoid)], Some(0))).unwrap();
        net.weights_mut()[0] = 10.0;
        net.biases_mut()[0] = -5.0;
        let split = Split {
            features: vec![vec![0.0], vec![1.0]],
            labels: vec![Label::Scalar(0.0), Label::Scalar(1.0)],
        };
        let classify = TrainingConfig { task: TaskKind::Classification, ..TrainingConfig::default() };
        let eval = evaluate(&mut net, &split, &classify).unwrap().unwrap();
        assert_eq!(eval.accuracy, Some(1.0));

        let regress = TrainingConfig::default();
        assert_eq!(evaluate(&mut net, &split, &regress).unwrap().unwrap().accuracy, None);
        assert_eq!(evaluate(&mut net, &Split::default(), &regress).unwrap(), None);
    }
}
