use ferrite_live::train::TrainEvent;
use ferrite_live::{
    ActivationFunction, Dataset, LayerGraph, LossType, OptimizerKind, RunStatus, TaskKind, TrainingConfig,
    TrainingSession,
};

fn xor_config(optimizer: OptimizerKind, learning_rate: f64) -> TrainingConfig {
    TrainingConfig {
        task: TaskKind::Classification,
        loss: LossType::BinaryCrossEntropy,
        optimizer,
        learning_rate,
        batch_size: 4,
        epochs: 500,
        validation_split: 0.0,
        seed: Some(7),
        ..TrainingConfig::default()
    }
}

/// Trains to completion and returns the per-epoch training losses.
fn epoch_losses(config: TrainingConfig) -> Vec<f64> {
    let graph = LayerGraph::dense(
        2,
        &[(4, ActivationFunction::Tanh), (1, ActivationFunction::Sigmoid)],
        Some(3),
    );
    let mut session = TrainingSession::new();
    session.start(&graph, config, &Dataset::xor()).unwrap();

    let mut losses = Vec::new();
    while session.status() == RunStatus::Training {
        for event in session.run_batches(25, None).unwrap() {
            if let TrainEvent::EpochComplete { metrics, .. } = event {
                losses.push(metrics.loss);
            }
        }
    }
    assert_eq!(session.status(), RunStatus::Complete);
    losses
}

/// Least-squares slope of `values` against their index.
fn trend(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;
    let (mut cov, mut var) = (0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        cov += dx * (y - mean_y);
        var += dx * dx;
    }
    cov / var
}

#[test]
fn adam_reduces_xor_loss() {
    let losses = epoch_losses(xor_config(OptimizerKind::Adam, 0.05));
    assert_eq!(losses.len(), 500);
    let first = losses[0];
    let last = losses[losses.len() - 1];
    assert!(last < first, "loss went from {first} to {last}");
    assert!(trend(&losses) < 0.0);
}

#[test]
fn sgd_and_momentum_also_make_progress() {
    for optimizer in [OptimizerKind::Sgd, OptimizerKind::Momentum] {
        let losses = epoch_losses(xor_config(optimizer, 0.5));
        let first = losses[0];
        let last = losses[losses.len() - 1];
        assert!(last < first, "{optimizer:?}: loss went from {first} to {last}");
    }
}

#[test]
fn holdout_metrics_are_reported_for_classification() {
    let features: Vec<Vec<f64>> = (0..40)
        .map(|i| vec![(i % 2) as f64, ((i / 2) % 2) as f64])
        .collect();
    let labels: Vec<f64> = features.iter().map(|f| ((f[0] + f[1]) as usize % 2) as f64).collect();
    let dataset = Dataset::from_scalar_labels(features, labels);

    let config = TrainingConfig { validation_split: 0.25, epochs: 3, ..xor_config(OptimizerKind::Adam, 0.05) };
    let graph = LayerGraph::dense(2, &[(4, ActivationFunction::Tanh), (1, ActivationFunction::Sigmoid)], Some(3));
    let mut session = TrainingSession::new();
    session.start(&graph, config, &dataset).unwrap();
    assert_eq!(session.partition().unwrap().validation.len(), 10);

    let events = session.run_batches(100, None).unwrap();
    match events.last() {
        Some(TrainEvent::TrainingComplete(metrics)) => {
            assert!(metrics.val_loss.is_some());
            assert!(metrics.accuracy.is_some());
            assert!(metrics.val_accuracy.is_some());
        }
        other => panic!("expected completion, got {other:?}"),
    }
}
