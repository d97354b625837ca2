use crate::network::compiled::CompiledNetwork;
use crate::optim::optimizer::OptimizerState;
use crate::train::train_config::TrainingConfig;

/// Applies one optimizer step to every weight and bias of `network`, using
/// the gradients left by the preceding backward pass(es).
///
/// Weight decay (L2, weights only) is folded into the weight gradients first,
/// then the combined gradient is clipped to `gradient_clip` in L2 norm. The
/// optimizer state is created on the first call and reused afterwards.
///
/// `step` is the 1-based count of updates in this run.
pub fn update_parameters(network: &mut CompiledNetwork, config: &TrainingConfig, step: usize) {
    if let Some(decay) = config.weight_decay.filter(|d| *d > 0.0) {
        for (g, w) in network.weight_grads.iter_mut().zip(&network.weights) {
            *g += decay * w;
        }
    }

    if let Some(max_norm) = config.gradient_clip.filter(|c| *c > 0.0) {
        clip_gradients(network, max_norm);
    }

    let parameter_count = network.parameter_count();
    let state = network.optimizer_state
        .get_or_insert_with(|| OptimizerState::new(config.optimizer, parameter_count));
    debug_assert_eq!(state.parameter_count(), parameter_count);

    let hyper = config.optimizer_params();
    let lr = config.learning_rate;
    let weight_count = network.weights.len();
    state.step_segment(0, &mut network.weights, &network.weight_grads, &hyper, lr, step);
    state.step_segment(weight_count, &mut network.biases, &network.bias_grads, &hyper, lr, step);
}

/// Rescales the weight and bias gradients together so their L2 norm is at most `max_norm`.
fn clip_gradients(network: &mut CompiledNetwork, max_norm: f64) {
    let norm = network.weight_grads.iter()
        .chain(&network.bias_grads)
        .map(|g| g * g)
        .sum::<f64>()
        .sqrt();
    if norm > max_norm {
        let scale = max_norm / norm;
        network.weight_grads.iter_mut()
            .chain(network.bias_grads.iter_mut())
            .for_each(|g| *g *= scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationFunction;
    use crate::network::{compile, LayerGraph};
    use crate::optim::optimizer::OptimizerKind;

    fn tiny() -> CompiledNetwork {
        let mut net = compile(&LayerGraph::dense(1, &[(1, ActivationFunction::Linear)], Some(0))).unwrap();
        net.weights_mut()[0] = 2.0;
        net.biases_mut()[0] = 1.0;
        net
    }

    fn config(optimizer: OptimizerKind) -> TrainingConfig {
        TrainingConfig { optimizer, learning_rate: 0.1, ..TrainingConfig::default() }
    }

    #[test]
    fn state_is_created_once_and_sized_to_parameter_count() {
        let mut net = tiny();
        assert!(net.optimizer_state().is_none());
        let cfg = config(OptimizerKind::Adam);
        net.weight_grads[0] = 1.0;
        update_parameters(&mut net, &cfg, 1);
        assert_eq!(net.optimizer_state().unwrap().parameter_count(), net.parameter_count());
        let after_first = net.optimizer_state().cloned();
        update_parameters(&mut net, &cfg, 2);
        assert_ne!(net.optimizer_state().cloned(), after_first);
    }

    #[test]
    fn weight_decay_touches_weights_but_not_biases() {
        let mut net = tiny();
        let cfg = TrainingConfig { weight_decay: Some(0.5), ..config(OptimizerKind::Sgd) };
        update_parameters(&mut net, &cfg, 1);
        // grad = 0 + 0.5·2 = 1 → w = 2 - 0.1
        assert!((net.weights()[0] - 1.9).abs() < 1e-12);
        assert_eq!(net.biases()[0], 1.0);
    }

    #[test]
    fn gradient_clip_bounds_the_update() {
        let mut net = tiny();
        net.weight_grads[0] = 30.0;
        net.bias_grads[0] = 40.0;
        let cfg = TrainingConfig { gradient_clip: Some(5.0), ..config(OptimizerKind::Sgd) };
        update_parameters(&mut net, &cfg, 1);
        assert!((net.weights()[0] - (2.0 - 0.1 * 3.0)).abs() < 1e-12);
        assert!((net.biases()[0] - (1.0 - 0.1 * 4.0)).abs() < 1e-12);
    }
}
