use crate::error::{Result, TrainError};
use crate::loss::LossType;
use crate::network::compiled::CompiledNetwork;
use crate::propagation::forward::weighted_sums;

/// Backpropagation for one sample.
///
/// Uses the output activations left by the preceding forward pass as the
/// predictions. Zeroes every gradient buffer, then fills the weight and bias
/// gradients for `targets`. Returns the sample's scalar loss.
pub fn backward(network: &mut CompiledNetwork, targets: &[f64], loss: LossType) -> Result<f64> {
    network.zero_gradients();
    accumulate_backward(network, targets, loss)
}

/// Like `backward`, but adds this sample's weight and bias gradients on top of
/// whatever is already there. Per-layer activation gradients are still reset.
///
/// The batch driver zeroes the parameter gradients once per batch and then
/// calls this for each sample.
pub fn accumulate_backward(network: &mut CompiledNetwork, targets: &[f64], loss: LossType) -> Result<f64> {
    let width = network.output_width();
    if targets.len() != width {
        return Err(TrainError::ShapeMismatch { what: "target", expected: width, got: targets.len() });
    }
    for layer in &mut network.gradients {
        layer.iter_mut().for_each(|g| *g = 0.0);
    }

    let last = network.layers.len() - 1;
    let predictions = &network.activations[last];
    let value = loss.loss(predictions, targets);
    loss.derivative(predictions, targets, &mut network.gradients[last]);

    for l in (1..=last).rev() {
        let layer = &network.layers[l];
        let input = &network.activations[l - 1];

        // Pre-activations are recomputed rather than cached by forward.
        let z = &mut network.pre_activations[l];
        weighted_sums(layer, &network.weights, &network.biases, input, z);

        let (earlier, current) = network.gradients.split_at_mut(l);
        let grad = &mut current[0];
        for (g, m) in grad.iter_mut().zip(&network.dropout_masks[l]) {
            *g *= m;
        }
        let delta = &mut network.pre_gradients[l];
        layer.activation.backprop(z, grad, delta);

        for (j, &d) in delta.iter().enumerate() {
            network.bias_grads[layer.bias_offset + j] += d;
            let row = layer.weight_index(j, 0)..layer.weight_index(j, layer.input_size);
            for (wg, x) in network.weight_grads[row].iter_mut().zip(input) {
                *wg += d * x;
            }
        }

        // The input layer owns no parameters; stop propagating at the first hidden layer.
        if l > 1 {
            let prev = &mut earlier[l - 1];
            for (j, &d) in delta.iter().enumerate() {
                let row = &network.weights[layer.weight_index(j, 0)..layer.weight_index(j, layer.input_size)];
                for (pg, w) in prev.iter_mut().zip(row) {
                    *pg += d * w;
                }
            }
        }
    }

    for &i in &network.pruned {
        network.weight_grads[i] = 0.0;
    }

    Ok(value)
}
