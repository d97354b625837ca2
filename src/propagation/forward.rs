use rand::Rng;

use crate::error::{Result, TrainError};
use crate::network::compiled::{CompiledLayer, CompiledNetwork};

/// Inference pass. Copies `input` into the input layer, propagates it through
/// every later layer and returns the output layer's activation buffer.
///
/// The returned slice is the network's own buffer; copy it before the next
/// pass if you need to keep it.
pub fn forward<'a>(network: &'a mut CompiledNetwork, input: &[f64]) -> Result<&'a [f64]> {
    if network.layers.iter().any(|l| l.dropout.is_some()) {
        network.clear_dropout();
    }
    propagate(network, input)?;
    Ok(output(network))
}

/// Training pass: like `forward`, but layers with a dropout rate zero a random
/// subset of their outputs and rescale the rest by `1 / (1 - rate)`.
pub fn forward_training<'a, R: Rng + ?Sized>(
    network: &'a mut CompiledNetwork,
    input: &[f64],
    rng: &mut R,
) -> Result<&'a [f64]> {
    for (layer, mask) in network.layers.iter().zip(network.dropout_masks.iter_mut()) {
        if let Some(rate) = layer.dropout {
            let keep = 1.0 / (1.0 - rate);
            for m in mask.iter_mut() {
                *m = if rng.gen::<f64>() < rate { 0.0 } else { keep };
            }
        }
    }
    propagate(network, input)?;
    Ok(output(network))
}

fn output(network: &CompiledNetwork) -> &[f64] {
    network.activations.last().map_or(&[], Vec::as_slice)
}

fn propagate(network: &mut CompiledNetwork, input: &[f64]) -> Result<()> {
    let width = network.input_width();
    if input.len() != width {
        return Err(TrainError::ShapeMismatch { what: "input", expected: width, got: input.len() });
    }

    if let Some(first) = network.activations.first_mut() {
        for ((a, &x), m) in first.iter_mut().zip(input).zip(&network.dropout_masks[0]) {
            *a = x * m;
        }
    }

    for l in 1..network.layers.len() {
        let layer = &network.layers[l];
        let (done, rest) = network.activations.split_at_mut(l);
        let z = &mut network.pre_activations[l];
        weighted_sums(layer, &network.weights, &network.biases, &done[l - 1], z);

        let out = &mut rest[0];
        layer.activation.apply(z, out);
        for (a, m) in out.iter_mut().zip(&network.dropout_masks[l]) {
            *a *= m;
        }
    }
    Ok(())
}

/// `z[j] = bias[j] + Σ_k weight(j, k) · input[k]` for one layer.
pub(crate) fn weighted_sums(
    layer: &CompiledLayer,
    weights: &[f64],
    biases: &[f64],
    input: &[f64],
    z: &mut [f64],
) {
    for (j, zj) in z.iter_mut().enumerate() {
        let row = &weights[layer.weight_index(j, 0)..layer.weight_index(j, layer.input_size)];
        *zj = biases[layer.bias_offset + j]
            + row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>();
    }
}
