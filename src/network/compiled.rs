use std::collections::HashMap;

use crate::activation::ActivationFunction;
use crate::network::graph::{LayerGraph, LayerKind};
use crate::optim::optimizer::OptimizerState;

/// A layer of the flat computation structure.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledLayer {
    pub id: String,
    pub kind: LayerKind,
    pub activation: ActivationFunction,
    pub input_size: usize,
    pub output_size: usize,
    /// Start of this layer's block in the global weight buffer.
    pub weight_offset: usize,
    /// Start of this layer's block in the global bias buffer.
    pub bias_offset: usize,
    pub dropout: Option<f64>,
}

impl CompiledLayer {
    pub fn is_input(&self) -> bool {
        self.kind == LayerKind::Input
    }

    /// Number of weights owned by this layer (0 for the input layer).
    pub fn weight_count(&self) -> usize {
        if self.is_input() { 0 } else { self.input_size * self.output_size }
    }

    /// Number of biases owned by this layer (0 for the input layer).
    pub fn bias_count(&self) -> usize {
        if self.is_input() { 0 } else { self.output_size }
    }

    /// Global index of the weight from input unit `k` to output unit `j`.
    ///
    /// Layout is output-major: `weight_offset + j * input_size + k`.
    #[inline]
    pub fn weight_index(&self, j: usize, k: usize) -> usize {
        self.weight_offset + j * self.input_size + k
    }
}

/// Flat, index-addressed form of a `LayerGraph`, owned by exactly one run.
///
/// Forward, backward and the parameter updater all mutate these buffers in
/// place; nothing is reallocated per call.
#[derive(Debug, Clone)]
pub struct CompiledNetwork {
    pub(crate) layers: Vec<CompiledLayer>,
    pub(crate) weights: Vec<f64>,
    pub(crate) biases: Vec<f64>,
    /// Current forward values per layer.
    pub(crate) activations: Vec<Vec<f64>>,
    /// Current ∂L/∂activation per layer.
    pub(crate) gradients: Vec<Vec<f64>>,
    pub(crate) weight_grads: Vec<f64>,
    pub(crate) bias_grads: Vec<f64>,
    /// Inverted-dropout scale per unit; all ones outside training batches.
    pub(crate) dropout_masks: Vec<Vec<f64>>,
    /// Scratch buffers for pre-activation values and their gradients.
    pub(crate) pre_activations: Vec<Vec<f64>>,
    pub(crate) pre_gradients: Vec<Vec<f64>>,
    /// Weight indices with no backing edge; they stay at zero.
    pub(crate) pruned: Vec<usize>,
    pub(crate) node_ids: Vec<Vec<String>>,
    /// Created lazily by the first parameter update.
    pub(crate) optimizer_state: Option<OptimizerState>,
}

impl CompiledNetwork {
    pub(crate) fn new(
        layers: Vec<CompiledLayer>,
        weights: Vec<f64>,
        biases: Vec<f64>,
        node_ids: Vec<Vec<String>>,
        pruned: Vec<usize>,
    ) -> CompiledNetwork {
        let per_layer = |fill: f64| -> Vec<Vec<f64>> {
            layers.iter().map(|l| vec![fill; l.output_size]).collect()
        };
        CompiledNetwork {
            activations: per_layer(0.0),
            gradients: per_layer(0.0),
            dropout_masks: per_layer(1.0),
            pre_activations: per_layer(0.0),
            pre_gradients: per_layer(0.0),
            weight_grads: vec![0.0; weights.len()],
            bias_grads: vec![0.0; biases.len()],
            layers,
            weights,
            biases,
            pruned,
            node_ids,
            optimizer_state: None,
        }
    }

    pub fn layers(&self) -> &[CompiledLayer] {
        &self.layers
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut [f64] {
        &mut self.weights
    }

    pub fn biases(&self) -> &[f64] {
        &self.biases
    }

    pub fn biases_mut(&mut self) -> &mut [f64] {
        &mut self.biases
    }

    pub fn weight_gradients(&self) -> &[f64] {
        &self.weight_grads
    }

    pub fn bias_gradients(&self) -> &[f64] {
        &self.bias_grads
    }

    /// Forward values of layer `index` from the most recent pass.
    pub fn activations(&self, index: usize) -> &[f64] {
        &self.activations[index]
    }

    pub fn input_width(&self) -> usize {
        self.layers.first().map_or(0, |l| l.output_size)
    }

    pub fn output_width(&self) -> usize {
        self.layers.last().map_or(0, |l| l.output_size)
    }

    /// Σ(input×output + output) over non-input layers. Fixed once compiled.
    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|l| l.weight_count() + l.bias_count()).sum()
    }

    pub fn optimizer_state(&self) -> Option<&OptimizerState> {
        self.optimizer_state.as_ref()
    }

    /// Drops optimizer accumulators; the next update recreates them.
    pub fn reset_optimizer(&mut self) {
        self.optimizer_state = None;
    }

    /// Zeroes the weight, bias and per-layer activation gradients.
    pub(crate) fn zero_gradients(&mut self) {
        self.weight_grads.iter_mut().for_each(|g| *g = 0.0);
        self.bias_grads.iter_mut().for_each(|g| *g = 0.0);
        for layer in &mut self.gradients {
            layer.iter_mut().for_each(|g| *g = 0.0);
        }
    }

    /// Multiplies the weight and bias gradients by `factor`.
    pub(crate) fn scale_gradients(&mut self, factor: f64) {
        self.weight_grads.iter_mut()
            .chain(self.bias_grads.iter_mut())
            .for_each(|g| *g *= factor);
    }

    /// Restores every dropout scale to 1 (inference mode).
    pub(crate) fn clear_dropout(&mut self) {
        for mask in &mut self.dropout_masks {
            mask.iter_mut().for_each(|m| *m = 1.0);
        }
    }

    /// Copies the current weights and biases back onto the graph's edges and
    /// nodes, so a later run can resume from them.
    ///
    /// Graph entries that were absent at compile time are not created.
    pub fn write_back(&self, graph: &mut LayerGraph) {
        let edge_ids: HashMap<(String, String), String> = graph.edges.iter()
            .map(|(id, e)| ((e.from.clone(), e.to.clone()), id.clone()))
            .collect();

        for (l, layer) in self.layers.iter().enumerate().skip(1) {
            let inputs = &self.node_ids[l - 1];
            for (j, to) in self.node_ids[l].iter().enumerate() {
                if let Some(node) = graph.nodes.get_mut(to) {
                    node.bias = self.biases[layer.bias_offset + j];
                }
                for (k, from) in inputs.iter().enumerate() {
                    let key = (from.clone(), to.clone());
                    if let Some(edge) = edge_ids.get(&key).and_then(|id| graph.edges.get_mut(id)) {
                        edge.weight = self.weights[layer.weight_index(j, k)];
                    }
                }
            }
        }
    }
}
