use std::collections::HashMap;

use log::{debug, warn};

use crate::error::{Result, TrainError};
use crate::network::compiled::{CompiledLayer, CompiledNetwork};
use crate::network::graph::{LayerGraph, LayerKind};

/// Compiles a layer/node/edge graph into flat weight and bias buffers.
///
/// Layers are taken in ascending `x` order and units in ascending `y` order.
/// The first layer is the input layer and owns no parameters. Each later
/// layer's weight block is written output unit outer, input unit inner, so
/// weight `(j, k)` lives at `weight_offset + j * input_size + k`. A unit pair
/// with no edge gets weight 0 and is kept at 0 during training.
pub fn compile(graph: &LayerGraph) -> Result<CompiledNetwork> {
    if graph.layers.is_empty() {
        return Err(TrainError::Compilation("network has no layers".into()));
    }

    let edge_index: HashMap<(&str, &str), f64> = graph.edges.values()
        .map(|e| ((e.from.as_str(), e.to.as_str()), e.weight))
        .collect();

    let mut layers: Vec<CompiledLayer> = Vec::with_capacity(graph.layers.len());
    let mut node_ids: Vec<Vec<String>> = Vec::with_capacity(graph.layers.len());
    let mut weights = Vec::new();
    let mut biases = Vec::new();
    let mut pruned = Vec::new();

    for (i, spec) in graph.ordered_layers().into_iter().enumerate() {
        if spec.units == 0 {
            return Err(TrainError::Compilation(format!("layer '{}' declares zero units", spec.id)));
        }
        let nodes = graph.layer_nodes(&spec.id);
        if nodes.is_empty() {
            return Err(TrainError::Compilation(format!("layer '{}' has no nodes", spec.id)));
        }
        if nodes.len() != spec.units {
            warn!(
                "layer '{}' declares {} units but has {} nodes; compiling with {}",
                spec.id, spec.units, nodes.len(), nodes.len()
            );
        }
        if let Some(rate) = spec.dropout {
            if !(0.0..1.0).contains(&rate) {
                return Err(TrainError::Compilation(format!(
                    "layer '{}' has dropout rate {rate}, expected a value in [0, 1)", spec.id
                )));
            }
        }

        let kind = match (i, spec.kind) {
            (0, LayerKind::Input) => LayerKind::Input,
            (0, declared) => {
                warn!("first layer '{}' is declared {declared:?}; treating it as the input layer", spec.id);
                LayerKind::Input
            }
            (_, LayerKind::Input) => {
                warn!("layer '{}' is declared as input but is not first; treating it as dense", spec.id);
                LayerKind::Dense
            }
            (_, declared) => declared,
        };

        let output_size = nodes.len();
        let input_size = layers.last().map_or(output_size, |prev| prev.output_size);
        let layer = CompiledLayer {
            id: spec.id.clone(),
            kind,
            activation: spec.activation,
            input_size,
            output_size,
            weight_offset: weights.len(),
            bias_offset: biases.len(),
            dropout: spec.dropout.filter(|rate| *rate > 0.0),
        };

        if let Some(prev) = node_ids.last() {
            for to in &nodes {
                for from in prev {
                    match edge_index.get(&(from.as_str(), *to)) {
                        Some(weight) => weights.push(*weight),
                        None => {
                            pruned.push(weights.len());
                            weights.push(0.0);
                        }
                    }
                }
            }
            biases.extend(nodes.iter().map(|id| graph.nodes[*id].bias));
        }

        layers.push(layer);
        node_ids.push(nodes.into_iter().map(str::to_owned).collect());
    }

    debug!(
        "compiled {} layers: {} weights ({} pruned), {} biases",
        layers.len(), weights.len(), pruned.len(), biases.len()
    );

    Ok(CompiledNetwork::new(layers, weights, biases, node_ids, pruned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationFunction;
    use crate::network::graph::{EdgeSpec, LayerSpec, NodeSpec};

    fn xor_shape() -> LayerGraph {
        LayerGraph::dense(
            2,
            &[(4, ActivationFunction::Tanh), (1, ActivationFunction::Sigmoid)],
            Some(3),
        )
    }

    #[test]
    fn empty_graph_is_rejected() {
        assert!(matches!(compile(&LayerGraph::default()), Err(TrainError::Compilation(_))));
    }

    #[test]
    fn zero_unit_layer_is_rejected() {
        let mut graph = xor_shape();
        graph.layers[1].units = 0;
        assert!(matches!(compile(&graph), Err(TrainError::Compilation(_))));
    }

    #[test]
    fn offsets_and_parameter_count_follow_layer_sizes() {
        let net = compile(&xor_shape()).unwrap();
        let layers = net.layers();
        assert_eq!(layers.len(), 3);
        assert_eq!((layers[1].input_size, layers[1].output_size), (2, 4));
        assert_eq!((layers[2].input_size, layers[2].output_size), (4, 1));
        assert_eq!(layers[1].weight_offset, 0);
        assert_eq!(layers[2].weight_offset, 8);
        assert_eq!(layers[2].bias_offset, 4);
        assert_eq!(net.weights().len(), 12);
        assert_eq!(net.biases().len(), 5);
        assert_eq!(net.parameter_count(), 2 * 4 + 4 + 4 * 1 + 1);
    }

    #[test]
    fn weights_are_laid_out_output_major() {
        let graph = xor_shape();
        let net = compile(&graph).unwrap();
        let hidden = &net.layers()[1];
        for j in 0..4 {
            for k in 0..2 {
                let edge = &graph.edges[&format!("L0-n{k}->L1-n{j}")];
                assert_eq!(net.weights()[hidden.weight_index(j, k)], edge.weight);
            }
        }
    }

    #[test]
    fn layers_are_sorted_by_position() {
        let mut graph = xor_shape();
        graph.layers.reverse();
        let net = compile(&graph).unwrap();
        let ids: Vec<&str> = net.layers().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["L0", "L1", "L2"]);
    }

    #[test]
    fn missing_edge_compiles_to_zero_weight() {
        let mut graph = xor_shape();
        graph.edges.remove("L0-n0->L1-n2");
        let net = compile(&graph).unwrap();
        let hidden = &net.layers()[1];
        assert_eq!(net.weights()[hidden.weight_index(2, 0)], 0.0);
        assert_eq!(net.pruned, vec![hidden.weight_index(2, 0)]);
    }

    #[test]
    fn biases_follow_vertical_node_order() {
        let mut graph = LayerGraph::default();
        graph.layers.push(LayerSpec {
            id: "in".into(), kind: LayerKind::Input, activation: ActivationFunction::Linear,
            units: 1, x: 0.0, dropout: None,
        });
        graph.layers.push(LayerSpec {
            id: "out".into(), kind: LayerKind::Output, activation: ActivationFunction::Linear,
            units: 2, x: 1.0, dropout: None,
        });
        let node = |layer: &str, bias: f64, y: f64| NodeSpec {
            layer_id: layer.into(), bias, activation: ActivationFunction::Linear, y,
        };
        graph.nodes.insert("a".into(), node("in", 0.0, 0.0));
        graph.nodes.insert("b".into(), node("out", 1.0, 10.0));
        graph.nodes.insert("c".into(), node("out", 2.0, 5.0));
        graph.edges.insert("e".into(), EdgeSpec { from: "a".into(), to: "b".into(), weight: 0.5 });

        let net = compile(&graph).unwrap();
        assert_eq!(net.biases(), &[2.0, 1.0]);
        assert_eq!(net.weights(), &[0.0, 0.5]);
    }

    #[test]
    fn unit_count_mismatch_is_tolerated() {
        let mut graph = xor_shape();
        graph.layers[1].units = 7;
        let net = compile(&graph).unwrap();
        assert_eq!(net.layers()[1].output_size, 4);
    }

    #[test]
    fn out_of_range_dropout_is_rejected() {
        let mut graph = xor_shape();
        graph.layers[1].dropout = Some(1.0);
        assert!(compile(&graph).is_err());
    }

    #[test]
    fn write_back_restores_graph_parameters() {
        let mut graph = xor_shape();
        let mut net = compile(&graph).unwrap();
        net.weights_mut()[0] = 42.0;
        net.biases_mut()[4] = -3.0;
        net.write_back(&mut graph);
        assert_eq!(graph.edges["L0-n0->L1-n0"].weight, 42.0);
        assert_eq!(graph.nodes["L2-n0"].bias, -3.0);
        assert_eq!(compile(&graph).unwrap().weights(), net.weights());
    }
}
