use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Serialize, Deserialize};

use crate::activation::ActivationFunction;
use crate::network::init::WeightInit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayerKind {
    Input,
    Dense,
    Output,
}

/// One layer of the editable graph.
///
/// `x` is the horizontal position; layers are compiled in ascending `x` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSpec {
    pub id: String,
    pub kind: LayerKind,
    #[serde(default)]
    pub activation: ActivationFunction,
    pub units: usize,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub dropout: Option<f64>,
}

/// One unit. `y` orders units inside their layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    pub layer_id: String,
    #[serde(default)]
    pub bias: f64,
    #[serde(default)]
    pub activation: ActivationFunction,
    #[serde(default)]
    pub y: f64,
}

/// A weighted connection between two units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeSpec {
    pub from: String,
    pub to: String,
    pub weight: f64,
}

/// Fully specified layer/node/edge description of a feed-forward network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerGraph {
    pub layers: Vec<LayerSpec>,
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeSpec>,
    #[serde(default)]
    pub edges: BTreeMap<String, EdgeSpec>,
}

const LAYER_SPACING: f64 = 200.0;
const NODE_SPACING: f64 = 60.0;

impl LayerGraph {
    /// Builds a fully-connected graph: an input layer of `input_units`, then one
    /// layer per `(units, activation)` tuple, the last one being the output.
    ///
    /// Weights are drawn with `WeightInit::for_activation`, biases start at 0.
    /// Ids are `L<i>` for layers, `L<i>-n<j>` for nodes and `<from>-><to>` for edges.
    pub fn dense(input_units: usize, layers: &[(usize, ActivationFunction)], seed: Option<u64>) -> LayerGraph {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut graph = LayerGraph::default();

        let shapes = std::iter::once((input_units, ActivationFunction::Linear))
            .chain(layers.iter().copied());
        let last = layers.len();

        let mut prev_nodes: Vec<String> = Vec::new();
        for (i, (units, activation)) in shapes.enumerate() {
            let layer_id = format!("L{i}");
            let kind = if i == 0 {
                LayerKind::Input
            } else if i == last {
                LayerKind::Output
            } else {
                LayerKind::Dense
            };
            graph.layers.push(LayerSpec {
                id: layer_id.clone(),
                kind,
                activation,
                units,
                x: i as f64 * LAYER_SPACING,
                dropout: None,
            });

            let init = WeightInit::for_activation(activation);
            let mut nodes = Vec::with_capacity(units);
            for j in 0..units {
                let node_id = format!("{layer_id}-n{j}");
                graph.nodes.insert(node_id.clone(), NodeSpec {
                    layer_id: layer_id.clone(),
                    bias: 0.0,
                    activation,
                    y: j as f64 * NODE_SPACING,
                });
                for from in &prev_nodes {
                    graph.edges.insert(format!("{from}->{node_id}"), EdgeSpec {
                        from: from.clone(),
                        to: node_id.clone(),
                        weight: init.sample(prev_nodes.len(), &mut rng),
                    });
                }
                nodes.push(node_id);
            }
            prev_nodes = nodes;
        }

        graph
    }

    /// Layers sorted by horizontal position; ties keep their listed order.
    pub fn ordered_layers(&self) -> Vec<&LayerSpec> {
        let mut layers: Vec<&LayerSpec> = self.layers.iter().collect();
        layers.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
        layers
    }

    /// Node ids of `layer_id` sorted by vertical position; ties keep id order.
    pub fn layer_nodes(&self, layer_id: &str) -> Vec<&str> {
        let mut nodes: Vec<(&str, f64)> = self.nodes.iter()
            .filter(|(_, node)| node.layer_id == layer_id)
            .map(|(id, node)| (id.as_str(), node.y))
            .collect();
        nodes.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        nodes.into_iter().map(|(id, _)| id).collect()
    }
}
