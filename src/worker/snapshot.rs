use std::time::{Duration, Instant};

use crate::network::CompiledNetwork;
use crate::train::MetricsSnapshot;
use crate::worker::engine::EngineOptions;
use crate::worker::protocol::{Notification, ParamMap};

/// Builds an `UPDATE` notification from the network's current buffers.
///
/// Weights (and their gradients) are sampled with a fixed stride once the
/// network has more than `max_snapshot_weights` of them; biases are always
/// sent in full.
pub fn build_update(network: &CompiledNetwork, metrics: MetricsSnapshot, options: &EngineOptions) -> Notification {
    let stride = sample_stride(network.weights().len(), options.max_snapshot_weights);
    let mut weights = ParamMap::new();
    let mut gradients = options.include_gradients.then(ParamMap::new);
    let mut biases = ParamMap::new();
    let mut activations = options.include_activations.then(ParamMap::new);

    for (l, layer) in network.layers().iter().enumerate() {
        if let Some(acts) = activations.as_mut() {
            for (unit, a) in network.activations(l).iter().enumerate() {
                acts.insert(format!("a:{}:{}", layer.id, unit), *a);
            }
        }
        if layer.is_input() {
            continue;
        }
        for j in 0..layer.output_size {
            biases.insert(format!("b:{}:{}", layer.id, j), network.biases()[layer.bias_offset + j]);
            let Some(stride) = stride else { continue };
            for k in 0..layer.input_size {
                let idx = layer.weight_index(j, k);
                if idx % stride != 0 {
                    continue;
                }
                weights.insert(format!("w:{}:{}:{}", layer.id, j, k), network.weights()[idx]);
                if let Some(grads) = gradients.as_mut() {
                    grads.insert(format!("g:{}:{}:{}", layer.id, j, k), network.weight_gradients()[idx]);
                }
            }
        }
    }

    Notification::Update { weights, biases, gradients, activations, metrics }
}

/// `None` when no weights should be sent at all.
fn sample_stride(total: usize, cap: usize) -> Option<usize> {
    if cap == 0 {
        return None;
    }
    Some(total.div_ceil(cap).max(1))
}

/// Rate limiter for `UPDATE` notifications.
#[derive(Debug, Clone)]
pub struct UpdateThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl UpdateThrottle {
    pub fn new(interval: Duration) -> UpdateThrottle {
        UpdateThrottle { interval, last: None }
    }

    /// True (and the window restarts) if at least one interval has passed
    /// since the last accepted update.
    pub fn ready(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    /// Marks an update as sent outside the throttle.
    pub fn mark(&mut self) {
        self.last = Some(Instant::now());
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationFunction;
    use crate::network::{compile, LayerGraph};

    fn network() -> CompiledNetwork {
        compile(&LayerGraph::dense(
            3,
            &[(4, ActivationFunction::ReLU), (2, ActivationFunction::Sigmoid)],
            Some(1),
        ))
        .unwrap()
    }

    fn parts(update: Notification) -> (ParamMap, ParamMap, Option<ParamMap>, Option<ParamMap>) {
        match update {
            Notification::Update { weights, biases, gradients, activations, .. } => {
                (weights, biases, gradients, activations)
            }
            other => panic!("expected UPDATE, got {other:?}"),
        }
    }

    #[test]
    fn small_networks_are_sent_in_full() {
        let net = network();
        let (weights, biases, gradients, activations) =
            parts(build_update(&net, MetricsSnapshot::default(), &EngineOptions::default()));
        assert_eq!(weights.len(), 3 * 4 + 4 * 2);
        assert_eq!(biases.len(), 6);
        assert_eq!(weights["w:L1:0:0"], net.weights()[0]);
        assert_eq!(biases["b:L2:1"], net.biases()[5]);
        assert!(gradients.is_none());
        assert!(activations.is_none());
    }

    #[test]
    fn weights_are_strided_above_the_cap() {
        let options = EngineOptions { max_snapshot_weights: 5, ..EngineOptions::default() };
        let (weights, biases, _, _) = parts(build_update(&network(), MetricsSnapshot::default(), &options));
        // 20 weights, stride 4
        assert_eq!(weights.len(), 5);
        assert!(weights.contains_key("w:L1:1:1"));
        assert_eq!(biases.len(), 6);
    }

    #[test]
    fn optional_maps_follow_options() {
        let options = EngineOptions {
            include_gradients: true,
            include_activations: true,
            ..EngineOptions::default()
        };
        let (weights, _, gradients, activations) =
            parts(build_update(&network(), MetricsSnapshot::default(), &options));
        let gradients = gradients.unwrap();
        assert_eq!(gradients.len(), weights.len());
        assert!(gradients.contains_key("g:L2:1:3"));
        assert_eq!(activations.unwrap().len(), 3 + 4 + 2);
    }

    #[test]
    fn throttle_admits_one_update_per_interval() {
        let mut throttle = UpdateThrottle::new(Duration::from_secs(3600));
        assert!(throttle.ready());
        assert!(!throttle.ready());
        throttle.reset();
        assert!(throttle.ready());

        let mut open = UpdateThrottle::new(Duration::ZERO);
        assert!(open.ready());
        assert!(open.ready());
    }
}
