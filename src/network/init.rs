use rand::Rng;
use serde::{Serialize, Deserialize};
use std::f64::consts::PI;

use crate::activation::ActivationFunction;

/// Weight initialisation scheme used when a graph is generated rather than edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WeightInit {
    /// N(0, sqrt(1 / fan_in)); suits Sigmoid/Tanh/Linear layers.
    Xavier,
    /// N(0, sqrt(2 / fan_in)); suits ReLU-family layers.
    He,
}

impl WeightInit {
    /// He for rectifiers, Xavier for everything else.
    pub fn for_activation(activation: ActivationFunction) -> WeightInit {
        match activation {
            ActivationFunction::ReLU
            | ActivationFunction::LeakyReLU { .. }
            | ActivationFunction::Elu { .. }
            | ActivationFunction::Gelu
            | ActivationFunction::Swish => WeightInit::He,
            _ => WeightInit::Xavier,
        }
    }

    /// Draws one weight for a unit with `fan_in` incoming connections.
    pub fn sample<R: Rng + ?Sized>(self, fan_in: usize, rng: &mut R) -> f64 {
        let fan_in = fan_in.max(1) as f64;
        match self {
            WeightInit::Xavier => sample_standard_normal(rng) * (1.0 / fan_in).sqrt(),
            WeightInit::He => sample_standard_normal(rng) * (2.0 / fan_in).sqrt(),
        }
    }
}

/// Samples a single value from N(0, 1) using the Box-Muller transform.
fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // Draw two independent uniform samples in (0, 1] to avoid log(0).
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = 1.0 - rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
