use serde::{Serialize, Deserialize};
use std::f64::consts::PI;

/// Exponent arguments are clamped to this magnitude so `exp` never overflows.
const EXP_CLAMP: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivationFunction {
    #[default]
    #[serde(alias = "identity")]
    Linear,
    Sigmoid,
    Tanh,
    #[serde(rename = "relu")]
    ReLU,
    #[serde(rename = "leakyRelu")]
    LeakyReLU { alpha: f64 },
    Elu { alpha: f64 },
    Gelu,
    Swish,
    /// Vector-valued: normalises the whole layer. `apply` and `backprop`
    /// handle it at layer level; the element-wise paths treat it as linear.
    Softmax,
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x.clamp(-EXP_CLAMP, EXP_CLAMP)).exp())
}

impl ActivationFunction {
    /// Element-wise activation.
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Linear | ActivationFunction::Softmax => x,
            ActivationFunction::Sigmoid => sigmoid(x),
            ActivationFunction::Tanh => x.clamp(-EXP_CLAMP, EXP_CLAMP).tanh(),
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { x } else { alpha * x },
            ActivationFunction::Elu { alpha } => {
                if x > 0.0 { x } else { alpha * (x.max(-EXP_CLAMP).exp() - 1.0) }
            }
            ActivationFunction::Gelu => {
                let c = (2.0_f64 / PI).sqrt();
                0.5 * x * (1.0 + (c * (x + 0.044715 * x.powi(3))).tanh())
            }
            ActivationFunction::Swish => x * sigmoid(x),
        }
    }

    /// Element-wise derivative, evaluated at the pre-activation value `x`.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Linear | ActivationFunction::Softmax => 1.0,
            ActivationFunction::Sigmoid => {
                let fx = sigmoid(x);
                fx * (1.0 - fx)
            }
            ActivationFunction::Tanh => {
                let t = x.clamp(-EXP_CLAMP, EXP_CLAMP).tanh();
                1.0 - t * t
            }
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { 1.0 } else { *alpha },
            ActivationFunction::Elu { alpha } => {
                if x > 0.0 { 1.0 } else { alpha * x.max(-EXP_CLAMP).exp() }
            }
            ActivationFunction::Gelu => {
                let c = (2.0_f64 / PI).sqrt();
                let inner = c * (x + 0.044715 * x.powi(3));
                let tanh_inner = inner.tanh();
                let sech2 = 1.0 - tanh_inner * tanh_inner;
                let d_inner = c * (1.0 + 3.0 * 0.044715 * x.powi(2));
                0.5 * tanh_inner + 0.5 * x * sech2 * d_inner + 0.5
            }
            ActivationFunction::Swish => {
                let sig = sigmoid(x);
                sig + x * sig * (1.0 - sig)
            }
        }
    }

    /// Applies the activation to a whole layer of pre-activation values.
    pub fn apply(&self, z: &[f64], out: &mut [f64]) {
        debug_assert_eq!(z.len(), out.len());
        match self {
            ActivationFunction::Softmax => {
                let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let mut sum = 0.0;
                for (o, &x) in out.iter_mut().zip(z) {
                    *o = (x - max).exp();
                    sum += *o;
                }
                for o in out.iter_mut() {
                    *o /= sum;
                }
            }
            _ => {
                for (o, &x) in out.iter_mut().zip(z) {
                    *o = self.function(x);
                }
            }
        }
    }

    /// Maps `grad` (∂L/∂a) to ∂L/∂z for a whole layer, writing into `out`.
    ///
    /// Element-wise kinds multiply by the derivative at `z`; softmax uses its
    /// Jacobian-vector product `s_i * (g_i - Σ_j g_j s_j)`.
    pub fn backprop(&self, z: &[f64], grad: &[f64], out: &mut [f64]) {
        debug_assert_eq!(z.len(), grad.len());
        debug_assert_eq!(z.len(), out.len());
        match self {
            ActivationFunction::Softmax => {
                self.apply(z, out);
                let dot: f64 = out.iter().zip(grad).map(|(s, g)| s * g).sum();
                for (o, &g) in out.iter_mut().zip(grad) {
                    *o *= g - dot;
                }
            }
            _ => {
                for ((o, &x), &g) in out.iter_mut().zip(z).zip(grad) {
                    *o = g * self.derivative(x);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ActivationFunction; 8] = [
        ActivationFunction::Linear,
        ActivationFunction::Sigmoid,
        ActivationFunction::Tanh,
        ActivationFunction::ReLU,
        ActivationFunction::LeakyReLU { alpha: 0.1 },
        ActivationFunction::Elu { alpha: 1.0 },
        ActivationFunction::Gelu,
        ActivationFunction::Swish,
    ];

    #[test]
    fn derivatives_match_finite_differences() {
        let h = 1e-6;
        for act in ALL {
            for &x in &[-2.3, -0.7, 0.4, 1.9] {
                let numeric = (act.function(x + h) - act.function(x - h)) / (2.0 * h);
                assert!(
                    (numeric - act.derivative(x)).abs() < 1e-5,
                    "{act:?} at {x}: numeric {numeric}, analytic {}",
                    act.derivative(x)
                );
            }
        }
    }

    #[test]
    fn sigmoid_and_tanh_stay_finite_for_huge_inputs() {
        for &x in &[-1e6, 1e6] {
            assert!(ActivationFunction::Sigmoid.function(x).is_finite());
            assert!(ActivationFunction::Tanh.derivative(x).is_finite());
            assert!(ActivationFunction::Swish.function(x).is_finite());
        }
        assert_eq!(ActivationFunction::Sigmoid.function(-1e6), sigmoid(-EXP_CLAMP));
    }

    #[test]
    fn softmax_sums_to_one_and_is_shift_invariant() {
        let mut a = [0.0; 3];
        let mut b = [0.0; 3];
        ActivationFunction::Softmax.apply(&[1.0, 2.0, 3.0], &mut a);
        ActivationFunction::Softmax.apply(&[1001.0, 1002.0, 1003.0], &mut b);
        assert!((a.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn softmax_backprop_matches_finite_differences() {
        let z = [0.3, -1.2, 0.8];
        let g = [0.5, -0.25, 1.0];
        let mut analytic = [0.0; 3];
        ActivationFunction::Softmax.backprop(&z, &g, &mut analytic);

        let h = 1e-6;
        let objective = |z: &[f64]| {
            let mut s = [0.0; 3];
            ActivationFunction::Softmax.apply(z, &mut s);
            s.iter().zip(&g).map(|(s, g)| s * g).sum::<f64>()
        };
        for i in 0..3 {
            let mut up = z;
            let mut down = z;
            up[i] += h;
            down[i] -= h;
            let numeric = (objective(&up) - objective(&down)) / (2.0 * h);
            assert!((numeric - analytic[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn deserializes_camel_case_kinds() {
        let act: ActivationFunction = serde_json::from_str("\"relu\"").unwrap();
        assert_eq!(act, ActivationFunction::ReLU);
        let act: ActivationFunction =
            serde_json::from_str(r#"{"leakyRelu":{"alpha":0.2}}"#).unwrap();
        assert_eq!(act, ActivationFunction::LeakyReLU { alpha: 0.2 });
    }
}
