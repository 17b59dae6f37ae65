//! Stateless activation math shared by every layer.
//!
//! Hidden layers use ReLU; the output layer turns logits into a probability
//! distribution with a numerically guarded softmax.

/// Largest argument ever passed to `exp` inside [`softmax`].
pub const MAX_EXPONENT: f64 = 80.0;
/// Floor for the softmax partition sum.
pub const MIN_PARTITION: f64 = 1e-7;

/// An element-wise activation and its derivative.
#[derive(Clone, Copy, Debug)]
pub struct Activation {
    pub function: fn(f64) -> f64,
    pub derivative: fn(f64) -> f64,
}

impl Activation {
    pub fn apply_vector(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|&v| (self.function)(v)).collect()
    }

    pub fn derivative_vector(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|&v| (self.derivative)(v)).collect()
    }
}

pub const RELU: Activation = Activation {
    function: |x| if x > 0.0 { x } else { 0.0 },
    derivative: |x| if x > 0.0 { 1.0 } else { 0.0 },
};

/// Element-wise `max(0, x)`.
pub fn relu(x: &[f64]) -> Vec<f64> {
    RELU.apply_vector(x)
}

/// 1 where `x > 0`, 0 elsewhere.
pub fn relu_derivative(x: &[f64]) -> Vec<f64> {
    RELU.derivative_vector(x)
}

/// Zeroes the entries of `grad` whose ReLU output was not positive.
///
/// `activation_output` is the post-ReLU value cached during the forward pass.
pub fn gate_relu(grad: &mut [f64], activation_output: &[f64]) {
    for (g, &a) in grad.iter_mut().zip(activation_output) {
        *g *= (RELU.derivative)(a);
    }
}

/// Softmax with max subtraction, a clamped exponent and a floored partition sum.
pub fn softmax(x: &[f64]) -> Vec<f64> {
    let max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = x
        .iter()
        .map(|&v| (v - max).min(MAX_EXPONENT).exp())
        .collect();
    let sum = exps.iter().sum::<f64>().max(MIN_PARTITION);
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_relu_and_derivative() {
        let x = [-2.0, 0.0, 3.5];
        assert_eq!(relu(&x), vec![0.0, 0.0, 3.5]);
        assert_eq!(relu_derivative(&x), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_gate_relu() {
        let mut grad = vec![0.5, -0.5, 1.0];
        gate_relu(&mut grad, &[0.0, 2.0, 0.1]);
        assert_eq!(grad, vec![0.0, -0.5, 1.0]);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let out = softmax(&[1.0, 2.0, 3.0]);
        assert_relative_eq!(out.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(out[2] > out[1] && out[1] > out[0]);
        assert_relative_eq!(out[0], 0.09003057317038046, epsilon = 1e-12);
    }

    #[test]
    fn test_softmax_pathological_logits() {
        for logits in [
            vec![1e300, -1e300, 0.0],
            vec![-1e9, -1e9, -1e9],
            vec![1000.0, 999.0, -1000.0],
        ] {
            let out = softmax(&logits);
            assert!(out.iter().all(|p| p.is_finite() && *p >= 0.0));
            assert_relative_eq!(out.iter().sum::<f64>(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_softmax_uniform_for_equal_logits() {
        let out = softmax(&[4.0; 4]);
        for p in out {
            assert_relative_eq!(p, 0.25, epsilon = 1e-12);
        }
    }
}
