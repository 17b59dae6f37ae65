//! Trainable layers of the network.
//!
//! Every layer owns its weight matrix (`output_size × input_size`) and bias
//! vector, caches the input of its last forward pass, and updates its own
//! parameters during `backward`.
use crate::error::NetworkError;
use crate::network_config::ConvolutionConfig;
use matrix::matrix::Matrix;
use rand::Rng;
use std::fmt;

/// The closed set of layer kinds a [`crate::Network`] can stack.
#[derive(Debug, Clone)]
pub enum Layer {
    FullyConnected(FullyConnected),
    Convolutional1D(Convolutional1D),
}

impl Layer {
    pub fn forward(&mut self, input: &[f64]) -> Vec<f64> {
        match self {
            Layer::FullyConnected(layer) => layer.forward(input),
            Layer::Convolutional1D(layer) => layer.forward(input),
        }
    }

    /// Applies the update for `grad_out` and returns the gradient w.r.t. the layer input.
    pub fn backward(&mut self, grad_out: &[f64], learning_rate: f64) -> Vec<f64> {
        match self {
            Layer::FullyConnected(layer) => layer.backward(grad_out, learning_rate),
            Layer::Convolutional1D(layer) => layer.backward(grad_out, learning_rate),
        }
    }

    pub fn input_size(&self) -> usize {
        match self {
            Layer::FullyConnected(layer) => layer.weights.cols(),
            Layer::Convolutional1D(layer) => layer.in_channels * layer.input_width,
        }
    }

    pub fn output_size(&self) -> usize {
        match self {
            Layer::FullyConnected(layer) => layer.weights.rows(),
            Layer::Convolutional1D(layer) => layer.out_channels * layer.output_width,
        }
    }

    pub fn weights(&self) -> &Matrix {
        match self {
            Layer::FullyConnected(layer) => &layer.weights,
            Layer::Convolutional1D(layer) => &layer.weights,
        }
    }

    pub fn biases(&self) -> &[f64] {
        match self {
            Layer::FullyConnected(layer) => &layer.biases,
            Layer::Convolutional1D(layer) => &layer.biases,
        }
    }

    /// Replaces the parameters, rejecting any shape that differs from the current one.
    pub fn set_parameters(
        &mut self,
        weights: Matrix,
        biases: Vec<f64>,
    ) -> Result<(), NetworkError> {
        let current = self.weights();
        if weights.rows() != current.rows()
            || weights.cols() != current.cols()
            || biases.len() != current.rows()
        {
            return Err(NetworkError::InvalidConfig(format!(
                "parameter shape {}x{} (+{} biases) does not fit layer {}",
                weights.rows(),
                weights.cols(),
                biases.len(),
                self
            )));
        }
        match self {
            Layer::FullyConnected(layer) => {
                layer.weights = weights;
                layer.biases = biases;
            }
            Layer::Convolutional1D(layer) => {
                layer.weights = weights;
                layer.biases = biases;
            }
        }
        Ok(())
    }

    pub fn parameter_count(&self) -> usize {
        let weights = self.weights();
        weights.rows() * weights.cols() + self.biases().len()
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Layer::FullyConnected(layer) => write!(
                f,
                "FullyConnected {{ in: {}, out: {} }}",
                layer.weights.cols(),
                layer.weights.rows()
            ),
            Layer::Convolutional1D(layer) => write!(
                f,
                "Convolutional1D {{ channels: {}->{}, kernel: {}, stride: {}, padding: {}, width: {}->{} }}",
                layer.in_channels,
                layer.out_channels,
                layer.kernel_size,
                layer.stride,
                layer.padding,
                layer.input_width,
                layer.output_width
            ),
        }
    }
}

/// Dense layer computing `W·x + b`.
#[derive(Debug, Clone)]
pub struct FullyConnected {
    weights: Matrix,
    biases: Vec<f64>,
    input: Vec<f64>,
}

impl FullyConnected {
    /// Gaussian weights with standard deviation `sqrt(init_gain / input_size)`, zero biases.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        init_gain: f64,
        rng: &mut R,
    ) -> Self {
        let std_dev = (init_gain / input_size.max(1) as f64).sqrt();
        Self::from_parameters(
            Matrix::random_normal(output_size, input_size, std_dev, rng),
            vec![0.0; output_size],
        )
    }

    pub fn from_parameters(weights: Matrix, biases: Vec<f64>) -> Self {
        assert_eq!(weights.rows(), biases.len(), "One bias per output row");
        Self {
            weights,
            biases,
            input: Vec::new(),
        }
    }

    pub fn forward(&mut self, input: &[f64]) -> Vec<f64> {
        self.input = input.to_vec();
        self.weights
            .mul_vector(input)
            .into_iter()
            .zip(&self.biases)
            .map(|(z, b)| z + b)
            .collect()
    }

    pub fn backward(&mut self, grad_out: &[f64], learning_rate: f64) -> Vec<f64> {
        // Input gradient uses the weights seen by the forward pass.
        let grad_in = self.weights.transpose_mul_vector(grad_out);

        let weight_grad = Matrix::outer(grad_out, &self.input);
        self.weights.scaled_subtract_assign(&weight_grad, learning_rate);
        for (b, &g) in self.biases.iter_mut().zip(grad_out) {
            *b -= learning_rate * g;
        }

        grad_in
    }
}

/// One-dimensional convolution over channel-major input (`channel * width + position`).
///
/// Kernels are stored as rows of an `out_channels × (in_channels · kernel_size)`
/// matrix, so the layer persists exactly like a dense one.
#[derive(Debug, Clone)]
pub struct Convolutional1D {
    in_channels: usize,
    out_channels: usize,
    kernel_size: usize,
    stride: usize,
    padding: usize,
    input_width: usize,
    output_width: usize,
    weights: Matrix,
    biases: Vec<f64>,
    input: Vec<f64>,
}

impl Convolutional1D {
    pub fn new<R: Rng + ?Sized>(
        conv: &ConvolutionConfig,
        input_width: usize,
        init_gain: f64,
        rng: &mut R,
    ) -> Result<Self, NetworkError> {
        if conv.kernel_size == 0
            || conv.stride == 0
            || conv.in_channels == 0
            || conv.out_channels == 0
        {
            return Err(NetworkError::InvalidConfig(
                "convolution channels, kernel size and stride must be positive".to_string(),
            ));
        }
        let padded = input_width + 2 * conv.padding;
        if padded < conv.kernel_size {
            return Err(NetworkError::InvalidConfig(format!(
                "kernel size {} exceeds padded input width {}",
                conv.kernel_size, padded
            )));
        }
        let output_width = (padded - conv.kernel_size) / conv.stride + 1;
        let fan_in = conv.in_channels * conv.kernel_size;
        let std_dev = (init_gain / fan_in as f64).sqrt();

        Ok(Self {
            in_channels: conv.in_channels,
            out_channels: conv.out_channels,
            kernel_size: conv.kernel_size,
            stride: conv.stride,
            padding: conv.padding,
            input_width,
            output_width,
            weights: Matrix::random_normal(conv.out_channels, fan_in, std_dev, rng),
            biases: vec![0.0; conv.out_channels],
            input: Vec::new(),
        })
    }

    pub fn output_width(&self) -> usize {
        self.output_width
    }

    /// Input position read by kernel tap `k` at output position `ow`, if inside the input.
    fn input_position(&self, ow: usize, k: usize) -> Option<usize> {
        (ow * self.stride + k)
            .checked_sub(self.padding)
            .filter(|&w| w < self.input_width)
    }

    pub fn forward(&mut self, input: &[f64]) -> Vec<f64> {
        assert_eq!(
            input.len(),
            self.in_channels * self.input_width,
            "Invalid input length for convolution"
        );
        self.input = input.to_vec();

        let mut output = vec![0.0; self.out_channels * self.output_width];
        for oc in 0..self.out_channels {
            let kernel = self.weights.row(oc);
            for ow in 0..self.output_width {
                let mut sum = self.biases[oc];
                for ic in 0..self.in_channels {
                    for k in 0..self.kernel_size {
                        if let Some(w) = self.input_position(ow, k) {
                            sum += input[ic * self.input_width + w]
                                * kernel[ic * self.kernel_size + k];
                        }
                    }
                }
                output[oc * self.output_width + ow] = sum;
            }
        }
        output
    }

    pub fn backward(&mut self, grad_out: &[f64], learning_rate: f64) -> Vec<f64> {
        let fan_in = self.in_channels * self.kernel_size;
        let mut weight_grad = Matrix::zeros(self.out_channels, fan_in);
        let mut bias_grad = vec![0.0; self.out_channels];
        let mut grad_in = vec![0.0; self.input.len()];

        for oc in 0..self.out_channels {
            let kernel = self.weights.row(oc);
            for ow in 0..self.output_width {
                let g = grad_out[oc * self.output_width + ow];
                bias_grad[oc] += g;
                for ic in 0..self.in_channels {
                    for k in 0..self.kernel_size {
                        if let Some(w) = self.input_position(ow, k) {
                            let input_idx = ic * self.input_width + w;
                            let tap = ic * self.kernel_size + k;
                            weight_grad.data_mut()[oc * fan_in + tap] += g * self.input[input_idx];
                            grad_in[input_idx] += g * kernel[tap];
                        }
                    }
                }
            }
        }

        self.weights.scaled_subtract_assign(&weight_grad, learning_rate);
        for (b, g) in self.biases.iter_mut().zip(bias_grad) {
            *b -= learning_rate * g;
        }

        grad_in
    }
}
