use crate::activations::{gate_relu, relu, softmax};
use crate::error::NetworkError;
use crate::layer::{Convolutional1D, FullyConnected, Layer};
use crate::network_config::NetworkConfig;
use crate::sample::Sample;
use log::{debug, warn};
use matrix::vector::{argmax, clip_l2_norm, l2_norm};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;

/// Probabilities are floored here before taking the logarithm.
pub const MIN_PROBABILITY: f64 = 1e-7;
/// Upper bound of the per-sample cross-entropy.
pub const MAX_LOSS: f64 = 10.0;

/// Feed-forward classifier: an optional convolution, ReLU hidden layers and a
/// softmax output.
///
/// Training is plain per-sample SGD with the error vector clipped to
/// `gradient_clip_norm` after every layer, and samples whose loss is above
/// `loss_ceiling` (or not finite) left out of the update.
///
/// # Examples
///
/// ```
/// use neural_network::{Network, NetworkConfig, Sample};
///
/// let config = NetworkConfig {
///     hidden_layers: vec![8],
///     seed: Some(1),
///     ..NetworkConfig::default()
/// };
/// let mut network = Network::new(4, 2, &config).unwrap();
///
/// let batch = vec![
///     Sample::new(0, vec![1.0, 0.0, 0.0, 0.0]),
///     Sample::new(1, vec![0.0, 0.0, 0.0, 1.0]),
/// ];
/// let summary = network.train_batch(&batch, 0.05);
/// assert_eq!(summary.trained, 2);
///
/// let prediction = network.predict(&[1.0, 0.0, 0.0, 0.0]).unwrap();
/// assert_eq!(prediction.probabilities.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Network {
    input_dim: usize,
    num_labels: usize,
    layers: Vec<Layer>,
    config: NetworkConfig,
    /// Post-ReLU outputs of every hidden layer from the last forward pass.
    activations: Vec<Vec<f64>>,
}

/// Outcome of [`Network::predict`].
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: usize,
    pub confidence: f64,
    pub probabilities: Vec<f64>,
}

/// A sample that could not be used, with its position in the batch.
#[derive(Debug)]
pub struct SampleFailure {
    pub index: usize,
    pub error: NetworkError,
}

/// Result of one [`Network::train_batch`] call.
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Mean loss over the samples that were trained on, `0.0` if none were.
    pub average_loss: f64,
    pub trained: usize,
    pub skipped: usize,
    pub failures: Vec<SampleFailure>,
    /// Largest error-vector norm seen during back-propagation, after clipping.
    pub max_gradient_norm: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Evaluation {
    pub correct: usize,
    pub evaluated: usize,
    pub skipped: usize,
}

impl Evaluation {
    /// Fraction of evaluated samples predicted correctly, `0.0` if none were evaluated.
    pub fn accuracy(&self) -> f64 {
        if self.evaluated == 0 {
            0.0
        } else {
            self.correct as f64 / self.evaluated as f64
        }
    }
}

impl Network {
    /// Builds a freshly initialized network for `input_dim` features and
    /// `num_labels` classes.
    ///
    /// Weights are drawn from `config.seed` when set, otherwise from OS entropy.
    pub fn new(
        input_dim: usize,
        num_labels: usize,
        config: &NetworkConfig,
    ) -> Result<Self, NetworkError> {
        match config.seed {
            Some(seed) => {
                Self::with_rng(input_dim, num_labels, config, &mut StdRng::seed_from_u64(seed))
            }
            None => Self::with_rng(input_dim, num_labels, config, &mut StdRng::from_os_rng()),
        }
    }

    pub fn with_rng<R: Rng + ?Sized>(
        input_dim: usize,
        num_labels: usize,
        config: &NetworkConfig,
        rng: &mut R,
    ) -> Result<Self, NetworkError> {
        config.validate()?;
        if input_dim == 0 || num_labels == 0 {
            return Err(NetworkError::InvalidConfig(format!(
                "input dimension ({input_dim}) and label count ({num_labels}) must be positive"
            )));
        }

        let mut layers = Vec::with_capacity(config.hidden_layers.len() + 2);
        let mut width = input_dim;

        if let Some(conv) = &config.convolution {
            if input_dim % conv.in_channels != 0 {
                return Err(NetworkError::InvalidConfig(format!(
                    "input dimension {input_dim} is not divisible into {} channels",
                    conv.in_channels
                )));
            }
            let conv = Layer::Convolutional1D(Convolutional1D::new(
                conv,
                input_dim / conv.in_channels,
                config.init_gain,
                rng,
            )?);
            width = conv.output_size();
            layers.push(conv);
        }

        for &hidden in &config.hidden_layers {
            layers.push(Layer::FullyConnected(FullyConnected::new(
                width,
                hidden,
                config.init_gain,
                rng,
            )));
            width = hidden;
        }
        layers.push(Layer::FullyConnected(FullyConnected::new(
            width,
            num_labels,
            config.init_gain,
            rng,
        )));

        debug!(
            "Initialized network {input_dim} -> {num_labels} with {} layers",
            layers.len()
        );

        Ok(Self {
            input_dim,
            num_labels,
            layers,
            config: config.clone(),
            activations: Vec::new(),
        })
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(Layer::parameter_count).sum()
    }

    fn check_input(&self, features: &[f64]) -> Result<(), NetworkError> {
        if features.len() != self.input_dim {
            return Err(NetworkError::DimensionMismatch {
                expected: self.input_dim,
                actual: features.len(),
            });
        }
        if let Some((index, &value)) = features.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(NetworkError::NonFiniteInput { index, value });
        }
        Ok(())
    }

    /// Runs the network on one feature vector and returns the class probabilities.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::DimensionMismatch`] when the vector length differs
    /// from the input dimension and [`NetworkError::NonFiniteInput`] when any
    /// entry is NaN or infinite.
    pub fn forward(&mut self, features: &[f64]) -> Result<Vec<f64>, NetworkError> {
        self.check_input(features)?;
        self.activations.clear();

        let (output_layer, hidden) = self
            .layers
            .split_last_mut()
            .ok_or_else(|| NetworkError::InvalidConfig("network has no layers".to_string()))?;

        let mut current = features.to_vec();
        for layer in hidden {
            current = relu(&layer.forward(&current));
            self.activations.push(current.clone());
        }

        Ok(softmax(&output_layer.forward(&current)))
    }

    /// Clamped cross-entropy `min(-ln(max(p[label], 1e-7)), 10)`.
    pub fn compute_loss(&self, probabilities: &[f64], label: usize) -> Result<f64, NetworkError> {
        let p = probabilities
            .get(label)
            .filter(|_| label < self.num_labels)
            .ok_or(NetworkError::InvalidLabel {
                label,
                num_labels: self.num_labels,
            })?;
        Ok((-p.max(MIN_PROBABILITY).ln()).min(MAX_LOSS))
    }

    /// Back-propagates `probabilities - onehot(label)` from the last forward
    /// pass, updating every layer. Returns the largest clipped error norm.
    fn backward(&mut self, probabilities: &[f64], label: usize, learning_rate: f64) -> f64 {
        let clip = self.config.gradient_clip_norm;

        let mut grad = probabilities.to_vec();
        grad[label] -= 1.0;
        let mut max_norm = clip_l2_norm(&mut grad, clip);

        for i in (0..self.layers.len()).rev() {
            let mut grad_in = self.layers[i].backward(&grad, learning_rate);
            if i == 0 {
                break;
            }
            clip_l2_norm(&mut grad_in, clip);
            gate_relu(&mut grad_in, &self.activations[i - 1]);
            max_norm = max_norm.max(l2_norm(&grad_in));
            grad = grad_in;
        }

        max_norm
    }

    /// Trains on every sample of `batch` in order with one SGD step each.
    ///
    /// Samples with a bad shape, non-finite features or an out of range label
    /// are reported in [`BatchSummary::failures`] without aborting the batch.
    /// Samples whose loss is above the configured ceiling are counted as
    /// skipped and leave the parameters untouched.
    pub fn train_batch(&mut self, batch: &[Sample], learning_rate: f64) -> BatchSummary {
        let mut summary = BatchSummary::default();
        let mut total_loss = 0.0;

        for (index, sample) in batch.iter().enumerate() {
            let outcome = self
                .forward(&sample.features)
                .and_then(|probabilities| {
                    let loss = self.compute_loss(&probabilities, sample.label)?;
                    Ok((probabilities, loss))
                });
            let (probabilities, loss) = match outcome {
                Ok(result) => result,
                Err(error) => {
                    warn!("Skipping sample {index}: {error}");
                    summary.skipped += 1;
                    summary.failures.push(SampleFailure { index, error });
                    continue;
                }
            };

            if !loss.is_finite() || loss > self.config.loss_ceiling {
                warn!(
                    "Skipping sample {index}: loss {loss:.4} above ceiling {}",
                    self.config.loss_ceiling
                );
                summary.skipped += 1;
                continue;
            }

            let norm = self.backward(&probabilities, sample.label, learning_rate);
            summary.max_gradient_norm = summary.max_gradient_norm.max(norm);
            total_loss += loss;
            summary.trained += 1;
        }

        if summary.trained > 0 {
            summary.average_loss = total_loss / summary.trained as f64;
        }
        summary
    }

    /// Counts correct predictions; samples that fail to run are counted as skipped.
    pub fn evaluate_detailed(&mut self, samples: &[Sample]) -> Evaluation {
        let mut evaluation = Evaluation::default();
        for (index, sample) in samples.iter().enumerate() {
            match self.forward(&sample.features) {
                Ok(probabilities) => {
                    evaluation.evaluated += 1;
                    if argmax(&probabilities) == Some(sample.label) {
                        evaluation.correct += 1;
                    }
                }
                Err(error) => {
                    warn!("Skipping evaluation sample {index}: {error}");
                    evaluation.skipped += 1;
                }
            }
        }
        evaluation
    }

    /// Accuracy over the samples that could be evaluated.
    pub fn evaluate(&mut self, samples: &[Sample]) -> f64 {
        self.evaluate_detailed(samples).accuracy()
    }

    pub fn predict(&mut self, features: &[f64]) -> Result<Prediction, NetworkError> {
        let probabilities = self.forward(features)?;
        let label = argmax(&probabilities).unwrap_or(0);
        Ok(Prediction {
            label,
            confidence: probabilities.get(label).copied().unwrap_or(0.0),
            probabilities,
        })
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "Network: {} inputs, {} labels, {} parameters",
            self.input_dim,
            self.num_labels,
            self.parameter_count()
        )?;
        for (i, layer) in self.layers.iter().enumerate() {
            writeln!(f, "  [{i}] {layer}")?;
        }
        Ok(())
    }
}
