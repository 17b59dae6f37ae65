use crate::error::TrainingError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration parameters for neural network training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of training epochs
    pub epochs: u32,
    /// Size of each training batch
    pub batch_size: usize,
    /// Learning rate of the first epoch
    pub learning_rate: f64,
    /// Factor applied to the learning rate every `lr_decay_every` epochs
    pub lr_decay: f64,
    /// Epochs between two decay steps; 0 keeps the rate constant
    pub lr_decay_every: u32,
    /// The decayed rate never drops below this value
    pub min_learning_rate: f64,
    /// Number of epochs to wait for improvement before early stopping
    pub early_stopping_patience: u32,
    /// Minimum improvement in test accuracy required to reset patience counter
    pub early_stopping_min_delta: f64,
    /// Training stops once both target accuracies are reached
    pub target_train_accuracy: f64,
    pub target_test_accuracy: f64,
    pub show_progress: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 50,
            batch_size: 32,
            learning_rate: 0.01,
            lr_decay: 0.5,
            lr_decay_every: 10,
            min_learning_rate: 1e-4,
            early_stopping_patience: 10,
            early_stopping_min_delta: 0.001,
            target_train_accuracy: 0.99,
            target_test_accuracy: 0.95,
            show_progress: true,
        }
    }
}

impl TrainingConfig {
    /// Loads a training configuration from a JSON file; missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, TrainingError> {
        let config_str = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&config_str)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), TrainingError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn schedule(&self) -> LearningRateSchedule {
        LearningRateSchedule::step_decay(
            self.learning_rate,
            self.lr_decay,
            self.lr_decay_every,
            self.min_learning_rate,
        )
    }
}

/// Step decay: `max(initial * decay^(epoch / every), min)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearningRateSchedule {
    initial: f64,
    decay: f64,
    every: u32,
    min: f64,
}

impl LearningRateSchedule {
    pub fn step_decay(initial: f64, decay: f64, every: u32, min: f64) -> Self {
        Self {
            initial,
            decay,
            every,
            min,
        }
    }

    pub fn constant(rate: f64) -> Self {
        Self::step_decay(rate, 1.0, 0, rate)
    }

    /// Learning rate for the zero-based `epoch`.
    pub fn rate(&self, epoch: u32) -> f64 {
        if self.every == 0 {
            return self.initial.max(self.min);
        }
        let steps = (epoch / self.every) as i32;
        (self.initial * self.decay.powi(steps)).max(self.min)
    }
}
