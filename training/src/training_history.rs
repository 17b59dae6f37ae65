use crate::error::TrainingError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Measurements of one finished epoch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochMetrics {
    pub loss: f64,
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub learning_rate: f64,
}

/// Training history containing metrics recorded during training
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    /// Mean loss of the trained samples, per epoch
    pub losses: Vec<f64>,
    pub train_accuracies: Vec<f64>,
    pub test_accuracies: Vec<f64>,
    pub learning_rates: Vec<f64>,
    /// Best test accuracy achieved during training
    pub best_test_accuracy: f64,
    /// Epoch where the best test accuracy was achieved, 0 before the first epoch
    pub best_epoch: u32,
    pub stopped_early: bool,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `metrics` for `epoch` and returns true when it is the new best.
    pub fn record_epoch(&mut self, epoch: u32, metrics: EpochMetrics) -> bool {
        self.losses.push(metrics.loss);
        self.train_accuracies.push(metrics.train_accuracy);
        self.test_accuracies.push(metrics.test_accuracy);
        self.learning_rates.push(metrics.learning_rate);

        let improved = self.best_epoch == 0 || metrics.test_accuracy > self.best_test_accuracy;
        if improved {
            self.best_test_accuracy = metrics.test_accuracy;
            self.best_epoch = epoch;
        }
        improved
    }

    pub fn epochs(&self) -> usize {
        self.losses.len()
    }

    pub fn save(&self, path: &Path) -> Result<(), TrainingError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, TrainingError> {
        let history_str = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&history_str)?)
    }

    /// Prints a summary of the training history
    pub fn print_summary(&self) {
        println!("\nTraining History Summary:");
        println!("------------------------");
        println!(
            "Best test accuracy: {:.2}% (epoch {})",
            self.best_test_accuracy * 100.0,
            self.best_epoch
        );
        println!(
            "Final train accuracy: {:.2}%",
            self.train_accuracies.last().unwrap_or(&0.0) * 100.0
        );
        println!(
            "Final test accuracy: {:.2}%",
            self.test_accuracies.last().unwrap_or(&0.0) * 100.0
        );
        println!("Final loss: {:.4}", self.losses.last().unwrap_or(&0.0));
        if self.stopped_early {
            println!("Stopped early after {} epochs", self.epochs());
        }

        // Print accuracy progression at 25% intervals
        let len = self.epochs();
        if len >= 4 {
            println!("\nAccuracy progression:");
            for i in 0..=3 {
                let idx = i * (len - 1) / 3;
                println!(
                    "Epoch {}: train {:.2}%, test {:.2}% (loss: {:.4}, lr: {:.5})",
                    idx + 1,
                    self.train_accuracies[idx] * 100.0,
                    self.test_accuracies[idx] * 100.0,
                    self.losses[idx],
                    self.learning_rates[idx]
                );
            }
        }
    }
}
