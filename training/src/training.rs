//! Training driver for the fingerprinting network.
//!
//! This module provides the training infrastructure, including:
//! - Minibatch SGD over a shuffled copy of the training set every epoch
//! - Step-decay learning rate schedule
//! - Early stopping on target accuracies or a test-accuracy plateau
//! - Checkpointing whenever the test accuracy improves
//! - Progress visualization using progress bars

use crate::error::TrainingError;
use crate::training_config::TrainingConfig;
use crate::training_history::{EpochMetrics, TrainingHistory};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use neural_network::{Network, NetworkError};
use rand::Rng;
use rand::seq::SliceRandom;
use session_features::Dataset;
use std::path::Path;

/// Trainer manages the training of one network.
///
/// The trainer handles:
/// - Training loop execution
/// - Early stopping
/// - Progress visualization
/// - Model persistence
pub struct Trainer {
    network: Network,
    config: TrainingConfig,
    history: TrainingHistory,
}

impl Trainer {
    /// Creates a new trainer for `network`.
    ///
    /// # Arguments
    /// * `network` - Freshly initialized or previously loaded network
    /// * `config` - Training configuration parameters
    pub fn new(network: Network, config: TrainingConfig) -> Self {
        Self {
            network,
            config,
            history: TrainingHistory::new(),
        }
    }

    /// Returns the training history containing accuracy and loss metrics
    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    pub fn into_network(self) -> Network {
        self.network
    }

    /// Trains the network on `dataset.train`, evaluating both partitions after every epoch.
    ///
    /// # Arguments
    /// * `dataset` - Encoded, balanced and split samples
    /// * `checkpoint` - Where to save the model each time the test accuracy improves
    /// * `rng` - Source of the per-epoch shuffles
    ///
    /// When the test partition is empty the train accuracy is monitored instead.
    pub fn train<R: Rng + ?Sized>(
        &mut self,
        dataset: &Dataset,
        checkpoint: Option<&Path>,
        rng: &mut R,
    ) -> Result<&TrainingHistory, TrainingError> {
        if dataset.train.is_empty() {
            return Err(TrainingError::EmptyTrainingSet);
        }
        if self.config.batch_size == 0 {
            return Err(TrainingError::InvalidBatchSize);
        }
        if dataset.feature_dim != self.network.input_dim() {
            return Err(NetworkError::DimensionMismatch {
                expected: self.network.input_dim(),
                actual: dataset.feature_dim,
            }
            .into());
        }

        let schedule = self.config.schedule();
        let batches_per_epoch = dataset.train.len().div_ceil(self.config.batch_size);

        let multi_progress = MultiProgress::new();
        let (epoch_progress, batch_progress) = if self.config.show_progress {
            let epoch_progress =
                multi_progress.add(ProgressBar::new(u64::from(self.config.epochs)));
            let batch_progress = multi_progress.add(ProgressBar::new(batches_per_epoch as u64));
            epoch_progress.set_style(create_progress_style(
                "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} Epoch {msg}",
            ));
            batch_progress.set_style(create_progress_style(
                "{spinner:.yellow} [{elapsed_precise}] {bar:40.yellow/blue} {pos:>7}/{len:7} Batch {msg}",
            ));
            (epoch_progress, batch_progress)
        } else {
            (ProgressBar::hidden(), ProgressBar::hidden())
        };

        info!(
            "Starting training: {} train / {} test samples, batch size {}, {} epochs",
            dataset.train.len(),
            dataset.test.len(),
            self.config.batch_size,
            self.config.epochs
        );

        let monitor_train = dataset.test.is_empty();
        if monitor_train {
            warn!("Test set is empty; monitoring train accuracy instead");
        }

        let mut train_set = dataset.train.clone();
        let mut best_monitored = 0.0;
        let mut patience_counter = 0;

        for epoch in 1..=self.config.epochs {
            let learning_rate = schedule.rate(epoch - 1);
            train_set.shuffle(rng);

            batch_progress.set_position(0);
            batch_progress.set_message(format!("in Epoch {epoch}"));

            let (mut loss_sum, mut trained, mut skipped) = (0.0, 0, 0);
            for (batch_index, batch) in train_set.chunks(self.config.batch_size).enumerate() {
                let summary = self.network.train_batch(batch, learning_rate);
                loss_sum += summary.average_loss * summary.trained as f64;
                trained += summary.trained;
                skipped += summary.skipped;
                debug!(
                    "Epoch {epoch} batch {batch_index}: loss {:.4}, trained {}, skipped {}, max gradient norm {:.4}",
                    summary.average_loss,
                    summary.trained,
                    summary.skipped,
                    summary.max_gradient_norm
                );
                batch_progress.inc(1);
            }

            let loss = if trained > 0 {
                loss_sum / trained as f64
            } else {
                0.0
            };
            let train_accuracy = self.network.evaluate(&dataset.train);
            let test_accuracy = if monitor_train {
                train_accuracy
            } else {
                self.network.evaluate(&dataset.test)
            };

            let improved = self.history.record_epoch(
                epoch,
                EpochMetrics {
                    loss,
                    train_accuracy,
                    test_accuracy,
                    learning_rate,
                },
            );
            match checkpoint {
                Some(path) if improved => self.network.save(path)?,
                _ => {}
            }

            info!(
                "Epoch {epoch}/{}: loss {loss:.4}, train {:.2}%, test {:.2}%, lr {learning_rate:.5}, skipped {skipped}",
                self.config.epochs,
                train_accuracy * 100.0,
                test_accuracy * 100.0
            );
            epoch_progress.set_message(format!(
                "- Loss: {loss:.4}, Train: {:.2}%, Test: {:.2}%",
                train_accuracy * 100.0,
                test_accuracy * 100.0
            ));
            epoch_progress.inc(1);

            if train_accuracy >= self.config.target_train_accuracy
                && test_accuracy >= self.config.target_test_accuracy
            {
                self.history.stopped_early = epoch < self.config.epochs;
                epoch_progress.finish_with_message(format!(
                    "Target accuracy reached at epoch {epoch}"
                ));
                batch_progress.finish_and_clear();
                info!("Target accuracies reached at epoch {epoch}");
                return Ok(&self.history);
            }

            // Early stopping check
            if test_accuracy > best_monitored + self.config.early_stopping_min_delta {
                best_monitored = test_accuracy;
                patience_counter = 0;
            } else {
                patience_counter += 1;
                if patience_counter >= self.config.early_stopping_patience {
                    self.history.stopped_early = true;
                    epoch_progress.finish_with_message(format!(
                        "Early stopping at epoch {epoch} with best accuracy: {:.2}%",
                        best_monitored * 100.0
                    ));
                    batch_progress.finish_and_clear();
                    info!(
                        "No improvement for {patience_counter} epochs; stopping at epoch {epoch}"
                    );
                    return Ok(&self.history);
                }
            }
        }

        epoch_progress.finish_with_message("Training completed!");
        batch_progress.finish_and_clear();

        Ok(&self.history)
    }
}

/// Creates a progress bar style with the specified template.
fn create_progress_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}
