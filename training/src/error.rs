use neural_network::NetworkError;
use thiserror::Error;

/// Errors that stop a training run
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("Training set is empty")]
    EmptyTrainingSet,
    #[error("Batch size must be positive")]
    InvalidBatchSize,
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
