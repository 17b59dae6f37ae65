use thiserror::Error;

/// Errors raised by the network engine.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Invalid number of inputs: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Input feature {index} is not finite ({value})")]
    NonFiniteInput { index: usize, value: f64 },
    #[error("Label {label} is out of range for {num_labels} labels")]
    InvalidLabel { label: usize, num_labels: usize },
    #[error("Invalid network configuration: {0}")]
    InvalidConfig(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
