use thiserror::Error;

/// Errors raised while reading and encoding sessions
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No input: {0}")]
    EmptyInput(String),
    #[error("No usable samples in the session table")]
    EmptyDataset,
    #[error("Sequence of {actual} packets exceeds the maximum of {max}")]
    SequenceTooLong { actual: usize, max: usize },
    #[error("Feature vector of length {0} has no statistics block")]
    MissingStatistics(usize),
    #[error("Test ratio must be in [0, 1), got {0}")]
    InvalidTestRatio(f64),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
