mod error;
mod training;
mod training_config;
mod training_history;

pub use error::TrainingError;
pub use training::Trainer;
pub use training_config::{LearningRateSchedule, TrainingConfig};
pub use training_history::{EpochMetrics, TrainingHistory};

pub mod prelude {
    pub use crate::Trainer;
    pub use crate::TrainingConfig;
    pub use crate::TrainingError;
    pub use crate::TrainingHistory;
}
