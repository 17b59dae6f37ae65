// Modules
pub mod activations;
pub mod error;
pub mod layer;
pub mod network;
pub mod network_config;
mod persistence;
pub mod sample;

pub use error::NetworkError;
pub use layer::Layer;
pub use matrix::Matrix;
pub use network::{BatchSummary, Evaluation, Network, Prediction, SampleFailure};
pub use network_config::{ConvolutionConfig, NetworkConfig, NetworkConfigBuilder};
pub use sample::Sample;
