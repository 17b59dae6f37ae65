use serde::{Deserialize, Serialize};

/// One labelled feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub label: usize,
    pub features: Vec<f64>,
}

impl Sample {
    pub fn new(label: usize, features: Vec<f64>) -> Self {
        Self { label, features }
    }
}
