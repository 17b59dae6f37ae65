use crate::error::NetworkError;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Architecture and numerical guards of a fingerprinting network.
///
/// The input and output widths are not part of the configuration; they come
/// from the dataset (`max_len * 2 + 6` features, one output per label) and are
/// passed to [`crate::Network::new`] directly.
///
/// # Example
///
/// ```
/// use neural_network::network_config::NetworkConfigBuilder;
///
/// let config = NetworkConfigBuilder::default()
///     .hidden_layers(vec![32, 16])
///     .seed(7)
///     .build()
///     .unwrap();
/// assert_eq!(config.hidden_layers, vec![32, 16]);
/// assert_eq!(config.gradient_clip_norm, 1.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(default)]
#[serde(default)]
pub struct NetworkConfig {
    /// Widths of the dense hidden layers, each followed by ReLU.
    pub hidden_layers: Vec<usize>,

    /// Optional 1-D convolution placed in front of the dense stack.
    #[builder(setter(strip_option))]
    pub convolution: Option<ConvolutionConfig>,

    /// Cap on the L2 norm of every back-propagated error vector.
    pub gradient_clip_norm: f64,

    /// Samples whose loss exceeds this value are skipped instead of trained on.
    pub loss_ceiling: f64,

    /// Gain of the Gaussian initialization, `std = sqrt(init_gain / fan_in)`.
    pub init_gain: f64,

    /// Seed for weight initialization. `None` draws from the OS.
    #[builder(setter(strip_option))]
    pub seed: Option<u64>,
}

/// Shape of the leading convolution layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvolutionConfig {
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel_size: usize,
    pub stride: usize,
    pub padding: usize,
}

impl Default for ConvolutionConfig {
    fn default() -> Self {
        Self {
            in_channels: 1,
            out_channels: 16,
            kernel_size: 5,
            stride: 2,
            padding: 0,
        }
    }
}

impl NetworkConfig {
    /// Loads a network configuration from a JSON file.
    ///
    /// Missing keys take their default values.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the JSON configuration file
    ///
    /// # Example
    ///
    /// ```no_run
    /// use neural_network::network_config::NetworkConfig;
    /// use std::path::Path;
    ///
    /// let config = NetworkConfig::load(Path::new("network.json")).unwrap();
    /// ```
    pub fn load(path: &Path) -> Result<Self, NetworkError> {
        let config_str = fs::read_to_string(path)?;
        let config: NetworkConfig = serde_json::from_str(&config_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), NetworkError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Rejects configurations no network can be built from.
    pub fn validate(&self) -> Result<(), NetworkError> {
        if self.hidden_layers.contains(&0) {
            return Err(NetworkError::InvalidConfig(
                "hidden layer widths must be positive".to_string(),
            ));
        }
        for (name, value) in [
            ("gradient_clip_norm", self.gradient_clip_norm),
            ("loss_ceiling", self.loss_ceiling),
            ("init_gain", self.init_gain),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(NetworkError::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        if let Some(conv) = &self.convolution {
            if conv.in_channels == 0
                || conv.out_channels == 0
                || conv.kernel_size == 0
                || conv.stride == 0
            {
                return Err(NetworkError::InvalidConfig(
                    "convolution channels, kernel size and stride must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![64],
            convolution: None,
            gradient_clip_norm: 1.0,
            loss_ceiling: 5.0,
            init_gain: 2.0,
            seed: None,
        }
    }
}

impl fmt::Display for NetworkConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Network Configuration:")?;
        if let Some(conv) = &self.convolution {
            writeln!(
                f,
                "  Convolution: {}->{} channels, kernel {}, stride {}, padding {}",
                conv.in_channels, conv.out_channels, conv.kernel_size, conv.stride, conv.padding
            )?;
        }
        writeln!(f, "  Hidden layers: {:?}", self.hidden_layers)?;
        writeln!(f, "  Gradient clip norm: {}", self.gradient_clip_norm)?;
        writeln!(f, "  Loss ceiling: {}", self.loss_ceiling)?;
        writeln!(f, "  Init gain: {}", self.init_gain)?;
        match self.seed {
            Some(seed) => write!(f, "  Seed: {seed}"),
            None => write!(f, "  Seed: random"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_load_config() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("network.json");

        let config_json = r#"{
            "hidden_layers": [128, 32],
            "convolution": { "out_channels": 8, "kernel_size": 3 },
            "loss_ceiling": 4.0,
            "seed": 11
        }"#;

        let mut file = File::create(&config_path).unwrap();
        file.write_all(config_json.as_bytes()).unwrap();

        let config = NetworkConfig::load(&config_path).unwrap();
        assert_eq!(config.hidden_layers, vec![128, 32]);
        let conv = config.convolution.unwrap();
        assert_eq!(conv.out_channels, 8);
        assert_eq!(conv.kernel_size, 3);
        assert_eq!(conv.stride, 2);
        assert_eq!(conv.in_channels, 1);
        assert_eq!(config.loss_ceiling, 4.0);
        assert_eq!(config.gradient_clip_norm, 1.0);
        assert_eq!(config.seed, Some(11));
    }

    #[test]
    fn test_default_config() {
        let config = NetworkConfig::default();
        assert_eq!(config.hidden_layers, vec![64]);
        assert!(config.convolution.is_none());
        assert_eq!(config.gradient_clip_norm, 1.0);
        assert_eq!(config.loss_ceiling, 5.0);
        assert_eq!(config.init_gain, 2.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_keeps_defaults_for_unset_fields() {
        let config = NetworkConfigBuilder::default()
            .convolution(ConvolutionConfig::default())
            .build()
            .unwrap();
        assert_eq!(config.hidden_layers, vec![64]);
        assert_eq!(config.convolution, Some(ConvolutionConfig::default()));
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = NetworkConfig {
            gradient_clip_norm: 0.0,
            ..NetworkConfig::default()
        };
        assert!(config.validate().is_err());

        let config = NetworkConfig {
            hidden_layers: vec![16, 0],
            ..NetworkConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("network.json");
        let config = NetworkConfig {
            seed: Some(3),
            ..NetworkConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(NetworkConfig::load(&path).unwrap(), config);
    }
}
