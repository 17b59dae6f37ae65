//! Binary model files.
//!
//! Layout, all little-endian:
//!
//! ```text
//! u32 input_dim
//! u32 num_labels
//! per layer, in order:
//!     u32 rows, u32 cols
//!     rows * cols f64 weights (row-major)
//!     rows f64 biases
//! ```
//!
//! Convolution kernels are stored the same way as dense weights.
use crate::error::NetworkError;
use crate::network::Network;
use crate::network_config::NetworkConfig;
use log::{info, warn};
use matrix::matrix::Matrix;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use thiserror::Error;

/// Why a model file could not be applied to a network.
#[derive(Debug, Error)]
enum RestoreError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error(
        "header describes {found_input}x{found_labels}, expected {expected_input}x{expected_labels}"
    )]
    Header {
        found_input: usize,
        found_labels: usize,
        expected_input: usize,
        expected_labels: usize,
    },
    #[error("layer {index} is {found_rows}x{found_cols}, expected {expected_rows}x{expected_cols}")]
    LayerShape {
        index: usize,
        found_rows: usize,
        found_cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },
    #[error("layer {0} contains non-finite parameters")]
    NonFinite(usize),
    #[error("{0} unexpected trailing bytes")]
    TrailingData(usize),
    #[error("{0}")]
    Layer(#[from] NetworkError),
}

fn write_u32<W: Write>(writer: &mut W, value: usize) -> Result<(), NetworkError> {
    let value = u32::try_from(value).map_err(|_| {
        NetworkError::InvalidConfig(format!("dimension {value} does not fit the model format"))
    })?;
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<usize> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf) as usize)
}

fn read_f64s<R: Read>(reader: &mut R, count: usize) -> io::Result<Vec<f64>> {
    let mut buf = [0u8; 8];
    (0..count)
        .map(|_| {
            reader.read_exact(&mut buf)?;
            Ok(f64::from_le_bytes(buf))
        })
        .collect()
}

impl Network {
    /// Writes every layer's parameters to `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), NetworkError> {
        write_u32(writer, self.input_dim())?;
        write_u32(writer, self.num_labels())?;
        for layer in self.layers() {
            let weights = layer.weights();
            write_u32(writer, weights.rows())?;
            write_u32(writer, weights.cols())?;
            for value in weights.data().iter().chain(layer.biases()) {
                writer.write_all(&value.to_le_bytes())?;
            }
        }
        Ok(())
    }

    /// Saves the model to `path`, replacing any existing file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), NetworkError> {
        let path = path.as_ref();
        let capacity = 8 + self.parameter_count() * 8 + self.layers().len() * 8;
        let mut bytes = Vec::with_capacity(capacity);
        self.write_to(&mut bytes)?;
        fs::write(path, bytes)?;
        info!("Saved model to {}", path.display());
        Ok(())
    }

    /// Replaces the parameters with the ones in `bytes`.
    ///
    /// Every layer is parsed and checked before any is applied, so a failed
    /// restore leaves the network unchanged.
    fn restore(&mut self, mut bytes: &[u8]) -> Result<(), RestoreError> {
        let reader = &mut bytes;
        let (found_input, found_labels) = (read_u32(reader)?, read_u32(reader)?);
        if found_input != self.input_dim() || found_labels != self.num_labels() {
            return Err(RestoreError::Header {
                found_input,
                found_labels,
                expected_input: self.input_dim(),
                expected_labels: self.num_labels(),
            });
        }

        let mut parameters = Vec::with_capacity(self.layers().len());
        for (index, layer) in self.layers().iter().enumerate() {
            let expected = layer.weights();
            let (rows, cols) = (read_u32(reader)?, read_u32(reader)?);
            if rows != expected.rows() || cols != expected.cols() {
                return Err(RestoreError::LayerShape {
                    index,
                    found_rows: rows,
                    found_cols: cols,
                    expected_rows: expected.rows(),
                    expected_cols: expected.cols(),
                });
            }
            let weights = Matrix::new(rows, cols, read_f64s(reader, rows * cols)?);
            let biases = read_f64s(reader, rows)?;
            if !weights.is_finite() || biases.iter().any(|b| !b.is_finite()) {
                return Err(RestoreError::NonFinite(index));
            }
            parameters.push((weights, biases));
        }
        if !reader.is_empty() {
            return Err(RestoreError::TrailingData(reader.len()));
        }

        for (layer, (weights, biases)) in self.layers_mut().iter_mut().zip(parameters) {
            layer.set_parameters(weights, biases)?;
        }
        Ok(())
    }

    /// Builds a network for the given shape and fills it from the model file at `path`.
    ///
    /// A missing, unreadable, truncated or mismatched file is not an error: a
    /// warning is logged and the freshly initialized network is returned.
    ///
    /// # Errors
    ///
    /// Only fails when no network can be built from `config` and the dimensions.
    pub fn load<P: AsRef<Path>>(
        path: P,
        expected_input_dim: usize,
        expected_num_labels: usize,
        config: &NetworkConfig,
    ) -> Result<Self, NetworkError> {
        let path = path.as_ref();
        let mut network = Network::new(expected_input_dim, expected_num_labels, config)?;

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    "Model file {} not found; starting from a freshly initialized model",
                    path.display()
                );
                return Ok(network);
            }
            Err(e) => {
                warn!(
                    "Could not read model file {}: {e}; starting from a freshly initialized model",
                    path.display()
                );
                return Ok(network);
            }
        };

        match network.restore(&bytes) {
            Ok(()) => info!("Loaded model from {}", path.display()),
            Err(e) => warn!(
                "Ignoring model file {}: {e}; starting from a freshly initialized model",
                path.display()
            ),
        }
        Ok(network)
    }
}
