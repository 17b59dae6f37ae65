//! Session to feature-vector encoding.
//!
//! Layout of an encoded session with `max_len` packet slots:
//!
//! ```text
//! [size_0, dir_0, size_1, dir_1, ..., 0.0, 0.0, mean, max, min, std, outgoing_ratio, log_count]
//!  |<------------- max_len * 2 ------------->|  |<------------- STATISTICS_LEN ------------->|
//! ```
use crate::error::FeatureError;
use crate::packet::{Direction, PacketObservation, parse_packet_features};
use crate::table::SessionRecord;
use log::debug;
use matrix::vector::{mean, population_std_dev};
use neural_network::Sample;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Number of trailing whole-session statistics.
pub const STATISTICS_LEN: usize = 6;
/// Frame size mapped to 1.0 by [`normalize_size`].
pub const MAX_FRAME_SIZE: f64 = 1500.0;
/// Packet count mapped to 1.0 by the `log_count` statistic.
pub const MAX_PACKET_COUNT: f64 = 100.0;

/// `ln(size + 1) / ln(1501)`, clamped to `[0, 1]`.
pub fn normalize_size(size: u32) -> f64 {
    ((f64::from(size) + 1.0).ln() / (MAX_FRAME_SIZE + 1.0).ln()).clamp(0.0, 1.0)
}

/// A session reduced to its valid observations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedSession {
    /// `[normalized size, direction]` per valid packet.
    pub sequence_features: Vec<f64>,
    /// Normalized sizes, in packet order.
    pub packet_sizes: Vec<f64>,
    pub directions: Vec<Direction>,
}

impl EncodedSession {
    pub fn pair_count(&self) -> usize {
        self.sequence_features.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.packet_sizes.is_empty()
    }
}

/// Encodes every valid observation; invalid ones are dropped.
pub fn encode_session(observations: &[PacketObservation]) -> EncodedSession {
    let mut encoded = EncodedSession::default();
    for observation in observations {
        let Some(direction) = observation.direction.filter(|_| observation.size > 0) else {
            continue;
        };
        let size = normalize_size(observation.size);
        encoded.sequence_features.push(size);
        encoded.sequence_features.push(direction.as_feature());
        encoded.packet_sizes.push(size);
        encoded.directions.push(direction);
    }
    encoded
}

/// Appends mean, max, min, population std of `packet_sizes`, the outbound
/// ratio and `ln(count + 1) / ln(101)`.
///
/// Nothing is appended when `packet_sizes` is empty.
pub fn append_statistics(
    sequence_features: &mut Vec<f64>,
    packet_sizes: &[f64],
    directions: &[Direction],
) {
    if packet_sizes.is_empty() {
        return;
    }

    let count = packet_sizes.len() as f64;
    let size_mean = mean(packet_sizes);
    let max = packet_sizes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = packet_sizes.iter().copied().fold(f64::INFINITY, f64::min);
    let outbound = directions
        .iter()
        .filter(|&&d| d == Direction::Outbound)
        .count() as f64;

    sequence_features.extend_from_slice(&[
        size_mean,
        max,
        min,
        population_std_dev(packet_sizes, size_mean),
        outbound / count,
        (count + 1.0).ln() / (MAX_PACKET_COUNT + 1.0).ln(),
    ]);
}

/// Longest session of the corpus, in packet pairs.
pub fn find_max_sequence_length<'a, I>(sessions: I) -> usize
where
    I: IntoIterator<Item = &'a EncodedSession>,
{
    sessions
        .into_iter()
        .map(EncodedSession::pair_count)
        .max()
        .unwrap_or(0)
}

/// Zero-fills the packet-pair portion of `features` up to `max_len` pairs,
/// keeping the trailing statistics block last.
pub fn pad(features: &[f64], max_len: usize) -> Result<Vec<f64>, FeatureError> {
    let sequence_len = features
        .len()
        .checked_sub(STATISTICS_LEN)
        .ok_or(FeatureError::MissingStatistics(features.len()))?;
    if sequence_len > max_len * 2 {
        return Err(FeatureError::SequenceTooLong {
            actual: sequence_len / 2,
            max: max_len,
        });
    }

    let (sequence, statistics) = features.split_at(sequence_len);
    let mut padded = Vec::with_capacity(max_len * 2 + STATISTICS_LEN);
    padded.extend_from_slice(sequence);
    padded.resize(max_len * 2, 0.0);
    padded.extend_from_slice(statistics);
    Ok(padded)
}

/// Frozen encoder parameters, stored next to a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderSettings {
    pub max_sequence_len: usize,
    pub feature_dim: usize,
    pub num_labels: usize,
}

impl EncoderSettings {
    pub fn load(path: &Path) -> Result<Self, FeatureError> {
        let settings_str = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&settings_str)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), FeatureError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Encoder with a fixed number of packet slots.
///
/// Built once from the training corpus and reused unchanged for inference so
/// both encode identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEncoder {
    max_sequence_len: usize,
    num_labels: usize,
}

impl SessionEncoder {
    pub fn new(max_sequence_len: usize, num_labels: usize) -> Self {
        Self {
            max_sequence_len,
            num_labels,
        }
    }

    pub fn from_settings(settings: &EncoderSettings) -> Self {
        Self::new(settings.max_sequence_len, settings.num_labels)
    }

    pub fn max_sequence_len(&self) -> usize {
        self.max_sequence_len
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    pub fn feature_dim(&self) -> usize {
        self.max_sequence_len * 2 + STATISTICS_LEN
    }

    pub fn settings(&self) -> EncoderSettings {
        EncoderSettings {
            max_sequence_len: self.max_sequence_len,
            feature_dim: self.feature_dim(),
            num_labels: self.num_labels,
        }
    }

    /// Encodes an already reduced session.
    ///
    /// Sessions longer than the encoder's slots keep their first
    /// `max_sequence_len` pairs; the statistics still cover every packet.
    pub fn encode_reduced(&self, encoded: EncodedSession) -> Result<Vec<f64>, FeatureError> {
        if encoded.is_empty() {
            return Err(FeatureError::EmptyInput(
                "session has no valid packets".to_string(),
            ));
        }

        let EncodedSession {
            mut sequence_features,
            packet_sizes,
            directions,
        } = encoded;
        if sequence_features.len() > self.max_sequence_len * 2 {
            debug!(
                "Truncating session of {} packets to {}",
                sequence_features.len() / 2,
                self.max_sequence_len
            );
            sequence_features.truncate(self.max_sequence_len * 2);
        }
        append_statistics(&mut sequence_features, &packet_sizes, &directions);
        pad(&sequence_features, self.max_sequence_len)
    }

    pub fn encode(&self, observations: &[PacketObservation]) -> Result<Vec<f64>, FeatureError> {
        self.encode_reduced(encode_session(observations))
    }

    pub fn encode_record(&self, record: &SessionRecord) -> Result<Sample, FeatureError> {
        Ok(Sample::new(record.label, self.encode(&record.packets)?))
    }

    /// Inference entry point: encodes a raw `size_direction` list.
    pub fn encode_packet_string(&self, text: &str) -> Result<Vec<f64>, FeatureError> {
        self.encode(&parse_packet_features(text))
    }
}
