//! Turns per-session packet metadata into fixed-length feature vectors.
//!
//! A session is the ordered list of `(frame size, direction)` observations of one
//! encrypted connection. [`SessionEncoder`] maps it to
//! `max_len * 2 + 6` features: one `[normalized size, direction]` pair per
//! packet, zero padding, then six whole-session statistics.
pub mod balance;
pub mod dataset;
pub mod encoder;
pub mod error;
pub mod labels;
pub mod packet;
pub mod table;

pub use balance::balance_classes;
pub use dataset::{Dataset, DatasetBuilder, shuffle_and_split};
pub use encoder::{
    EncodedSession, EncoderSettings, STATISTICS_LEN, SessionEncoder, append_statistics,
    encode_session, find_max_sequence_length, normalize_size, pad,
};
pub use error::FeatureError;
pub use labels::LabelRegistry;
pub use neural_network::Sample;
pub use packet::{Direction, PacketObservation, parse_packet_features};
pub use table::{SessionRecord, parse_session_table, read_session_table};
