use log::warn;
use serde::{Deserialize, Serialize};

/// Which side sent a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Client to server.
    Outbound,
    /// Server to client.
    Inbound,
}

impl Direction {
    /// Maps the capture tool's handshake role (`0` client, `1` server).
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Direction::Outbound),
            1 => Some(Direction::Inbound),
            _ => None,
        }
    }

    pub fn as_feature(self) -> f64 {
        match self {
            Direction::Outbound => 0.0,
            Direction::Inbound => 1.0,
        }
    }
}

/// One observed frame of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketObservation {
    pub size: u32,
    pub direction: Option<Direction>,
}

impl PacketObservation {
    pub fn new(size: u32, direction: Direction) -> Self {
        Self {
            size,
            direction: Some(direction),
        }
    }

    /// Observations with a zero size or unknown direction carry no signal.
    pub fn is_valid(&self) -> bool {
        self.size > 0 && self.direction.is_some()
    }
}

/// Parses a `size_direction` list such as `"387_0;1492_1;1000_1"`.
///
/// Tokens that are not two integers joined by `_` are skipped with a warning.
/// A direction code other than `0` or `1` is kept with `direction = None`.
pub fn parse_packet_features(text: &str) -> Vec<PacketObservation> {
    text.split(';')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            let parsed = token.split_once('_').and_then(|(size, direction)| {
                let size = size.trim().parse::<u32>().ok()?;
                let direction = direction.trim().parse::<u8>().ok()?;
                Some(PacketObservation {
                    size,
                    direction: Direction::from_code(direction),
                })
            });
            if parsed.is_none() {
                warn!("Skipping malformed packet token {token:?}");
            }
            parsed
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_packet_features() {
        let packets = parse_packet_features("387_0;1492_1;1000_1;198_0");
        assert_eq!(
            packets,
            vec![
                PacketObservation::new(387, Direction::Outbound),
                PacketObservation::new(1492, Direction::Inbound),
                PacketObservation::new(1000, Direction::Inbound),
                PacketObservation::new(198, Direction::Outbound),
            ]
        );
    }

    #[test]
    fn test_parse_skips_malformed_tokens() {
        let packets = parse_packet_features("387_0;garbage;12;_1;99_x;  55_1 ;");
        assert_eq!(
            packets,
            vec![
                PacketObservation::new(387, Direction::Outbound),
                PacketObservation::new(55, Direction::Inbound),
            ]
        );
    }

    #[test]
    fn test_unknown_direction_is_invalid() {
        let packets = parse_packet_features("100_2;0_1");
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].direction, None);
        assert!(!packets[0].is_valid());
        assert!(!packets[1].is_valid());
    }

    #[test]
    fn test_empty_string() {
        assert!(parse_packet_features("").is_empty());
    }
}
