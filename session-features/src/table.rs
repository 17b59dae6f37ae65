//! Reader for the session table written by the capture tooling.
//!
//! ```text
//! site_label,packet_features
//! 0,387_0;1492_1;1000_1;198_0
//! 1,517_0;1492_1
//! ```
use crate::error::FeatureError;
use crate::packet::{PacketObservation, parse_packet_features};
use log::{info, warn};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One row of the session table.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub label: usize,
    pub packets: Vec<PacketObservation>,
}

/// Parses a session table; the first line is a header and is skipped.
///
/// Rows with fewer than two fields, a non-numeric label or invalid UTF-8 are
/// skipped with a warning. Blank lines are ignored.
pub fn parse_session_table<R: Read>(reader: R) -> Result<Vec<SessionRecord>, FeatureError> {
    let mut table = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for row in table.records() {
        let row = match row {
            Ok(row) => row,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                warn!("Skipping malformed row: {e}");
                continue;
            }
        };
        let line = row.position().map_or(0, |p| p.line());

        let (Some(label), Some(packets)) = (row.get(0), row.get(1)) else {
            warn!("Skipping line {line}: expected site_label,packet_features");
            continue;
        };
        let Ok(label) = label.parse::<usize>() else {
            warn!("Skipping line {line}: invalid label {label:?}");
            continue;
        };
        records.push(SessionRecord {
            label,
            packets: parse_packet_features(packets),
        });
    }
    Ok(records)
}

/// Reads the session table at `path`.
///
/// # Errors
///
/// Fails when the file cannot be read or holds no records.
pub fn read_session_table(path: &Path) -> Result<Vec<SessionRecord>, FeatureError> {
    let file = File::open(path)?;
    let records = parse_session_table(file)?;
    if records.is_empty() {
        return Err(FeatureError::EmptyInput(format!(
            "{} contains no session records",
            path.display()
        )));
    }
    info!("Read {} session records from {}", records.len(), path.display());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Direction;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;

    #[test]
    fn test_parse_skips_header_and_malformed_lines() {
        let table = "site_label,packet_features\n\
                     0,387_0;1492_1\n\
                     no comma here\n\
                     x,100_0\n\
                     \n\
                     2,\"55_1\"\n";
        let records = parse_session_table(table.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].label, 0);
        assert_eq!(records[0].packets.len(), 2);
        assert_eq!(records[1].label, 2);
        assert_eq!(
            records[1].packets,
            vec![PacketObservation::new(55, Direction::Inbound)]
        );
    }

    #[test]
    fn test_parse_quoted_fields() {
        let table = "site_label,packet_features\n\
                     \"0\",\"387_0;1492_1\"\n\
                     1,\"517_0;60_1\"\n";
        let records = parse_session_table(table.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].label, 0);
        assert_eq!(
            records[0].packets,
            vec![
                PacketObservation::new(387, Direction::Outbound),
                PacketObservation::new(1492, Direction::Inbound),
            ]
        );
        assert_eq!(records[1].label, 1);
        assert_eq!(records[1].packets.len(), 2);
    }

    #[test]
    fn test_read_session_table() {
        let temp = TempDir::new().unwrap();
        let file = temp.child("sessions.csv");
        file.write_str("site_label,packet_features\n1,100_0;200_1\n").unwrap();

        let records = read_session_table(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label, 1);
    }

    #[test]
    fn test_header_only_table_is_fatal() {
        let temp = TempDir::new().unwrap();
        let file = temp.child("sessions.csv");
        file.write_str("site_label,packet_features\n").unwrap();

        assert!(matches!(
            read_session_table(file.path()),
            Err(FeatureError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_missing_table_is_io_error() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            read_session_table(&temp.path().join("absent.csv")),
            Err(FeatureError::Io(_))
        ));
    }
}
