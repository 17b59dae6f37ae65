use crate::balance::balance_classes;
use crate::encoder::{SessionEncoder, encode_session, find_max_sequence_length};
use crate::error::FeatureError;
use crate::table::SessionRecord;
use log::{info, warn};
use neural_network::Sample;
use rand::Rng;
use rand::seq::SliceRandom;

pub const DEFAULT_TEST_RATIO: f64 = 0.2;

/// Train and test partitions of one balanced, padded corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub train: Vec<Sample>,
    pub test: Vec<Sample>,
    pub feature_dim: usize,
    pub num_labels: usize,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.train.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.train.is_empty() && self.test.is_empty()
    }
}

/// Shuffles `samples` and moves the last `floor(n * test_ratio)` into the test set.
///
/// The split is positional, not stratified by label, so a small test set can
/// be unbalanced.
pub fn shuffle_and_split<R: Rng + ?Sized>(
    mut samples: Vec<Sample>,
    test_ratio: f64,
    rng: &mut R,
) -> Result<(Vec<Sample>, Vec<Sample>), FeatureError> {
    if !(0.0..1.0).contains(&test_ratio) {
        return Err(FeatureError::InvalidTestRatio(test_ratio));
    }
    samples.shuffle(rng);
    let test_size = (samples.len() as f64 * test_ratio).floor() as usize;
    let test = samples.split_off(samples.len() - test_size);
    Ok((samples, test))
}

/// Builds a [`Dataset`] and its frozen [`SessionEncoder`] from session records.
///
/// # Example
///
/// ```
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
/// use session_features::{DatasetBuilder, parse_session_table};
///
/// let table = "site_label,packet_features\n\
///              0,387_0;1492_1\n1,517_0\n0,90_0;1400_1;1400_1\n1,600_0;700_1\n";
/// let records = parse_session_table(table.as_bytes()).unwrap();
///
/// let mut rng = StdRng::seed_from_u64(0);
/// let (dataset, encoder) = DatasetBuilder::new()
///     .test_ratio(0.25)
///     .build(&records, &mut rng)
///     .unwrap();
/// assert_eq!(encoder.max_sequence_len(), 3);
/// assert_eq!(dataset.feature_dim, 12);
/// assert_eq!(dataset.test.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    test_ratio: f64,
    balance: bool,
    num_labels: Option<usize>,
}

impl Default for DatasetBuilder {
    fn default() -> Self {
        Self {
            test_ratio: DEFAULT_TEST_RATIO,
            balance: true,
            num_labels: None,
        }
    }
}

impl DatasetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn test_ratio(mut self, test_ratio: f64) -> Self {
        self.test_ratio = test_ratio;
        self
    }

    /// Disables oversampling of minority labels.
    pub fn balance(mut self, balance: bool) -> Self {
        self.balance = balance;
        self
    }

    /// Minimum label count, e.g. the size of a label registry. The count grows
    /// to cover every label present in the records.
    pub fn num_labels(mut self, num_labels: usize) -> Self {
        self.num_labels = Some(num_labels);
        self
    }

    pub fn build<R: Rng + ?Sized>(
        &self,
        records: &[SessionRecord],
        rng: &mut R,
    ) -> Result<(Dataset, SessionEncoder), FeatureError> {
        if !(0.0..1.0).contains(&self.test_ratio) {
            return Err(FeatureError::InvalidTestRatio(self.test_ratio));
        }

        let mut sessions = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let encoded = encode_session(&record.packets);
            if encoded.is_empty() {
                warn!(
                    "Skipping record {index} (label {}): no valid packets",
                    record.label
                );
                continue;
            }
            sessions.push((record.label, encoded));
        }
        if sessions.is_empty() {
            return Err(FeatureError::EmptyDataset);
        }

        let max_len = find_max_sequence_length(sessions.iter().map(|(_, encoded)| encoded));
        let max_label = sessions.iter().map(|(label, _)| *label).max().unwrap_or(0);
        let num_labels = self.num_labels.unwrap_or(0).max(max_label + 1);
        let encoder = SessionEncoder::new(max_len, num_labels);
        info!(
            "Encoding {} sessions: max length {max_len} packets, feature dimension {}",
            sessions.len(),
            encoder.feature_dim()
        );

        let samples = sessions
            .into_iter()
            .map(|(label, encoded)| Ok(Sample::new(label, encoder.encode_reduced(encoded)?)))
            .collect::<Result<Vec<_>, FeatureError>>()?;

        let samples = if self.balance {
            balance_classes(samples, rng)
        } else {
            samples
        };
        let (train, test) = shuffle_and_split(samples, self.test_ratio, rng)?;
        info!(
            "Split data into {} training samples and {} test samples",
            train.len(),
            test.len()
        );

        Ok((
            Dataset {
                train,
                test,
                feature_dim: encoder.feature_dim(),
                num_labels,
            },
            encoder,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::STATISTICS_LEN;
    use crate::packet::parse_packet_features;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn record(label: usize, packets: &str) -> SessionRecord {
        SessionRecord {
            label,
            packets: parse_packet_features(packets),
        }
    }

    fn numbered(n: usize) -> Vec<Sample> {
        (0..n).map(|i| Sample::new(i % 3, vec![i as f64])).collect()
    }

    #[test]
    fn test_split_sizes_and_partition() {
        let mut rng = StdRng::seed_from_u64(4);
        let (train, test) = shuffle_and_split(numbered(23), 0.2, &mut rng).unwrap();
        assert_eq!(test.len(), 4);
        assert_eq!(train.len(), 19);

        let mut ids: Vec<usize> = train
            .iter()
            .chain(&test)
            .map(|s| s.features[0] as usize)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..23).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_reproducible_with_seed() {
        let a = shuffle_and_split(numbered(10), 0.3, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = shuffle_and_split(numbered(10), 0.3, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_split_rejects_bad_ratio() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            shuffle_and_split(numbered(5), 1.0, &mut rng),
            Err(FeatureError::InvalidTestRatio(_))
        ));
        assert!(shuffle_and_split(numbered(5), -0.1, &mut rng).is_err());
        let (train, test) = shuffle_and_split(numbered(5), 0.0, &mut rng).unwrap();
        assert_eq!((train.len(), test.len()), (5, 0));
    }

    #[test]
    fn test_build_pads_balances_and_splits() {
        let records = vec![
            record(0, "387_0;1492_1;1000_1;198_0"),
            record(0, "400_0;1492_1"),
            record(0, "380_0;1400_1;900_1"),
            record(1, "517_0;1492_1;1492_1;1492_1;60_0"),
            record(2, "0_0;bogus"),
            record(2, "90_0"),
        ];
        let mut rng = StdRng::seed_from_u64(21);
        let (dataset, encoder) = DatasetBuilder::new()
            .test_ratio(0.2)
            .build(&records, &mut rng)
            .unwrap();

        assert_eq!(encoder.max_sequence_len(), 5);
        assert_eq!(dataset.feature_dim, 5 * 2 + STATISTICS_LEN);
        assert_eq!(dataset.num_labels, 3);
        // 3 labels oversampled to 3 samples each
        assert_eq!(dataset.len(), 9);
        assert_eq!(dataset.test.len(), 1);

        let all: Vec<&Sample> = dataset.train.iter().chain(&dataset.test).collect();
        assert!(all.iter().all(|s| s.features.len() == dataset.feature_dim));
        for label in 0..3 {
            assert_eq!(all.iter().filter(|s| s.label == label).count(), 3);
        }
    }

    #[test]
    fn test_build_without_usable_sessions_fails() {
        let records = vec![record(0, "0_0"), record(1, "abc;12_9")];
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            DatasetBuilder::new().build(&records, &mut rng),
            Err(FeatureError::EmptyDataset)
        ));
    }

    #[test]
    fn test_build_respects_registry_label_count() {
        let records = vec![record(0, "100_0"), record(1, "200_1")];
        let mut rng = StdRng::seed_from_u64(0);
        let (dataset, encoder) = DatasetBuilder::new()
            .num_labels(5)
            .balance(false)
            .build(&records, &mut rng)
            .unwrap();
        assert_eq!(dataset.num_labels, 5);
        assert_eq!(encoder.num_labels(), 5);
        assert_eq!(dataset.len(), 2);
    }
}
