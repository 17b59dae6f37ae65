use crate::encoder::STATISTICS_LEN;
use log::info;
use neural_network::Sample;
use rand::Rng;
use rand::seq::IndexedRandom;
use rand_distr::{Distribution, Normal};
use std::collections::BTreeMap;

/// Standard deviation of the noise added to oversampled packet sizes.
pub const SIZE_NOISE_STD_DEV: f64 = 0.02;

/// Oversamples every label up to the size of the largest one.
///
/// Missing samples are clones drawn with replacement from the same label.
/// Each clone gets independent `N(0, 0.02)` noise on the packet-size slots of
/// its packet-pair portion, clamped to `[0, 1]`. Direction slots, zero padding
/// and the statistics block are copied unchanged.
pub fn balance_classes<R: Rng + ?Sized>(samples: Vec<Sample>, rng: &mut R) -> Vec<Sample> {
    let mut groups: BTreeMap<usize, Vec<Sample>> = BTreeMap::new();
    for sample in samples {
        groups.entry(sample.label).or_default().push(sample);
    }
    let max_count = groups.values().map(Vec::len).max().unwrap_or(0);

    let Ok(noise) = Normal::new(0.0, SIZE_NOISE_STD_DEV) else {
        return groups.into_values().flatten().collect();
    };

    let mut balanced = Vec::with_capacity(max_count * groups.len());
    for (label, mut group) in groups {
        let missing = max_count - group.len();
        if missing > 0 {
            info!(
                "Oversampling label {label}: {} -> {max_count} samples",
                group.len()
            );
        }
        let mut clones = Vec::with_capacity(missing);
        for _ in 0..missing {
            if let Some(mut clone) = group.choose(&mut *rng).cloned() {
                perturb_sizes(&mut clone.features, &noise, rng);
                clones.push(clone);
            }
        }
        group.extend(clones);
        balanced.extend(group);
    }
    balanced
}

fn perturb_sizes<R: Rng + ?Sized>(features: &mut [f64], noise: &Normal<f64>, rng: &mut R) {
    let sequence_len = features.len().saturating_sub(STATISTICS_LEN);
    for size in features[..sequence_len].iter_mut().step_by(2) {
        // Real packets never normalize to 0.0, so zeros are padding.
        if *size > 0.0 {
            *size = (*size + noise.sample(&mut *rng)).clamp(0.0, 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Two packet slots (one used, one padding) plus statistics.
    fn sample(label: usize, size: f64) -> Sample {
        Sample::new(
            label,
            vec![size, 1.0, 0.0, 0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6],
        )
    }

    #[test]
    fn test_every_label_reaches_max_count() {
        let samples = vec![
            sample(0, 0.5),
            sample(0, 0.6),
            sample(0, 0.7),
            sample(0, 0.8),
            sample(1, 0.3),
            sample(2, 0.9),
            sample(2, 0.4),
        ];
        let mut rng = StdRng::seed_from_u64(17);
        let balanced = balance_classes(samples, &mut rng);

        assert_eq!(balanced.len(), 12);
        for label in 0..3 {
            assert_eq!(balanced.iter().filter(|s| s.label == label).count(), 4);
        }
    }

    #[test]
    fn test_clones_only_perturb_packet_sizes() {
        let samples = vec![sample(0, 0.5), sample(0, 0.6), sample(0, 0.7), sample(1, 0.3)];
        let mut rng = StdRng::seed_from_u64(3);
        let balanced = balance_classes(samples, &mut rng);

        let clones: Vec<&Sample> = balanced.iter().filter(|s| s.label == 1).collect();
        assert_eq!(clones.len(), 3);
        for clone in &clones {
            assert_eq!(clone.features.len(), 10);
            assert!((0.0..=1.0).contains(&clone.features[0]));
            assert!((clone.features[0] - 0.3).abs() < 0.2);
            assert_eq!(clone.features[1], 1.0);
            assert_eq!(&clone.features[2..4], &[0.0, 0.0]);
            assert_eq!(&clone.features[4..], &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        }
        // The original is kept as is.
        assert_eq!(clones[0].features[0], 0.3);
        assert!(clones[1..].iter().any(|c| c.features[0] != 0.3));
    }

    #[test]
    fn test_noise_is_clamped() {
        let samples = vec![sample(0, 1.0), sample(0, 1.0), sample(1, 1.0)];
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..20 {
            let balanced = balance_classes(samples.clone(), &mut rng);
            assert!(balanced.iter().all(|s| s.features[0] <= 1.0));
        }
    }

    #[test]
    fn test_balanced_input_is_unchanged() {
        let samples = vec![sample(0, 0.5), sample(1, 0.6)];
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(balance_classes(samples.clone(), &mut rng), samples);
    }
}
