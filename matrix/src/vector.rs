//! Free functions over plain `f64` slices used by the layers and the training loop.

/// Euclidean length of `v`.
#[must_use]
pub fn l2_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Rescales `v` in place so its L2 norm does not exceed `max_norm`.
///
/// Returns the norm of `v` after clipping. Vectors already within the cap are
/// left untouched.
pub fn clip_l2_norm(v: &mut [f64], max_norm: f64) -> f64 {
    let norm = l2_norm(v);
    if norm > max_norm && norm > 0.0 {
        let scale = max_norm / norm;
        for x in v.iter_mut() {
            *x *= scale;
        }
        return l2_norm(v);
    }
    norm
}

/// Index of the largest entry, or `None` for an empty slice.
///
/// NaN entries compare as equal so they never win over a real maximum.
#[must_use]
pub fn argmax(v: &[f64]) -> Option<usize> {
    v.iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(idx, _)| idx)
}

/// Arithmetic mean, `0.0` for an empty slice.
#[must_use]
pub fn mean(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    v.iter().sum::<f64>() / v.len() as f64
}

/// Population standard deviation around `mean`, `0.0` for an empty slice.
#[must_use]
pub fn population_std_dev(v: &[f64], mean: f64) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    (v.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / v.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_clip_scales_down_long_vectors() {
        let mut v = vec![3.0, 4.0];
        let norm = clip_l2_norm(&mut v, 1.0);
        assert_relative_eq!(norm, 1.0, epsilon = 1e-12);
        assert_relative_eq!(v[0], 0.6, epsilon = 1e-12);
        assert_relative_eq!(v[1], 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_clip_leaves_short_vectors_alone() {
        let mut v = vec![0.3, 0.4];
        let norm = clip_l2_norm(&mut v, 1.0);
        assert_relative_eq!(norm, 0.5, epsilon = 1e-12);
        assert_eq!(v, vec![0.3, 0.4]);
    }

    #[test]
    fn test_clip_zero_vector() {
        let mut v = vec![0.0; 4];
        assert_eq!(clip_l2_norm(&mut v, 1.0), 0.0);
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_mean_and_std_dev() {
        let v = [1.0, 2.0, 3.0, 4.0];
        let m = mean(&v);
        assert_relative_eq!(m, 2.5);
        assert_relative_eq!(population_std_dev(&v, m), 1.118033988749895, epsilon = 1e-12);
        assert_eq!(mean(&[]), 0.0);
    }
}
