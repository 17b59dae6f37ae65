use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

/// Dense row-major matrix of `f64` values.
///
/// Layers store their weights as `rows = output size`, `cols = input size`, so
/// `mul_vector` is the forward transform and `transpose_mul_vector` carries a
/// gradient back to the input side.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Matrix {
    pub(crate) rows: usize,
    pub(crate) cols: usize,
    pub(crate) data: Vec<f64>,
}

impl Matrix {
    #[must_use]
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        assert_eq!(
            data.len(),
            rows * cols,
            "Data length must match rows * cols"
        );
        Self { rows, cols, data }
    }

    #[inline(always)]
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline(always)]
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline(always)]
    #[must_use]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    #[inline(always)]
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    #[must_use]
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; cols * rows],
        }
    }

    /// Samples every entry from a zero-mean Gaussian with the given standard deviation.
    #[must_use]
    pub fn random_normal<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        std_dev: f64,
        rng: &mut R,
    ) -> Self {
        let data = (0..rows * cols)
            .map(|_| {
                let z: f64 = StandardNormal.sample(&mut *rng);
                z * std_dev
            })
            .collect();

        Self { rows, cols, data }
    }

    /// Computes `self · v` for a column vector `v` of length `cols`.
    #[must_use]
    pub fn mul_vector(&self, v: &[f64]) -> Vec<f64> {
        assert_eq!(
            self.cols,
            v.len(),
            "Invalid vector length for multiplication"
        );

        self.data
            .chunks_exact(self.cols.max(1))
            .take(self.rows)
            .map(|row| row.iter().zip(v).map(|(&w, &x)| w * x).sum())
            .collect()
    }

    /// Computes `selfᵗ · v` for a column vector `v` of length `rows` without
    /// materializing the transpose.
    #[must_use]
    pub fn transpose_mul_vector(&self, v: &[f64]) -> Vec<f64> {
        assert_eq!(
            self.rows,
            v.len(),
            "Invalid vector length for transposed multiplication"
        );

        let mut result = vec![0.0; self.cols];
        for (row, &g) in self.data.chunks_exact(self.cols.max(1)).zip(v) {
            for (out, &w) in result.iter_mut().zip(row) {
                *out += w * g;
            }
        }
        result
    }

    /// Outer product `a ⊗ b`, shaped `a.len() × b.len()`.
    #[must_use]
    pub fn outer(a: &[f64], b: &[f64]) -> Self {
        let data = a
            .iter()
            .flat_map(|&x| b.iter().map(move |&y| x * y))
            .collect();

        Self {
            rows: a.len(),
            cols: b.len(),
            data,
        }
    }

    /// In-place `self -= scale * other`.
    pub fn scaled_subtract_assign(&mut self, other: &Matrix, scale: f64) {
        assert_eq!(self.rows, other.rows, "Matrix rows must match");
        assert_eq!(self.cols, other.cols, "Matrix columns must match");

        for (a, &b) in self.data.iter_mut().zip(other.data.iter()) {
            *a -= scale * b;
        }
    }

    /// Returns true when every entry is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }
}
