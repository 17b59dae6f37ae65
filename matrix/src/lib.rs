pub mod matrix;
pub mod vector;

pub use crate::matrix::Matrix;
