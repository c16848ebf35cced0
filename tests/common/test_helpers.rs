//! Helper functions for integration tests

use numerix::numeric::Matrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Assert that two scalars agree within `tolerance`
pub fn assert_close(actual: f64, expected: f64, tolerance: f64, message: &str) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= tolerance,
        "{}: {} differs from {} by {} (tolerance {})",
        message, actual, expected, diff, tolerance
    );
}

/// Assert that two matrices have the same shape and agree element-wise
pub fn assert_matrices_close(actual: &Matrix, expected: &Matrix, tolerance: f64, message: &str) {
    assert_eq!(actual.shape(), expected.shape(), "{}: Dimension mismatch", message);

    for i in 0..actual.rows() {
        for j in 0..actual.cols() {
            let diff = (actual.get(i, j) - expected.get(i, j)).abs();
            assert!(
                diff < tolerance,
                "{}: Element ({}, {}) differs by {} (tolerance {})",
                message, i, j, diff, tolerance
            );
        }
    }
}

/// `rows × cols` matrix with entries uniform in `[-1, 1)`
pub fn random_matrix(rows: usize, cols: usize, seed: u64) -> Matrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..rows * cols).map(|_| rng.gen_range(-1.0..1.0)).collect();
    Matrix::new(rows, cols, data).unwrap()
}

/// Random square matrix made strictly diagonally dominant, hence invertible
pub fn diagonally_dominant(n: usize, seed: u64) -> Matrix {
    let mut m = random_matrix(n, n, seed);
    for i in 0..n {
        let off: f64 = (0..n).filter(|&j| j != i).map(|j| m.get(i, j).abs()).sum();
        m.set(i, i, off + 1.0);
    }
    m
}

/// Compute relative error: |actual - expected| / |expected|
pub fn relative_error(actual: f64, expected: f64) -> f64 {
    if expected.abs() < 1e-10 {
        (actual - expected).abs()
    } else {
        (actual - expected).abs() / expected.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_error() {
        assert!((relative_error(1.0, 1.0) - 0.0).abs() < 1e-10);
        assert!((relative_error(1.1, 1.0) - 0.1).abs() < 1e-10);
        assert!((relative_error(0.9, 1.0) - 0.1).abs() < 1e-10);
    }
}
