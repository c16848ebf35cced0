//! Common utilities for integration tests

pub mod functions;
pub mod test_helpers;

// Re-export commonly used items
pub use functions::{Gaussian, Oscillator, SlowFunction};
pub use test_helpers::{
    assert_close,
    assert_matrices_close,
    diagonally_dominant,
    random_matrix,
    relative_error,
};
