//! Linear algebra engine
//!
//! Decompositions and the operations built on them. Every factorisation uses
//! pivoting to bound error growth, and every tolerance comes from
//! [`LinalgConfig`].
//!
//! | Operation | Method | Fails with |
//! |-----------|--------|------------|
//! | [`determinant`] | closed form for n ≤ 2, LU otherwise | `Dimension` |
//! | [`inverse`], [`solve`] | LU with partial pivoting | `Dimension`, `SingularMatrix` |
//! | [`QrDecomposition::least_squares`] | Householder QR | `Dimension`, `SingularMatrix` |
//! | [`eigenvalues`] | balanced Hessenberg + shifted QR | `Dimension`, `Convergence` |
//!
//! # Singularity
//!
//! A matrix is treated as singular when its LU factorisation has a pivot
//! `|U_kk| < singular_epsilon · max|U_jj|`. The test is a ratio of pivots, so
//! uniformly scaling a matrix never changes the verdict, and it does not
//! tighten with the dimension the way a bound on `|det|` would.
//!
//! # Example
//!
//! ```rust
//! use numerix::config::LinalgConfig;
//! use numerix::linalg::{determinant, inverse};
//! use numerix::numeric::Matrix;
//!
//! let m = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
//! assert_eq!(determinant(&m).unwrap(), -2.0);
//!
//! let singular = Matrix::from_rows(&[vec![1.0, 2.0], vec![2.0, 4.0]]).unwrap();
//! assert!(inverse(&singular, &LinalgConfig::default()).is_err());
//! ```

mod eigen;
mod lu;
mod qr;

pub use eigen::eigenvalues;
pub use lu::LuDecomposition;
pub use qr::QrDecomposition;

use crate::config::LinalgConfig;
use crate::error::{NumericError, Result};
use crate::numeric::Matrix;

/// Determinant of a square matrix
///
/// 1×1 and 2×2 use closed forms (`a·d - b·c` exactly); larger matrices use
/// `sign · Π diag(U)` from LU. The 0×0 determinant is 1.
pub fn determinant(m: &Matrix) -> Result<f64> {
    m.require_square("determinant")?;
    Ok(match m.rows() {
        0 => 1.0,
        1 => m.get(0, 0),
        2 => m.get(0, 0) * m.get(1, 1) - m.get(0, 1) * m.get(1, 0),
        _ => LuDecomposition::decompose(m)?.det(),
    })
}

/// Factorise and reject numerically singular matrices
fn nonsingular_lu(m: &Matrix, config: &LinalgConfig, operation: &'static str) -> Result<LuDecomposition> {
    config.validate()?;
    m.require_square(operation)?;
    let n = m.rows();
    let lu = LuDecomposition::decompose(m)?;
    let (smallest, largest) = lu.pivot_range();
    let threshold = config.singular_epsilon * largest;

    if lu.has_zero_pivot() || smallest < threshold {
        let det = if n <= 2 { determinant(m)? } else { lu.det() };
        log::debug!("{operation}: {n}x{n} pivot ratio {:e} below {:e}", smallest / largest, config.singular_epsilon);
        return Err(NumericError::SingularMatrix {
            rows: n,
            cols: n,
            determinant: det,
            threshold,
        });
    }
    Ok(lu)
}

/// Inverse of a square matrix
///
/// # Errors
///
/// - `InvalidConfiguration` when `config` fails validation
/// - `Dimension` for non-square input
/// - `SingularMatrix` when the smallest LU pivot is below
///   `singular_epsilon` times the largest
pub fn inverse(m: &Matrix, config: &LinalgConfig) -> Result<Matrix> {
    nonsingular_lu(m, config, "inverse")?.inverse()
}

/// Solve `M·x = b`
///
/// Same singularity rule as [`inverse`].
pub fn solve(m: &Matrix, b: &[f64], config: &LinalgConfig) -> Result<Vec<f64>> {
    nonsingular_lu(m, config, "solve")?.solve(b)
}

// =================================================================================================
// Tests
// =================================================================================================
