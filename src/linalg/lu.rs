//! LU decomposition with partial pivoting
//!
//! Factorises a square `A` as `PA = LU`:
//! - `P` permutation, stored as a pivot index vector
//! - `L` unit lower triangular
//! - `U` upper triangular
//!
//! `L` and `U` share one packed buffer (the unit diagonal of `L` is
//! implicit). A zero pivot does not abort the factorisation: elimination of
//! that column is skipped, so `det()` reports an exact 0 and the singularity
//! decision is left to the caller ([`super::inverse`], [`super::solve`]).

use crate::error::{NumericError, Result};
use crate::numeric::Matrix;

/// Packed `PA = LU` factorisation
#[derive(Debug, Clone)]
pub struct LuDecomposition {
    /// Strict lower triangle holds `L`, upper triangle (with diagonal) `U`.
    lu: Vec<f64>,
    /// Row `i` of `PA` is row `pivots[i]` of `A`.
    pivots: Vec<usize>,
    n: usize,
    /// Permutation parity, `+1.0` or `-1.0`.
    sign: f64,
}

impl LuDecomposition {
    /// Factorise a copy of `a`
    ///
    /// ```rust
    /// use numerix::linalg::LuDecomposition;
    /// use numerix::numeric::Matrix;
    ///
    /// let a = Matrix::from_rows(&[vec![2.0, 1.0], vec![1.0, 4.0]]).unwrap();
    /// let lu = LuDecomposition::decompose(&a).unwrap();
    /// assert!((lu.det() - 7.0).abs() < 1e-12);
    /// ```
    ///
    /// # Errors
    ///
    /// `Dimension` when `a` is not square.
    pub fn decompose(a: &Matrix) -> Result<Self> {
        a.require_square("LuDecomposition::decompose")?;
        Self::factorise(a.rows(), a.as_slice().to_vec())
    }

    /// Factorise `a`, reusing its storage
    ///
    /// Takes the matrix by value: the buffer is overwritten with the packed
    /// factors, and no other owner can observe it mid-factorisation.
    pub fn decompose_in_place(a: Matrix) -> Result<Self> {
        a.require_square("LuDecomposition::decompose_in_place")?;
        let n = a.rows();
        Self::factorise(n, a.into_vec())
    }

    fn factorise(n: usize, mut lu: Vec<f64>) -> Result<Self> {
        let mut pivots: Vec<usize> = (0..n).collect();
        let mut sign = 1.0;

        for k in 0..n {
            let mut max_val = lu[k * n + k].abs();
            let mut max_row = k;
            for i in (k + 1)..n {
                let val = lu[i * n + k].abs();
                if val > max_val {
                    max_val = val;
                    max_row = i;
                }
            }

            if max_row != k {
                for j in 0..n {
                    lu.swap(k * n + j, max_row * n + j);
                }
                pivots.swap(k, max_row);
                sign = -sign;
            }

            let pivot = lu[k * n + k];
            if pivot == 0.0 {
                // Whole column below the diagonal is zero already.
                continue;
            }

            for i in (k + 1)..n {
                let factor = lu[i * n + k] / pivot;
                lu[i * n + k] = factor;
                for j in (k + 1)..n {
                    let ukj = lu[k * n + j];
                    lu[i * n + j] -= factor * ukj;
                }
            }
        }

        Ok(Self { lu, pivots, n, sign })
    }

    /// Dimension of the factorised matrix
    pub fn dim(&self) -> usize {
        self.n
    }

    /// `sign · Π diag(U)`
    pub fn det(&self) -> f64 {
        (0..self.n).fold(self.sign, |d, i| d * self.lu[i * self.n + i])
    }

    /// True when some pivot is exactly zero
    pub fn has_zero_pivot(&self) -> bool {
        (0..self.n).any(|i| self.lu[i * self.n + i] == 0.0)
    }

    /// Smallest and largest pivot magnitude, `(∞, 0)` for an empty matrix
    pub fn pivot_range(&self) -> (f64, f64) {
        (0..self.n)
            .map(|i| self.lu[i * self.n + i].abs())
            .fold((f64::INFINITY, 0.0), |(lo, hi), p| (lo.min(p), hi.max(p)))
    }

    pub fn pivots(&self) -> &[usize] {
        &self.pivots
    }

    /// Unit lower triangular factor
    pub fn l(&self) -> Matrix {
        let n = self.n;
        let mut l = Matrix::identity(n);
        for i in 0..n {
            for j in 0..i {
                l.set(i, j, self.lu[i * n + j]);
            }
        }
        l
    }

    /// Upper triangular factor
    pub fn u(&self) -> Matrix {
        let n = self.n;
        let mut u = Matrix::zeros(n, n);
        for i in 0..n {
            for j in i..n {
                u.set(i, j, self.lu[i * n + j]);
            }
        }
        u
    }

    /// Solve `A·x = b`
    ///
    /// # Errors
    ///
    /// - `Dimension` when `b.len() != n`
    /// - `SingularMatrix` when a pivot is exactly zero
    pub fn solve(&self, b: &[f64]) -> Result<Vec<f64>> {
        let n = self.n;
        if b.len() != n {
            return Err(NumericError::dimension(
                "LuDecomposition::solve",
                format!("right-hand side of length {n}"),
                format!("length {}", b.len()),
            ));
        }
        if self.has_zero_pivot() {
            return Err(NumericError::SingularMatrix {
                rows: n,
                cols: n,
                determinant: 0.0,
                threshold: 0.0,
            });
        }

        let mut x: Vec<f64> = self.pivots.iter().map(|&p| b[p]).collect();

        // Forward substitution L·y = P·b
        #[allow(clippy::needless_range_loop)]
        for i in 1..n {
            for j in 0..i {
                let lij_xj = self.lu[i * n + j] * x[j];
                x[i] -= lij_xj;
            }
        }

        // Back substitution U·x = y
        #[allow(clippy::needless_range_loop)]
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                let uij_xj = self.lu[i * n + j] * x[j];
                x[i] -= uij_xj;
            }
            x[i] /= self.lu[i * n + i];
        }

        Ok(x)
    }

    /// `A⁻¹`, solving `A·X = I` column by column
    pub fn inverse(&self) -> Result<Matrix> {
        let n = self.n;
        let mut inv = Matrix::zeros(n, n);
        let mut e = vec![0.0; n];
        for col in 0..n {
            e.iter_mut().for_each(|v| *v = 0.0);
            e[col] = 1.0;
            let x = self.solve(&e)?;
            for (row, value) in x.into_iter().enumerate() {
                inv.set(row, col, value);
            }
        }
        Ok(inv)
    }
}

// =================================================================================================
// Tests
// =================================================================================================
