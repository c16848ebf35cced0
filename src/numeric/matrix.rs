//! Dense row-major matrices
//!
//! # Ownership
//!
//! A `Matrix` is owned exclusively by its holder. Every operation here takes
//! `&self` and returns a new matrix; nothing mutates in place except the
//! explicit [`Matrix::set`]. The in-place LU factorisation in
//! [`crate::linalg`] consumes its input, so no alias can observe a
//! half-factorised matrix.
//!
//! # Zero-sized matrices
//!
//! `rows == 0` or `cols == 0` is valid. Products and sums of degenerate
//! matrices follow the usual shape rules (`(m×0)·(0×n)` is an `m×n` zero
//! matrix).

use crate::error::{NumericError, Result};
use nalgebra::{DMatrix, DVector};
use std::fmt;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Dense `rows × cols` matrix of `f64` stored row-major
///
/// # Invariant
///
/// `data.len() == rows * cols`, enforced by every constructor.
///
/// # Example
///
/// ```rust
/// use numerix::numeric::Matrix;
///
/// let a = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
/// let b = Matrix::identity(2);
///
/// assert_eq!(a.mul(&b).unwrap(), a);
/// assert_eq!(a.transpose().get(0, 1), 3.0);
/// assert!(a.mul(&Matrix::zeros(3, 3)).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

#[allow(clippy::should_implement_trait)]
impl Matrix {
    // ======================================= constructors =======================================

    /// Create from row-major data
    ///
    /// # Errors
    ///
    /// `Dimension` when `data.len() != rows * cols`.
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(NumericError::dimension(
                "Matrix::new",
                format!("{} elements for {rows}x{cols}", rows * cols),
                format!("{} elements", data.len()),
            ));
        }
        Ok(Self { rows, cols, data })
    }

    /// Create a zero matrix
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Create the `n × n` identity
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.data[i * n + i] = 1.0;
        }
        m
    }

    /// Create from a slice of rows
    ///
    /// # Errors
    ///
    /// `Dimension` when the rows have different lengths.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(NumericError::dimension(
                    "Matrix::from_rows",
                    format!("{cols} columns"),
                    format!("{} columns in row {i}", row.len()),
                ));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Create a diagonal matrix
    pub fn diagonal(values: &[f64]) -> Self {
        let n = values.len();
        let mut m = Self::zeros(n, n);
        for (i, v) in values.iter().enumerate() {
            m.data[i * n + i] = *v;
        }
        m
    }

    // ========================================== Queries ==========================================

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// True when either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row-major element slice
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Consume into row-major data
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Element at `(row, col)`
    ///
    /// # Panics
    ///
    /// Panics when the index is out of bounds, like slice indexing.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(
            row < self.rows && col < self.cols,
            "index ({row}, {col}) out of bounds for {}x{} matrix",
            self.rows,
            self.cols
        );
        self.data[row * self.cols + col]
    }

    /// Overwrite the element at `(row, col)`
    ///
    /// # Panics
    ///
    /// Panics when the index is out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        assert!(
            row < self.rows && col < self.cols,
            "index ({row}, {col}) out of bounds for {}x{} matrix",
            self.rows,
            self.cols
        );
        self.data[row * self.cols + col] = value;
    }

    /// Borrow one row
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Copy one column
    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.rows).map(|r| self.data[r * self.cols + col]).collect()
    }

    /// Sum of the diagonal
    ///
    /// # Errors
    ///
    /// `Dimension` for non-square matrices.
    pub fn trace(&self) -> Result<f64> {
        self.require_square("Matrix::trace")?;
        Ok((0..self.rows).map(|i| self.data[i * self.cols + i]).sum())
    }

    /// Frobenius norm `sqrt(Σ aᵢⱼ²)`
    pub fn frobenius_norm(&self) -> f64 {
        self.data.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    /// Largest absolute element-wise difference, `None` on shape mismatch
    pub fn max_abs_diff(&self, other: &Matrix) -> Option<f64> {
        if self.shape() != other.shape() {
            return None;
        }
        Some(
            self.data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max),
        )
    }

    pub(crate) fn require_square(&self, operation: &'static str) -> Result<()> {
        if !self.is_square() {
            return Err(NumericError::dimension(
                operation,
                "square matrix",
                format!("{}x{}", self.rows, self.cols),
            ));
        }
        Ok(())
    }

    fn require_same_shape(&self, other: &Matrix, operation: &'static str) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(NumericError::dimension(
                operation,
                format!("{}x{}", self.rows, self.cols),
                format!("{}x{}", other.rows, other.cols),
            ));
        }
        Ok(())
    }

    // ======================================== Arithmetic ========================================

    /// Element-wise sum
    pub fn add(&self, other: &Matrix) -> Result<Matrix> {
        self.require_same_shape(other, "Matrix::add")?;
        let data = self.data.iter().zip(&other.data).map(|(a, b)| a + b).collect();
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data,
        })
    }

    /// Element-wise difference
    pub fn sub(&self, other: &Matrix) -> Result<Matrix> {
        self.require_same_shape(other, "Matrix::sub")?;
        let data = self.data.iter().zip(&other.data).map(|(a, b)| a - b).collect();
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data,
        })
    }

    /// Multiply every element by `factor`
    pub fn scale(&self, factor: f64) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|x| x * factor).collect(),
        }
    }

    /// Transpose
    pub fn transpose(&self) -> Matrix {
        let mut out = Matrix::zeros(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.data[c * self.rows + r] = self.data[r * self.cols + c];
            }
        }
        out
    }

    /// Matrix product `self · other`
    ///
    /// Rows of the result are independent, so above
    /// [`parallel_threshold()`](crate::solver::parallel_threshold) output
    /// elements they are computed with rayon when the `parallel` feature is
    /// enabled.
    ///
    /// # Errors
    ///
    /// `Dimension` when `self.cols != other.rows`.
    pub fn mul(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols != other.rows {
            return Err(NumericError::dimension(
                "Matrix::mul",
                format!("{} rows in right operand", self.cols),
                format!("{}x{} · {}x{}", self.rows, self.cols, other.rows, other.cols),
            ));
        }

        let (n, m, p) = (self.rows, self.cols, other.cols);
        let mut data = vec![0.0; n * p];
        if p == 0 {
            return Ok(Matrix { rows: n, cols: p, data });
        }

        // i-k-j loop order keeps both operands streaming row-major.
        let compute_row = |i: usize, out: &mut [f64]| {
            for k in 0..m {
                let a = self.data[i * m + k];
                if a == 0.0 {
                    continue;
                }
                let b_row = &other.data[k * p..(k + 1) * p];
                for (o, b) in out.iter_mut().zip(b_row) {
                    *o += a * b;
                }
            }
        };

        if n * p > crate::solver::parallel_threshold() {
            #[cfg(feature = "parallel")]
            data.par_chunks_mut(p)
                .enumerate()
                .for_each(|(i, out)| compute_row(i, out));
            #[cfg(not(feature = "parallel"))]
            data.chunks_mut(p)
                .enumerate()
                .for_each(|(i, out)| compute_row(i, out));
        } else {
            data.chunks_mut(p)
                .enumerate()
                .for_each(|(i, out)| compute_row(i, out));
        }

        Ok(Matrix { rows: n, cols: p, data })
    }

    /// Matrix-vector product
    ///
    /// # Errors
    ///
    /// `Dimension` when `v.len() != self.cols`.
    pub fn mul_vector(&self, v: &[f64]) -> Result<Vec<f64>> {
        if v.len() != self.cols {
            return Err(NumericError::dimension(
                "Matrix::mul_vector",
                format!("vector of length {}", self.cols),
                format!("length {}", v.len()),
            ));
        }
        Ok((0..self.rows)
            .map(|r| self.row(r).iter().zip(v).map(|(a, b)| a * b).sum())
            .collect())
    }
}

// ====================================== nalgebra interop =======================================

impl From<&DMatrix<f64>> for Matrix {
    fn from(m: &DMatrix<f64>) -> Self {
        let (rows, cols) = m.shape();
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                data.push(m[(r, c)]);
            }
        }
        Matrix { rows, cols, data }
    }
}

impl From<&Matrix> for DMatrix<f64> {
    fn from(m: &Matrix) -> Self {
        DMatrix::from_row_slice(m.rows, m.cols, &m.data)
    }
}

impl From<&DVector<f64>> for Matrix {
    /// Column vector
    fn from(v: &DVector<f64>) -> Self {
        Matrix {
            rows: v.len(),
            cols: 1,
            data: v.iter().copied().collect(),
        }
    }
}

// ========================================= Display ==========================================

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrix [{} * {}]", self.rows, self.cols)?;
        for r in 0..self.rows {
            let row = self
                .row(r)
                .iter()
                .map(|x| format!("{x:>12.6}"))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(f, "[{row}]")?;
        }
        Ok(())
    }
}

// =================================================================================================
// Tests
// =================================================================================================
