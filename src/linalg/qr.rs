//! QR decomposition via Householder reflections
//!
//! `A = QR` for an `m × n` matrix with `m >= n`; `Q` is orthogonal
//! (`m × m`) and `R` upper triangular (`m × n`). Used for least squares.

use crate::error::{NumericError, Result};
use crate::numeric::Matrix;

/// Compact Householder factorisation
///
/// The working buffer holds `R` above the diagonal and the Householder
/// vectors on and below it; the diagonal of `R` is kept separately.
#[derive(Debug, Clone)]
pub struct QrDecomposition {
    qr: Vec<f64>,
    r_diag: Vec<f64>,
    m: usize,
    n: usize,
    rank_tolerance: f64,
}

#[allow(clippy::many_single_char_names)]
impl QrDecomposition {
    /// Factorise `a`
    ///
    /// # Errors
    ///
    /// `Dimension` when `a` has more columns than rows.
    pub fn decompose(a: &Matrix) -> Result<Self> {
        let (m, n) = a.shape();
        if m < n {
            return Err(NumericError::dimension(
                "QrDecomposition::decompose",
                "rows >= cols",
                format!("{m}x{n}"),
            ));
        }

        let mut qr = a.as_slice().to_vec();
        let mut r_diag = vec![0.0; n];
        let rank_tolerance = 1e3 * f64::EPSILON * a.frobenius_norm().max(1.0);

        for k in 0..n {
            let mut norm = (k..m).map(|i| qr[i * n + k].powi(2)).sum::<f64>().sqrt();
            if norm <= rank_tolerance {
                r_diag[k] = 0.0;
                continue;
            }

            // Sign chosen to avoid cancellation
            if qr[k * n + k] > 0.0 {
                norm = -norm;
            }
            for i in k..m {
                qr[i * n + k] /= -norm;
            }
            qr[k * n + k] += 1.0;

            for j in (k + 1)..n {
                let mut s = 0.0;
                for i in k..m {
                    s += qr[i * n + k] * qr[i * n + j];
                }
                s = -s / qr[k * n + k];
                for i in k..m {
                    let v = qr[i * n + k];
                    qr[i * n + j] += s * v;
                }
            }

            r_diag[k] = norm;
        }

        Ok(Self {
            qr,
            r_diag,
            m,
            n,
            rank_tolerance,
        })
    }

    /// Whether every diagonal entry of `R` is non-negligible
    pub fn is_full_rank(&self) -> bool {
        self.r_diag.iter().all(|d| d.abs() > self.rank_tolerance)
    }

    /// Upper triangular factor (`m × n`)
    pub fn r(&self) -> Matrix {
        let (m, n) = (self.m, self.n);
        let mut r = Matrix::zeros(m, n);
        for i in 0..n {
            r.set(i, i, self.r_diag[i]);
            for j in (i + 1)..n {
                r.set(i, j, self.qr[i * n + j]);
            }
        }
        r
    }

    /// Orthogonal factor (`m × m`)
    pub fn q(&self) -> Matrix {
        let (m, n) = (self.m, self.n);
        let mut q = Matrix::identity(m);

        for k in (0..n).rev() {
            if self.r_diag[k] == 0.0 {
                continue;
            }
            for j in 0..m {
                let mut s = 0.0;
                for i in k..m {
                    s += self.qr[i * n + k] * q.get(i, j);
                }
                s = -s / self.qr[k * n + k];
                for i in k..m {
                    q.set(i, j, q.get(i, j) + s * self.qr[i * n + k]);
                }
            }
        }
        q
    }

    /// Minimise `‖A·x - b‖₂`
    ///
    /// # Errors
    ///
    /// - `Dimension` when `b.len() != m`
    /// - `SingularMatrix` when `A` is rank deficient
    pub fn least_squares(&self, b: &[f64]) -> Result<Vec<f64>> {
        let (m, n) = (self.m, self.n);
        if b.len() != m {
            return Err(NumericError::dimension(
                "QrDecomposition::least_squares",
                format!("right-hand side of length {m}"),
                format!("length {}", b.len()),
            ));
        }
        if !self.is_full_rank() {
            return Err(NumericError::SingularMatrix {
                rows: m,
                cols: n,
                determinant: 0.0,
                threshold: self.rank_tolerance,
            });
        }

        // y = Qᵀ·b, applying the reflections in order
        let mut y = b.to_vec();
        for k in 0..n {
            let mut s = 0.0;
            for i in k..m {
                s += self.qr[i * n + k] * y[i];
            }
            s = -s / self.qr[k * n + k];
            for i in k..m {
                y[i] += s * self.qr[i * n + k];
            }
        }

        // R·x = y
        let mut x = vec![0.0; n];
        for i in (0..n).rev() {
            let mut sum = y[i];
            for j in (i + 1)..n {
                sum -= self.qr[i * n + j] * x[j];
            }
            x[i] = sum / self.r_diag[i];
        }
        Ok(x)
    }
}
