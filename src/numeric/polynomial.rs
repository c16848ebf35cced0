//! Real polynomials
//!
//! Coefficients are stored lowest degree first, so `[c0, c1, c2]` is
//! `c0 + c1·x + c2·x²`. Trailing zero coefficients are trimmed on
//! construction; the zero polynomial has an empty coefficient list and
//! degree 0.

use crate::config::LinalgConfig;
use crate::error::Result;
use crate::numeric::function::MathFunction;
use crate::numeric::{Complex, Matrix};
use crate::runtime::ExecutionContext;
use std::fmt;
use std::sync::Arc;

/// Polynomial with `f64` coefficients, lowest degree first
///
/// # Example
///
/// ```rust
/// use numerix::numeric::Polynomial;
///
/// // x² - 2x + 1
/// let p = Polynomial::new(vec![1.0, -2.0, 1.0]);
/// assert_eq!(p.evaluate(3.0), 4.0);
/// assert_eq!(p.derivative().coefficients(), &[-2.0, 2.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polynomial {
    coefficients: Vec<f64>,
}

#[allow(clippy::should_implement_trait)]
impl Polynomial {
    /// Create from coefficients (lowest degree first)
    pub fn new(mut coefficients: Vec<f64>) -> Self {
        while coefficients.last() == Some(&0.0) {
            coefficients.pop();
        }
        Self { coefficients }
    }

    /// The constant polynomial `c`
    pub fn constant(c: f64) -> Self {
        Self::new(vec![c])
    }

    /// Monic polynomial with the given real roots
    pub fn from_roots(roots: &[f64]) -> Self {
        roots.iter().fold(Polynomial::constant(1.0), |acc, r| {
            acc.mul(&Polynomial::new(vec![-r, 1.0]))
        })
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Degree (0 for constants and the zero polynomial)
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    pub fn is_zero(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Evaluate with Horner's method
    pub fn evaluate(&self, x: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * x + c)
    }

    /// Evaluate at a complex point with Horner's method
    pub fn evaluate_complex(&self, z: Complex) -> Complex {
        self.coefficients
            .iter()
            .rev()
            .fold(Complex::ZERO, |acc, c| acc * z + Complex::real(*c))
    }

    /// Analytical derivative
    pub fn derivative(&self) -> Polynomial {
        Polynomial::new(
            self.coefficients
                .iter()
                .enumerate()
                .skip(1)
                .map(|(k, c)| k as f64 * c)
                .collect(),
        )
    }

    /// Antiderivative with zero integration constant
    pub fn antiderivative(&self) -> Polynomial {
        let mut coefficients = Vec::with_capacity(self.coefficients.len() + 1);
        coefficients.push(0.0);
        coefficients.extend(
            self.coefficients
                .iter()
                .enumerate()
                .map(|(k, c)| c / (k as f64 + 1.0)),
        );
        Polynomial::new(coefficients)
    }

    pub fn add(&self, other: &Polynomial) -> Polynomial {
        let n = self.coefficients.len().max(other.coefficients.len());
        Polynomial::new(
            (0..n)
                .map(|k| {
                    self.coefficients.get(k).copied().unwrap_or(0.0)
                        + other.coefficients.get(k).copied().unwrap_or(0.0)
                })
                .collect(),
        )
    }

    pub fn mul(&self, other: &Polynomial) -> Polynomial {
        if self.is_zero() || other.is_zero() {
            return Polynomial::default();
        }
        let mut out = vec![0.0; self.coefficients.len() + other.coefficients.len() - 1];
        for (i, a) in self.coefficients.iter().enumerate() {
            for (j, b) in other.coefficients.iter().enumerate() {
                out[i + j] += a * b;
            }
        }
        Polynomial::new(out)
    }

    pub fn scale(&self, factor: f64) -> Polynomial {
        Polynomial::new(self.coefficients.iter().map(|c| c * factor).collect())
    }

    /// All complex roots
    ///
    /// Computed as the eigenvalues of the companion matrix, so accuracy and
    /// failure modes are those of [`crate::linalg::eigenvalues`]. Constants
    /// have no roots.
    ///
    /// # Errors
    ///
    /// `Convergence` when the eigenvalue iteration does not converge.
    pub fn roots(&self, config: &LinalgConfig, ctx: &ExecutionContext) -> Result<Vec<Complex>> {
        let n = self.degree();
        if n == 0 {
            return Ok(Vec::new());
        }

        // Companion matrix of the monic polynomial: ones on the subdiagonal,
        // negated normalised coefficients in the last column.
        let lead = self.coefficients[n];
        let mut companion = Matrix::zeros(n, n);
        for i in 1..n {
            companion.set(i, i - 1, 1.0);
        }
        for i in 0..n {
            companion.set(i, n - 1, -self.coefficients[i] / lead);
        }

        crate::linalg::eigenvalues(&companion, config, ctx)
    }
}

impl MathFunction for Polynomial {
    fn evaluate(&self, x: f64) -> f64 {
        Polynomial::evaluate(self, x)
    }

    fn derivative(&self) -> Option<Arc<dyn MathFunction>> {
        Some(Arc::new(Polynomial::derivative(self)))
    }

    fn name(&self) -> &str {
        "polynomial"
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }
        let terms: Vec<String> = self
            .coefficients
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, c)| **c != 0.0)
            .map(|(k, c)| match k {
                0 => format!("{c}"),
                1 => format!("{c}x"),
                _ => format!("{c}x^{k}"),
            })
            .collect();
        write!(f, "{}", terms.join(" + "))
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_trailing_zeros_trimmed() {
        let p = Polynomial::new(vec![1.0, 2.0, 0.0, 0.0]);
        assert_eq!(p.degree(), 1);
        assert!(Polynomial::new(vec![0.0]).is_zero());
    }

    #[test]
    fn test_horner_evaluation() {
        // 2x³ - 6x² + 2x - 1
        let p = Polynomial::new(vec![-1.0, 2.0, -6.0, 2.0]);
        assert_eq!(p.evaluate(3.0), 5.0);
        assert_eq!(p.evaluate(0.0), -1.0);
    }

    #[test]
    fn test_derivative_and_antiderivative() {
        let p = Polynomial::new(vec![1.0, -2.0, 1.0]);
        assert_eq!(p.derivative(), Polynomial::new(vec![-2.0, 2.0]));
        assert_eq!(p.antiderivative().derivative(), p);
        assert!(Polynomial::constant(4.0).derivative().is_zero());
    }

    #[test]
    fn test_arithmetic() {
        let a = Polynomial::new(vec![1.0, 1.0]);
        let b = Polynomial::new(vec![-1.0, 1.0]);
        assert_eq!(a.mul(&b), Polynomial::new(vec![-1.0, 0.0, 1.0]));
        assert_eq!(a.add(&b), Polynomial::new(vec![0.0, 2.0]));
        assert_eq!(a.add(&a.scale(-1.0)), Polynomial::default());
    }

    #[test]
    fn test_math_function_capability() {
        let p: Arc<dyn MathFunction> = Arc::new(Polynomial::new(vec![0.0, 0.0, 3.0]));
        let dp = MathFunction::derivative(p.as_ref()).unwrap();
        assert_eq!(dp.evaluate(2.0), 12.0);
    }

    #[test]
    fn test_roots_of_quadratic() {
        let p = Polynomial::from_roots(&[2.0, -3.0]);
        let mut roots: Vec<f64> = p
            .roots(&LinalgConfig::default(), &ExecutionContext::detached())
            .unwrap()
            .iter()
            .map(|z| z.re)
            .collect();
        roots.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_relative_eq!(roots[0], -3.0, epsilon = 1e-10);
        assert_relative_eq!(roots[1], 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_complex_roots() {
        // x² + 1
        let p = Polynomial::new(vec![1.0, 0.0, 1.0]);
        let roots = p
            .roots(&LinalgConfig::default(), &ExecutionContext::detached())
            .unwrap();
        assert_eq!(roots.len(), 2);
        for z in roots {
            assert!(p.evaluate_complex(z).modulus() < 1e-10);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Polynomial::new(vec![1.0, -2.0, 1.0]).to_string(), "1x^2 + -2x + 1");
    }
}
