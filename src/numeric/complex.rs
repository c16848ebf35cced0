//! Complex numbers
//!
//! `Complex` is the unifying scalar of the transform and eigenvalue code: a
//! value with `im == 0` is still a `Complex`, there is no separate real path.

use crate::error::{NumericError, Result};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// Complex number `re + i·im`
///
/// Immutable value type: every operation returns a new value.
///
/// Division is only available as the fallible [`Complex::div`], because
/// dividing by a zero-modulus value is a `Domain` error rather than an
/// infinity.
///
/// # Example
///
/// ```rust
/// use numerix::numeric::Complex;
///
/// let a = Complex::new(1.0, 2.0);
/// let b = Complex::new(3.0, -1.0);
///
/// assert_eq!(a + b, Complex::new(4.0, 1.0));
/// assert_eq!(a * b, Complex::new(5.0, 5.0));
/// assert!(a.div(Complex::ZERO).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

#[allow(clippy::should_implement_trait)]
impl Complex {
    pub const ZERO: Complex = Complex { re: 0.0, im: 0.0 };
    pub const ONE: Complex = Complex { re: 1.0, im: 0.0 };
    pub const I: Complex = Complex { re: 0.0, im: 1.0 };

    /// Create from rectangular parts
    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Create a purely real value
    pub const fn real(re: f64) -> Self {
        Self { re, im: 0.0 }
    }

    /// Create from polar form `r·e^{iθ}`
    pub fn from_polar(r: f64, theta: f64) -> Self {
        Self::new(r * theta.cos(), r * theta.sin())
    }

    pub fn add(self, rhs: Complex) -> Complex {
        Complex::new(self.re + rhs.re, self.im + rhs.im)
    }

    pub fn sub(self, rhs: Complex) -> Complex {
        Complex::new(self.re - rhs.re, self.im - rhs.im)
    }

    pub fn mul(self, rhs: Complex) -> Complex {
        Complex::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }

    /// Divide by `rhs`
    ///
    /// Uses Smith's algorithm to avoid overflow in `|rhs|²`.
    ///
    /// # Errors
    ///
    /// `Domain` when `rhs` has zero modulus.
    pub fn div(self, rhs: Complex) -> Result<Complex> {
        if rhs.re == 0.0 && rhs.im == 0.0 {
            return Err(NumericError::domain(
                "Complex::div",
                format!("division of {self} by zero-modulus complex"),
            ));
        }

        if rhs.re.abs() >= rhs.im.abs() {
            let ratio = rhs.im / rhs.re;
            let denom = rhs.re + rhs.im * ratio;
            Ok(Complex::new(
                (self.re + self.im * ratio) / denom,
                (self.im - self.re * ratio) / denom,
            ))
        } else {
            let ratio = rhs.re / rhs.im;
            let denom = rhs.re * ratio + rhs.im;
            Ok(Complex::new(
                (self.re * ratio + self.im) / denom,
                (self.im * ratio - self.re) / denom,
            ))
        }
    }

    /// Complex conjugate
    pub fn conj(self) -> Complex {
        Complex::new(self.re, -self.im)
    }

    /// `|z|`, computed without intermediate overflow
    pub fn modulus(self) -> f64 {
        self.re.hypot(self.im)
    }

    /// `|z|²`
    pub fn norm_sqr(self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    /// Principal argument in `(-π, π]`
    pub fn argument(self) -> f64 {
        self.im.atan2(self.re)
    }

    /// Multiply by a real scalar
    pub fn scale(self, factor: f64) -> Complex {
        Complex::new(self.re * factor, self.im * factor)
    }

    /// `e^z`
    pub fn exp(self) -> Complex {
        Complex::from_polar(self.re.exp(), self.im)
    }

    /// Principal square root
    pub fn sqrt(self) -> Complex {
        let r = self.modulus();
        if r == 0.0 {
            return Complex::ZERO;
        }
        let re = ((r + self.re) / 2.0).sqrt();
        let im = ((r - self.re) / 2.0).sqrt();
        Complex::new(re, if self.im < 0.0 { -im } else { im })
    }

    /// Integer power by repeated squaring
    ///
    /// # Errors
    ///
    /// `Domain` for a negative power of zero.
    pub fn powi(self, n: i32) -> Result<Complex> {
        if n < 0 {
            return Complex::ONE.div(self)?.powi(-n);
        }

        let mut base = self;
        let mut exponent = n as u32;
        let mut acc = Complex::ONE;
        while exponent > 0 {
            if exponent & 1 == 1 {
                acc = acc.mul(base);
            }
            base = base.mul(base);
            exponent >>= 1;
        }
        Ok(acc)
    }

    pub fn is_finite(self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }

    /// True when both parts differ by at most `tolerance`
    pub fn approx_eq(self, other: Complex, tolerance: f64) -> bool {
        (self.re - other.re).abs() <= tolerance && (self.im - other.im).abs() <= tolerance
    }
}

// ====================================== Operator overloading ======================================

impl Add for Complex {
    type Output = Complex;
    fn add(self, rhs: Complex) -> Complex {
        Complex::add(self, rhs)
    }
}

impl Sub for Complex {
    type Output = Complex;
    fn sub(self, rhs: Complex) -> Complex {
        Complex::sub(self, rhs)
    }
}

impl Mul for Complex {
    type Output = Complex;
    fn mul(self, rhs: Complex) -> Complex {
        Complex::mul(self, rhs)
    }
}

impl Mul<f64> for Complex {
    type Output = Complex;
    fn mul(self, rhs: f64) -> Complex {
        self.scale(rhs)
    }
}

impl Neg for Complex {
    type Output = Complex;
    fn neg(self) -> Complex {
        Complex::new(-self.re, -self.im)
    }
}

impl From<f64> for Complex {
    fn from(re: f64) -> Self {
        Complex::real(re)
    }
}

impl From<num::complex::Complex64> for Complex {
    fn from(value: num::complex::Complex64) -> Self {
        Complex::new(value.re, value.im)
    }
}

impl From<Complex> for num::complex::Complex64 {
    fn from(value: Complex) -> Self {
        num::complex::Complex64::new(value.re, value.im)
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.im < 0.0 {
            write!(f, "{}-{}i", self.re, -self.im)
        } else {
            write!(f, "{}+{}i", self.re, self.im)
        }
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_field_operations() {
        let a = Complex::new(1.0, 2.0);
        let b = Complex::new(3.0, 4.0);

        assert_eq!(a + b, Complex::new(4.0, 6.0));
        assert_eq!(a - b, Complex::new(-2.0, -2.0));
        assert_eq!(a * b, Complex::new(-5.0, 10.0));

        let q = a.div(b).unwrap();
        assert_relative_eq!(q.re, 0.44, epsilon = 1e-15);
        assert_relative_eq!(q.im, 0.08, epsilon = 1e-15);
    }

    #[test]
    fn test_division_round_trip() {
        let a = Complex::new(-2.5, 7.0);
        let b = Complex::new(1e-3, -4.0);
        let back = a.div(b).unwrap() * b;
        assert!(back.approx_eq(a, 1e-12));
    }

    #[test]
    fn test_division_by_zero_is_domain_error() {
        let err = Complex::ONE.div(Complex::ZERO).unwrap_err();
        assert_eq!(err.kind(), "DomainError");
    }

    #[test]
    fn test_polar_quantities() {
        let z = Complex::new(0.0, 2.0);
        assert_eq!(z.modulus(), 2.0);
        assert_relative_eq!(z.argument(), PI / 2.0);
        assert_eq!(z.conj(), Complex::new(0.0, -2.0));

        let w = Complex::from_polar(2.0, PI / 2.0);
        assert!(w.approx_eq(z, 1e-15));
    }

    #[test]
    fn test_exp_euler_identity() {
        let z = Complex::new(0.0, PI).exp();
        assert!(z.approx_eq(Complex::real(-1.0), 1e-15));
    }

    #[test]
    fn test_sqrt() {
        let root = Complex::real(-4.0).sqrt();
        assert!(root.approx_eq(Complex::new(0.0, 2.0), 1e-15));

        let z = Complex::new(3.0, -4.0);
        let s = z.sqrt();
        assert!((s * s).approx_eq(z, 1e-12));
    }

    #[test]
    fn test_powi() {
        let i = Complex::I;
        assert!(i.powi(2).unwrap().approx_eq(Complex::real(-1.0), 1e-15));
        assert!(i.powi(-1).unwrap().approx_eq(Complex::new(0.0, -1.0), 1e-15));
        assert!(Complex::ZERO.powi(-2).is_err());
    }

    #[test]
    fn test_num_interop() {
        let z = Complex::new(1.5, -0.5);
        let n: num::complex::Complex64 = z.into();
        assert_eq!(n.norm(), z.modulus());
        assert_eq!(Complex::from(n), z);
    }

    #[test]
    fn test_display() {
        assert_eq!(Complex::new(1.0, -2.0).to_string(), "1-2i");
        assert_eq!(Complex::new(0.5, 3.0).to_string(), "0.5+3i");
    }
}
