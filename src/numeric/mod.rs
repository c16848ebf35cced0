//! Numeric primitives
//!
//! Value types every other component is built on:
//!
//! - [`Complex`]: complex scalar, the unifying representation for transforms
//!   and eigenvalues
//! - [`Matrix`]: dense row-major `f64` matrix with checked arithmetic
//! - [`Polynomial`]: real polynomial, evaluated with Horner's method
//! - [`MathFunction`]: the function abstraction the solvers consume, with
//!   its variants [`FnFunction`], [`Composed`] and [`NumericalDerivative`]
//!
//! All types here are plain values without hidden shared state; the only
//! process-wide value the crate reads is the performance hint
//! [`crate::solver::parallel_threshold`].

mod complex;
pub mod function;
mod matrix;
mod polynomial;

pub use complex::Complex;
pub use function::{Composed, FnFunction, MathFunction, NumericalDerivative};
pub use matrix::Matrix;
pub use polynomial::Polynomial;
