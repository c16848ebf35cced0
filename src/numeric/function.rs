//! Function abstraction consumed by the solvers
//!
//! # The capability set
//!
//! Every function exposes `evaluate`. The analytical `derivative` is an
//! optional capability: `None` means the function cannot differentiate
//! itself, and the solver decides at call time whether a numerical fallback
//! applies (see [`crate::config::DerivativePolicy`]).
//!
//! ```text
//! ┌────────────────────┐   evaluate   derivative()
//! │ Polynomial         │      ✓            ✓ (exact)
//! │ FnFunction         │      ✓            ✓ if supplied
//! │ Composed  f∘g      │      ✓            ✓ if f and g both have one
//! │ NumericalDerivative│      ✓            ✓ (nested finite difference)
//! └────────────────────┘
//! ```
//!
//! Functions are shared across worker threads as `Arc<dyn MathFunction>`, so
//! implementations must be `Send + Sync`.

use crate::config::DerivativeConfig;
use std::fmt;
use std::sync::Arc;

/// Real function of one real variable
///
/// # Example
///
/// ```rust
/// use numerix::numeric::{FnFunction, MathFunction};
///
/// let f = FnFunction::new("square", |x| x * x).with_derivative(|x| 2.0 * x);
/// assert_eq!(f.evaluate(3.0), 9.0);
/// assert_eq!(f.derivative().unwrap().evaluate(3.0), 6.0);
/// ```
pub trait MathFunction: Send + Sync {
    /// Value at `x`
    fn evaluate(&self, x: f64) -> f64;

    /// Analytical derivative, when the function has one
    fn derivative(&self) -> Option<Arc<dyn MathFunction>> {
        None
    }

    /// Human-readable name, used in error messages
    fn name(&self) -> &str {
        "anonymous"
    }
}

type Closure = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

// =================================================================================================
// User-defined functions
// =================================================================================================

/// Function backed by a closure, with an optional analytical derivative
#[derive(Clone)]
pub struct FnFunction {
    name: String,
    f: Closure,
    df: Option<Closure>,
}

impl FnFunction {
    pub fn new(name: impl Into<String>, f: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            f: Arc::new(f),
            df: None,
        }
    }

    /// Builder pattern: attach an analytical derivative
    pub fn with_derivative(mut self, df: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        self.df = Some(Arc::new(df));
        self
    }

    pub fn has_derivative(&self) -> bool {
        self.df.is_some()
    }
}

impl MathFunction for FnFunction {
    fn evaluate(&self, x: f64) -> f64 {
        (self.f)(x)
    }

    fn derivative(&self) -> Option<Arc<dyn MathFunction>> {
        self.df.as_ref().map(|df| {
            Arc::new(FnFunction {
                name: format!("d/dx {}", self.name),
                f: Arc::clone(df),
                df: None,
            }) as Arc<dyn MathFunction>
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for FnFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFunction")
            .field("name", &self.name)
            .field("has_derivative", &self.df.is_some())
            .finish()
    }
}

// =================================================================================================
// Composition
// =================================================================================================

/// `outer ∘ inner`, i.e. `x ↦ outer(inner(x))`
pub struct Composed {
    name: String,
    outer: Arc<dyn MathFunction>,
    inner: Arc<dyn MathFunction>,
}

impl Composed {
    pub fn new(outer: Arc<dyn MathFunction>, inner: Arc<dyn MathFunction>) -> Self {
        let name = format!("{}∘{}", outer.name(), inner.name());
        Self { name, outer, inner }
    }
}

impl MathFunction for Composed {
    fn evaluate(&self, x: f64) -> f64 {
        self.outer.evaluate(self.inner.evaluate(x))
    }

    /// Chain rule, available only when both sides are differentiable
    fn derivative(&self) -> Option<Arc<dyn MathFunction>> {
        let outer_prime = self.outer.derivative()?;
        let inner_prime = self.inner.derivative()?;
        Some(Arc::new(ChainRule {
            name: format!("d/dx {}", self.name),
            outer_prime,
            inner: Arc::clone(&self.inner),
            inner_prime,
        }))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// `x ↦ outer'(inner(x)) · inner'(x)`
struct ChainRule {
    name: String,
    outer_prime: Arc<dyn MathFunction>,
    inner: Arc<dyn MathFunction>,
    inner_prime: Arc<dyn MathFunction>,
}

impl MathFunction for ChainRule {
    fn evaluate(&self, x: f64) -> f64 {
        self.outer_prime.evaluate(self.inner.evaluate(x)) * self.inner_prime.evaluate(x)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// =================================================================================================
// Numerical differentiation
// =================================================================================================

/// Central-difference derivative of a wrapped function
///
/// `f'(x) ≈ (f(x + h) - f(x - h)) / 2h` with `h` from
/// [`DerivativeConfig::step_at`]. Its own `derivative()` is again numerical,
/// so second derivatives are available, with the expected loss of accuracy.
pub struct NumericalDerivative {
    name: String,
    function: Arc<dyn MathFunction>,
    config: DerivativeConfig,
}

impl NumericalDerivative {
    pub fn new(function: Arc<dyn MathFunction>, config: DerivativeConfig) -> Self {
        Self {
            name: format!("d/dx {} (numerical)", function.name()),
            function,
            config,
        }
    }
}

impl MathFunction for NumericalDerivative {
    fn evaluate(&self, x: f64) -> f64 {
        central_difference(self.function.as_ref(), x, self.config.step_at(x))
    }

    fn derivative(&self) -> Option<Arc<dyn MathFunction>> {
        let this = NumericalDerivative {
            name: self.name.clone(),
            function: Arc::clone(&self.function),
            config: self.config,
        };
        Some(Arc::new(NumericalDerivative::new(Arc::new(this), self.config)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// `(f(x + h) - f(x - h)) / 2h`
pub(crate) fn central_difference(f: &dyn MathFunction, x: f64, h: f64) -> f64 {
    (f.evaluate(x + h) - f.evaluate(x - h)) / (2.0 * h)
}

// =================================================================================================
// Tests
// =================================================================================================
