//! Differentiation and adaptive quadrature
//!
//! # Mathematical Background
//!
//! Numerical derivatives use the central difference
//!
//! ```text
//! f'(x) ≈ (f(x + h) - f(x - h)) / 2h,      h = ∛ε · max(|x|, 1)
//! ```
//!
//! whose truncation error is O(h²); the cube-root step balances it against
//! round-off.
//!
//! Integration uses adaptive Simpson's rule. On `[a, b]` with midpoint `m`
//! the whole-interval estimate `S` is compared with the two half estimates
//! `S₂ = S(a, m) + S(m, b)`:
//!
//! ```text
//! |S₂ - S| ≤ 15 ε   → accept S₂ + (S₂ - S) / 15   (Richardson correction)
//! otherwise         → recurse on both halves with ε / 2
//! ```
//!
//! # Characteristics
//!
//! - **Order**: exact for cubics, O(h⁴) locally otherwise
//! - **Failure**: `ConvergenceError` when any branch needs more than
//!   `max_depth` bisections
//! - **Cancellation**: checked before every subdivision

use crate::config::{DerivativeConfig, DerivativePolicy, IntegrationConfig};
use crate::error::{NumericError, Result};
use crate::numeric::MathFunction;
use crate::numeric::function::central_difference;
use crate::runtime::ExecutionContext;

// =================================================================================================
// Derivative
// =================================================================================================

/// Derivative of `f` at `x`
///
/// With [`DerivativePolicy::PreferAnalytical`] the function's own derivative
/// is used when it has one and central differences otherwise.
///
/// # Errors
///
/// `UnsupportedOperation` under [`DerivativePolicy::RequireAnalytical`] when
/// `f` has no analytical derivative.
///
/// # Example
///
/// ```rust
/// use numerix::config::DerivativeConfig;
/// use numerix::numeric::FnFunction;
/// use numerix::solver::derivative;
///
/// let f = FnFunction::new("cube", |x| x * x * x);
/// let d = derivative(&f, 2.0, &DerivativeConfig::default()).unwrap();
/// assert!((d - 12.0).abs() < 1e-6);
/// ```
pub fn derivative(f: &dyn MathFunction, x: f64, config: &DerivativeConfig) -> Result<f64> {
    config.validate()?;
    if !x.is_finite() {
        return Err(NumericError::domain("derivative", format!("x = {x} is not finite")));
    }

    let analytical = match config.policy {
        DerivativePolicy::NumericalOnly => None,
        DerivativePolicy::PreferAnalytical | DerivativePolicy::RequireAnalytical => f.derivative(),
    };

    match (analytical, config.policy) {
        (Some(df), _) => Ok(df.evaluate(x)),
        (None, DerivativePolicy::RequireAnalytical) => Err(NumericError::UnsupportedOperation {
            operation: "derivative",
            capability: "derivative",
            function: f.name().to_string(),
        }),
        (None, _) => {
            let h = config.step_at(x);
            log::trace!("derivative of `{}`: central difference with h = {h:e}", f.name());
            Ok(central_difference(f, x, h))
        }
    }
}

// =================================================================================================
// Adaptive Simpson
// =================================================================================================

/// Definite integral of `f` over `[a, b]`
///
/// `a == b` gives `0`; `a > b` gives the negated integral over `[b, a]`.
///
/// # Errors
///
/// - `Domain` for non-finite bounds
/// - `Convergence` when the subdivision depth exceeds `config.max_depth`
/// - `Cancelled` when the context's token is cancelled
///
/// # Example
///
/// ```rust
/// use numerix::config::IntegrationConfig;
/// use numerix::numeric::Polynomial;
/// use numerix::runtime::ExecutionContext;
/// use numerix::solver::integrate;
///
/// let p = Polynomial::new(vec![1.0, -2.0, 1.0]);
/// let area = integrate(&p, 0.0, 1.0, &IntegrationConfig::default(), &ExecutionContext::detached())
///     .unwrap();
/// assert!((area - 1.0 / 3.0).abs() < 1e-10);
/// ```
pub fn integrate(
    f: &dyn MathFunction,
    a: f64,
    b: f64,
    config: &IntegrationConfig,
    ctx: &ExecutionContext,
) -> Result<f64> {
    config.validate()?;
    if !a.is_finite() || !b.is_finite() {
        return Err(NumericError::domain(
            "integrate",
            format!("bounds [{a}, {b}] are not finite"),
        ));
    }
    if a == b {
        return Ok(0.0);
    }
    if a > b {
        return integrate(f, b, a, config, ctx).map(|v| -v);
    }

    let m = 0.5 * (a + b);
    let (fa, fm, fb) = (f.evaluate(a), f.evaluate(m), f.evaluate(b));
    let whole = simpson(a, b, fa, fm, fb);

    let mut run = Simpson {
        f,
        max_depth: config.max_depth,
        ctx,
        evaluations: 3,
        deepest: 0,
    };
    let value = run.refine(Panel { a, b, fa, fm, fb, whole }, config.tolerance, 0)?;

    log::debug!(
        "integrate `{}` over [{a}, {b}]: {} evaluations, depth {}",
        f.name(),
        run.evaluations,
        run.deepest
    );
    Ok(value)
}

#[inline]
fn simpson(a: f64, b: f64, fa: f64, fm: f64, fb: f64) -> f64 {
    (b - a) / 6.0 * (fa + 4.0 * fm + fb)
}

/// One interval with its cached samples and Simpson estimate
#[derive(Clone, Copy)]
struct Panel {
    a: f64,
    b: f64,
    fa: f64,
    fm: f64,
    fb: f64,
    whole: f64,
}

struct Simpson<'a> {
    f: &'a dyn MathFunction,
    max_depth: usize,
    ctx: &'a ExecutionContext,
    evaluations: usize,
    deepest: usize,
}

impl Simpson<'_> {
    fn refine(&mut self, p: Panel, tolerance: f64, depth: usize) -> Result<f64> {
        self.ctx.checkpoint()?;
        self.deepest = self.deepest.max(depth);

        let m = 0.5 * (p.a + p.b);
        let (lm, rm) = (0.5 * (p.a + m), 0.5 * (m + p.b));
        let (flm, frm) = (self.f.evaluate(lm), self.f.evaluate(rm));
        self.evaluations += 2;

        let left = Panel {
            a: p.a,
            b: m,
            fa: p.fa,
            fm: flm,
            fb: p.fm,
            whole: simpson(p.a, m, p.fa, flm, p.fm),
        };
        let right = Panel {
            a: m,
            b: p.b,
            fa: p.fm,
            fm: frm,
            fb: p.fb,
            whole: simpson(m, p.b, p.fm, frm, p.fb),
        };

        let delta = left.whole + right.whole - p.whole;
        if delta.abs() <= 15.0 * tolerance {
            return Ok(left.whole + right.whole + delta / 15.0);
        }
        if depth >= self.max_depth {
            log::debug!(
                "integrate: depth {depth} exhausted on [{}, {}] with error {:e}",
                p.a,
                p.b,
                delta.abs() / 15.0
            );
            return Err(NumericError::Convergence {
                operation: "integrate",
                iterations: depth,
                last_error: delta.abs() / 15.0,
                tolerance,
            });
        }

        let half = 0.5 * tolerance;
        Ok(self.refine(left, half, depth + 1)? + self.refine(right, half, depth + 1)?)
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::{FnFunction, Polynomial};
    use crate::runtime::CancellationToken;
    use approx::assert_relative_eq;

    fn ctx() -> ExecutionContext {
        ExecutionContext::detached()
    }

    #[test]
    fn test_analytical_derivative_preferred() {
        let f = FnFunction::new("sin", f64::sin).with_derivative(|_| 42.0);
        let d = derivative(&f, 1.0, &DerivativeConfig::default()).unwrap();
        assert_eq!(d, 42.0);

        let numerical = DerivativeConfig::default().policy(DerivativePolicy::NumericalOnly);
        let d = derivative(&f, 1.0, &numerical).unwrap();
        assert_relative_eq!(d, 1.0_f64.cos(), epsilon = 1e-8);
    }

    #[test]
    fn test_require_analytical() {
        let f = FnFunction::new("exp", f64::exp);
        let config = DerivativeConfig::default().policy(DerivativePolicy::RequireAnalytical);
        match derivative(&f, 0.0, &config) {
            Err(NumericError::UnsupportedOperation { function, .. }) => assert_eq!(function, "exp"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_numerical_matches_polynomial() {
        let p = Polynomial::new(vec![0.5, -3.0, 0.0, 2.0]);
        let exact = p.derivative();
        let numerical = DerivativeConfig::default().policy(DerivativePolicy::NumericalOnly);
        for x in [-2.0, -0.3, 0.0, 1.7, 40.0] {
            let d = derivative(&p, x, &numerical).unwrap();
            assert_relative_eq!(d, exact.evaluate(x), max_relative = 1e-7, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_integrate_quadratic() {
        let p = Polynomial::new(vec![1.0, -2.0, 1.0]);
        let v = integrate(&p, 0.0, 1.0, &IntegrationConfig::default(), &ctx()).unwrap();
        assert_relative_eq!(v, 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_integrate_sine() {
        let f = FnFunction::new("sin", f64::sin);
        let v = integrate(&f, 0.0, std::f64::consts::PI, &IntegrationConfig::default(), &ctx())
            .unwrap();
        assert_relative_eq!(v, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_integrate_reversed_and_empty() {
        let f = FnFunction::new("exp", f64::exp);
        let cfg = IntegrationConfig::default();
        let forward = integrate(&f, 0.0, 1.0, &cfg, &ctx()).unwrap();
        let backward = integrate(&f, 1.0, 0.0, &cfg, &ctx()).unwrap();
        assert_relative_eq!(forward, std::f64::consts::E - 1.0, epsilon = 1e-9);
        assert_eq!(backward, -forward);
        assert_eq!(integrate(&f, 2.0, 2.0, &cfg, &ctx()).unwrap(), 0.0);
    }

    #[test]
    fn test_integrate_depth_exhausted() {
        let f = FnFunction::new("wiggle", |x| (50.0 * x).sin());
        let err = integrate(&f, 0.0, 10.0, &IntegrationConfig::new(1e-12, 3), &ctx()).unwrap_err();
        assert_eq!(err.kind(), "ConvergenceError");
    }

    #[test]
    fn test_integrate_observes_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = ExecutionContext::detached().with_token(token);
        let f = FnFunction::new("wiggle", |x| (50.0 * x).sin());
        let err = integrate(&f, 0.0, 10.0, &IntegrationConfig::default(), &ctx).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_non_finite_bounds() {
        let f = FnFunction::new("one", |_| 1.0);
        let err = integrate(&f, 0.0, f64::INFINITY, &IntegrationConfig::default(), &ctx());
        assert_eq!(err.unwrap_err().kind(), "DomainError");
    }
}
