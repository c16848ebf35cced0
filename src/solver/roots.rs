//! Root finding
//!
//! - [`newton_raphson`]: `x_{n+1} = x_n - f(x_n) / f'(x_n)`, quadratic near a
//!   simple root, linear near a double root
//! - [`bisection`]: bracketing fallback, one bit per iteration
//!
//! Both stop as soon as `|f(x)| < tolerance`, emit one `convergence` event
//! per iteration (`iteration`, `x`, `error = |f(x)|`) and check for
//! cancellation before every iteration.

use crate::config::{DerivativePolicy, RootConfig};
use crate::error::{NumericError, Result};
use crate::numeric::MathFunction;
use crate::numeric::function::central_difference;
use crate::runtime::{Event, ExecutionContext};

/// Outcome of a successful root search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootResult {
    pub root: f64,
    /// Iterations performed; `0` when the starting point already satisfies
    /// the tolerance
    pub iterations: usize,
    /// `|f(root)|`
    pub residual: f64,
}

/// Newton-Raphson iteration from `x0`
///
/// `f'` comes from the function's analytical derivative or from central
/// differences, as selected by `config.derivative`.
///
/// # Errors
///
/// - `Domain` when `|f'(x_n)| < derivative_epsilon` or the iterate leaves the
///   finite range
/// - `Convergence` after `max_iterations` without `|f(x_n)| < tolerance`
/// - `UnsupportedOperation` when an analytical derivative is required but
///   missing
///
/// # Example
///
/// ```rust
/// use numerix::config::RootConfig;
/// use numerix::numeric::Polynomial;
/// use numerix::runtime::ExecutionContext;
/// use numerix::solver::newton_raphson;
///
/// let p = Polynomial::new(vec![-2.0, 0.0, 1.0]);
/// let r = newton_raphson(&p, 1.0, &RootConfig::default(), &ExecutionContext::detached()).unwrap();
/// assert!((r.root - 2f64.sqrt()).abs() < 1e-9);
/// ```
pub fn newton_raphson(
    f: &dyn MathFunction,
    x0: f64,
    config: &RootConfig,
    ctx: &ExecutionContext,
) -> Result<RootResult> {
    const OP: &str = "newton_raphson";

    config.validate()?;
    if !x0.is_finite() {
        return Err(NumericError::domain(OP, format!("starting point {x0} is not finite")));
    }

    let analytical = match config.derivative.policy {
        DerivativePolicy::NumericalOnly => None,
        _ => f.derivative(),
    };
    if analytical.is_none() && config.derivative.policy == DerivativePolicy::RequireAnalytical {
        return Err(NumericError::UnsupportedOperation {
            operation: OP,
            capability: "derivative",
            function: f.name().to_string(),
        });
    }
    let slope = |x: f64| match &analytical {
        Some(df) => df.evaluate(x),
        None => central_difference(f, x, config.derivative.step_at(x)),
    };

    let mut x = x0;
    let mut fx = f.evaluate(x);
    if fx.abs() < config.tolerance {
        return Ok(RootResult {
            root: x,
            iterations: 0,
            residual: fx.abs(),
        });
    }

    for iteration in 1..=config.max_iterations {
        ctx.checkpoint()?;

        let d = slope(x);
        if d.is_nan() || d.abs() < config.derivative_epsilon {
            return Err(NumericError::domain(
                OP,
                format!("derivative {d:e} vanishes at x = {x} (iteration {iteration})"),
            ));
        }

        x -= fx / d;
        fx = f.evaluate(x);
        let error = fx.abs();
        if !x.is_finite() || !error.is_finite() {
            return Err(NumericError::domain(
                OP,
                format!("iterate left the finite range at iteration {iteration}"),
            ));
        }

        log::trace!("{OP} `{}`: iteration {iteration}, x = {x}, |f(x)| = {error:e}", f.name());
        ctx.emit_with(|| {
            Event::new(Event::CONVERGENCE)
                .with("iteration", iteration)
                .with("x", x)
                .with("error", error)
        });

        if error < config.tolerance {
            log::debug!("{OP} `{}` converged in {iteration} iterations", f.name());
            return Ok(RootResult {
                root: x,
                iterations: iteration,
                residual: error,
            });
        }
    }

    Err(NumericError::Convergence {
        operation: OP,
        iterations: config.max_iterations,
        last_error: fx.abs(),
        tolerance: config.tolerance,
    })
}

/// Bisection on a sign-changing bracket
///
/// The bounds may be given in either order.
///
/// # Errors
///
/// `Domain` when `f(a)` and `f(b)` have the same sign, `Convergence` when
/// `max_iterations` halvings do not reach the tolerance.
pub fn bisection(
    f: &dyn MathFunction,
    a: f64,
    b: f64,
    config: &RootConfig,
    ctx: &ExecutionContext,
) -> Result<RootResult> {
    const OP: &str = "bisection";

    config.validate()?;
    let (mut lo, mut hi) = if a <= b { (a, b) } else { (b, a) };
    let mut f_lo = f.evaluate(lo);
    let f_hi = f.evaluate(hi);

    for (x, fx) in [(lo, f_lo), (hi, f_hi)] {
        if fx.abs() < config.tolerance {
            return Ok(RootResult {
                root: x,
                iterations: 0,
                residual: fx.abs(),
            });
        }
    }
    let product = f_lo * f_hi;
    if product.is_nan() || product > 0.0 {
        return Err(NumericError::domain(
            OP,
            format!("f({lo}) = {f_lo} and f({hi}) = {f_hi} do not bracket a root"),
        ));
    }

    let mut mid = lo;
    let mut f_mid = f_lo;
    for iteration in 1..=config.max_iterations {
        ctx.checkpoint()?;

        mid = lo + 0.5 * (hi - lo);
        f_mid = f.evaluate(mid);
        let error = f_mid.abs();
        ctx.emit_with(|| {
            Event::new(Event::CONVERGENCE)
                .with("iteration", iteration)
                .with("x", mid)
                .with("error", error)
        });

        if error < config.tolerance {
            return Ok(RootResult {
                root: mid,
                iterations: iteration,
                residual: error,
            });
        }
        if f_lo * f_mid < 0.0 {
            hi = mid;
        } else {
            lo = mid;
            f_lo = f_mid;
        }
    }

    log::warn!("{OP} stopped at x = {mid} with |f(x)| = {:e}", f_mid.abs());
    Err(NumericError::Convergence {
        operation: OP,
        iterations: config.max_iterations,
        last_error: f_mid.abs(),
        tolerance: config.tolerance,
    })
}
