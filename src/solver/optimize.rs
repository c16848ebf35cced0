//! Gradient descent
//!
//! # Algorithm
//!
//! ```text
//! x_{k+1} = x_k - η_k ∇f(x_k)
//! ```
//!
//! with `η_k` from the configured [`StepSchedule`](crate::config::StepSchedule).
//! The iteration stops when `‖∇f‖ < tolerance` (converged) or after
//! `max_iterations` (not converged, still returned). A gradient norm above
//! `divergence_factor · max(‖∇f(x₀)‖, 1)`, or a non-finite one, is reported as
//! divergence.

use crate::config::GradientDescentConfig;
use crate::error::{NumericError, Result};
use crate::runtime::{Event, ExecutionContext};
use nalgebra::DVector;

/// Result of [`gradient_descent`]
#[derive(Debug, Clone, PartialEq)]
pub struct GradientDescentResult {
    pub x: DVector<f64>,
    /// `f(x)`
    pub value: f64,
    pub iterations: usize,
    pub gradient_norm: f64,
    /// False when the iteration cap was reached first
    pub converged: bool,
}

/// Minimise `f` from `x0`
///
/// Emits a `progress` event per iteration with `iteration`, `error` (the
/// gradient norm), `value` and `progress_fraction`.
///
/// # Errors
///
/// - `Domain` for a non-positive or non-finite learning rate
/// - `Dimension` when `gradient` returns a vector of the wrong length
/// - `Divergence` when the gradient norm blows up
///
/// # Example
///
/// ```rust
/// use nalgebra::DVector;
/// use numerix::config::GradientDescentConfig;
/// use numerix::runtime::ExecutionContext;
/// use numerix::solver::gradient_descent;
///
/// let f = |x: &DVector<f64>| (x[0] - 3.0).powi(2) + (x[1] + 1.0).powi(2);
/// let grad = |x: &DVector<f64>| DVector::from_vec(vec![2.0 * (x[0] - 3.0), 2.0 * (x[1] + 1.0)]);
///
/// let r = gradient_descent(
///     f,
///     grad,
///     &DVector::zeros(2),
///     0.1,
///     &GradientDescentConfig::default(),
///     &ExecutionContext::detached(),
/// )
/// .unwrap();
/// assert!(r.converged);
/// assert!((r.x[0] - 3.0).abs() < 1e-6);
/// ```
pub fn gradient_descent<F, G>(
    f: F,
    gradient: G,
    x0: &DVector<f64>,
    learning_rate: f64,
    config: &GradientDescentConfig,
    ctx: &ExecutionContext,
) -> Result<GradientDescentResult>
where
    F: Fn(&DVector<f64>) -> f64,
    G: Fn(&DVector<f64>) -> DVector<f64>,
{
    const OP: &str = "gradient_descent";

    config.validate()?;
    if !(learning_rate.is_finite() && learning_rate > 0.0) {
        return Err(NumericError::domain(
            OP,
            format!("learning rate must be positive and finite, got {learning_rate}"),
        ));
    }

    let n = x0.len();
    let eval_gradient = |x: &DVector<f64>| -> Result<DVector<f64>> {
        let g = gradient(x);
        if g.len() != n {
            return Err(NumericError::dimension(
                OP,
                format!("gradient of length {n}"),
                g.len().to_string(),
            ));
        }
        Ok(g)
    };

    let mut x = x0.clone();
    let mut g = eval_gradient(&x)?;
    let initial = g.norm();
    let limit = config.divergence_factor * initial.max(1.0);
    if !initial.is_finite() {
        return Err(NumericError::Divergence {
            operation: OP,
            iteration: 0,
            norm: initial,
            limit,
        });
    }

    let mut norm = initial;
    let mut iterations = 0;
    while norm >= config.tolerance && iterations < config.max_iterations {
        ctx.checkpoint()?;

        let rate = config.schedule.rate(learning_rate, iterations);
        x.axpy(-rate, &g, 1.0);
        g = eval_gradient(&x)?;
        norm = g.norm();
        iterations += 1;

        if !norm.is_finite() || norm > limit {
            log::warn!("{OP} diverged at iteration {iterations}: ‖∇f‖ = {norm:e}");
            return Err(NumericError::Divergence {
                operation: OP,
                iteration: iterations,
                norm,
                limit,
            });
        }

        log::trace!("{OP}: iteration {iterations}, rate {rate:e}, ‖∇f‖ = {norm:e}");
        ctx.emit_with(|| {
            Event::new(Event::PROGRESS)
                .with("iteration", iterations)
                .with("error", norm)
                .with("value", f(&x))
                .with("progress_fraction", iterations as f64 / config.max_iterations as f64)
        });
    }

    let converged = norm < config.tolerance;
    if !converged {
        log::warn!(
            "{OP} reached the iteration cap ({}) with ‖∇f‖ = {norm:e}",
            config.max_iterations
        );
    }

    Ok(GradientDescentResult {
        value: f(&x),
        x,
        iterations,
        gradient_norm: norm,
        converged,
    })
}

/// Central-difference gradient of `f` at `x`, step `h` on every coordinate
pub fn numerical_gradient<F>(f: F, x: &DVector<f64>, h: f64) -> DVector<f64>
where
    F: Fn(&DVector<f64>) -> f64,
{
    let mut probe = x.clone();
    let mut grad = DVector::zeros(x.len());
    for i in 0..x.len() {
        let xi = x[i];
        probe[i] = xi + h;
        let up = f(&probe);
        probe[i] = xi - h;
        let down = f(&probe);
        probe[i] = xi;
        grad[i] = (up - down) / (2.0 * h);
    }
    grad
}
