//! Monte Carlo integration
//!
//! ```text
//! ∫_a^b f ≈ (b - a) · mean(f(x_i)),    x_i ~ U[a, b)
//! σ_est  = |b - a| · s / √N
//! ```
//!
//! where `s` is the sample standard deviation. Samples come from a
//! `StdRng` seeded from [`MonteCarloConfig::seed`], so the same seed always
//! gives the same estimate. Work is done in batches of
//! [`MonteCarloConfig::batch_size`] with a cancellation checkpoint and a
//! `progress` event per batch. Within a batch the points are drawn
//! sequentially and, above the parallel threshold, evaluated with rayon;
//! accumulation is always sequential, so the result does not depend on the
//! thread count.

use crate::config::MonteCarloConfig;
use crate::error::{NumericError, Result};
use crate::numeric::MathFunction;
use crate::runtime::{Event, ExecutionContext};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Estimate with its standard error
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonteCarloEstimate {
    pub estimate: f64,
    pub standard_error: f64,
    pub samples: usize,
}

/// Integrate `f` over `[a, b]` from `samples` uniform draws
///
/// `a > b` gives the negated estimate; `a == b` gives `0` with zero error.
///
/// # Errors
///
/// `Domain` when `samples == 0` or a bound is not finite.
///
/// # Example
///
/// ```rust
/// use numerix::config::MonteCarloConfig;
/// use numerix::numeric::FnFunction;
/// use numerix::runtime::ExecutionContext;
/// use numerix::solver::monte_carlo_integrate;
///
/// let f = FnFunction::new("x", |x| x);
/// let est = monte_carlo_integrate(&f, 0.0, 2.0, 100_000, &MonteCarloConfig::seeded(7), &ExecutionContext::detached())
///     .unwrap();
/// assert!((est.estimate - 2.0).abs() < 5.0 * est.standard_error);
/// ```
pub fn monte_carlo_integrate(
    f: &dyn MathFunction,
    a: f64,
    b: f64,
    samples: usize,
    config: &MonteCarloConfig,
    ctx: &ExecutionContext,
) -> Result<MonteCarloEstimate> {
    const OP: &str = "monte_carlo_integrate";

    config.validate()?;
    if samples == 0 {
        return Err(NumericError::domain(OP, "at least one sample is required"));
    }
    if !a.is_finite() || !b.is_finite() {
        return Err(NumericError::domain(OP, format!("bounds [{a}, {b}] are not finite")));
    }
    if a == b {
        return Ok(MonteCarloEstimate {
            estimate: 0.0,
            standard_error: 0.0,
            samples,
        });
    }

    let (lo, width) = if a < b { (a, b - a) } else { (b, a - b) };
    let sign = if a < b { 1.0 } else { -1.0 };
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut stats = Welford::default();
    let mut points = Vec::with_capacity(config.batch_size.min(samples));
    let mut values = Vec::with_capacity(points.capacity());
    let batches = samples.div_ceil(config.batch_size);

    for batch in 0..batches {
        ctx.checkpoint()?;

        let count = config.batch_size.min(samples - stats.count);
        points.clear();
        points.extend((0..count).map(|_| lo + width * rng.gen_range(0.0..1.0)));
        evaluate_batch(f, &points, &mut values);
        for v in &values {
            stats.push(*v);
        }

        ctx.emit_with(|| {
            Event::new(Event::PROGRESS)
                .with("iteration", batch + 1)
                .with("samples", stats.count)
                .with("progress_fraction", stats.count as f64 / samples as f64)
        });
    }

    let estimate = sign * width * stats.mean;
    let standard_error = width * (stats.sample_variance() / stats.count as f64).sqrt();
    log::debug!(
        "{OP} `{}`: {samples} samples, estimate {estimate} ± {standard_error:e}",
        f.name()
    );

    Ok(MonteCarloEstimate {
        estimate,
        standard_error,
        samples,
    })
}

fn evaluate_batch(f: &dyn MathFunction, points: &[f64], values: &mut Vec<f64>) {
    values.clear();
    if points.len() > crate::solver::parallel_threshold() {
        #[cfg(feature = "parallel")]
        points.par_iter().map(|x| f.evaluate(*x)).collect_into_vec(values);
        #[cfg(not(feature = "parallel"))]
        values.extend(points.iter().map(|x| f.evaluate(*x)));
    } else {
        values.extend(points.iter().map(|x| f.evaluate(*x)));
    }
}

/// Running mean and variance
#[derive(Debug, Default)]
struct Welford {
    count: usize,
    mean: f64,
    m2: f64,
}

impl Welford {
    fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    fn sample_variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::FnFunction;
    use crate::runtime::CancellationToken;

    fn ctx() -> ExecutionContext {
        ExecutionContext::detached()
    }

    #[test]
    fn test_estimate_within_error_bars() {
        let f = FnFunction::new("x^2", |x| x * x);
        let est = monte_carlo_integrate(&f, 0.0, 3.0, 200_000, &MonteCarloConfig::default(), &ctx())
            .unwrap();
        assert_eq!(est.samples, 200_000);
        assert!(est.standard_error > 0.0);
        assert!((est.estimate - 9.0).abs() < 5.0 * est.standard_error);
    }

    #[test]
    fn test_same_seed_same_estimate() {
        let f = FnFunction::new("sin", f64::sin);
        let cfg = MonteCarloConfig::seeded(1234);
        let first = monte_carlo_integrate(&f, 0.0, 1.0, 10_000, &cfg, &ctx()).unwrap();
        let second = monte_carlo_integrate(&f, 0.0, 1.0, 10_000, &cfg, &ctx()).unwrap();
        assert_eq!(first, second);

        let other = monte_carlo_integrate(&f, 0.0, 1.0, 10_000, &MonteCarloConfig::seeded(99), &ctx())
            .unwrap();
        assert_ne!(first.estimate, other.estimate);
    }

    #[test]
    fn test_parallel_path_is_deterministic() {
        let _guard = crate::solver::ThresholdGuard::save(16);
        let f = FnFunction::new("exp", f64::exp);
        let cfg = MonteCarloConfig::seeded(5);
        let parallel = monte_carlo_integrate(&f, 0.0, 1.0, 5_000, &cfg, &ctx()).unwrap();
        drop(_guard);
        let _guard = crate::solver::ThresholdGuard::save(usize::MAX);
        let sequential = monte_carlo_integrate(&f, 0.0, 1.0, 5_000, &cfg, &ctx()).unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_constant_has_zero_error() {
        let f = FnFunction::new("two", |_| 2.0);
        let est = monte_carlo_integrate(&f, 1.0, -1.0, 1000, &MonteCarloConfig::default(), &ctx())
            .unwrap();
        assert!((est.estimate + 4.0).abs() < 1e-12);
        assert!(est.standard_error < 1e-12);
    }

    #[test]
    fn test_zero_samples() {
        let f = FnFunction::new("one", |_| 1.0);
        let err = monte_carlo_integrate(&f, 0.0, 1.0, 0, &MonteCarloConfig::default(), &ctx())
            .unwrap_err();
        assert_eq!(err.kind(), "DomainError");
    }

    #[test]
    fn test_cancelled_between_batches() {
        let token = CancellationToken::new();
        token.cancel();
        let f = FnFunction::new("one", |_| 1.0);
        let err = monte_carlo_integrate(
            &f,
            0.0,
            1.0,
            10,
            &MonteCarloConfig::default(),
            &ExecutionContext::detached().with_token(token),
        )
        .unwrap_err();
        assert!(err.is_cancelled());
    }
}
