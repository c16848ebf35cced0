//! Numerical solvers
//!
//! Iterative and adaptive algorithms over [`MathFunction`](crate::numeric::MathFunction)
//! objects and `nalgebra` vectors.
//!
//! # Core Concepts
//!
//! Every solver is a free function taking
//!
//! 1. **The problem** - a function object (or closures for vector problems)
//!    and its domain
//! 2. **A configuration** - tolerances, iteration caps and seeds from
//!    [`crate::config`]; nothing is read from global state except the
//!    parallel threshold below
//! 3. **An [`ExecutionContext`](crate::runtime::ExecutionContext)** - where
//!    progress events go and which cancellation token to observe
//!
//! The same function therefore runs inline (`ExecutionContext::detached()`)
//! or as a scheduled task (the scheduler builds the context), with no change
//! to the numerics.
//!
//! # Module Organization
//!
//! - **`calculus`**: [`derivative`], adaptive Simpson [`integrate`]
//! - **`roots`**: [`newton_raphson`], [`bisection`]
//! - **`optimize`**: [`gradient_descent`], [`numerical_gradient`]
//! - **`monte_carlo`**: [`monte_carlo_integrate`]
//! - **`clustering`**: [`kmeans`]
//!
//! # Workflow Diagram
//!
//! ```text
//! ┌─────────────────┐   ┌──────────────────┐
//! │ MathFunction    │   │ *Config          │
//! │ (what to solve) │   │ (how to iterate) │
//! └────────┬────────┘   └────────┬─────────┘
//!          └──────────┬──────────┘
//!            ┌────────▼────────┐        ┌──────────────────┐
//!            │ solver function │ ─────► │ events on the bus│
//!            └────────┬────────┘        └──────────────────┘
//!                     │  checkpoint() each iteration
//!            ┌────────▼────────┐
//!            │ Result<_>       │
//!            └─────────────────┘
//! ```
//!
//! # Error Handling
//!
//! All solvers return [`crate::error::Result`]:
//!
//! ```rust
//! use numerix::config::RootConfig;
//! use numerix::error::NumericError;
//! use numerix::numeric::Polynomial;
//! use numerix::runtime::ExecutionContext;
//! use numerix::solver::newton_raphson;
//!
//! // x² + 1 has a horizontal tangent at 0
//! let p = Polynomial::new(vec![1.0, 0.0, 1.0]);
//! match newton_raphson(&p, 0.0, &RootConfig::default(), &ExecutionContext::detached()) {
//!     Err(NumericError::Domain { operation, .. }) => assert_eq!(operation, "newton_raphson"),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```
//!
//! Common errors:
//! - Invalid configuration (zero iterations, non-positive tolerance)
//! - Domain errors (vanishing derivative, no sign change, zero samples)
//! - Convergence failure (iteration or depth budget exhausted)
//! - Divergence (gradient norm blow-up)
//! - Cancellation (token set while running)

// =================================================================================================
// Module Declarations
// =================================================================================================
mod calculus;
mod clustering;
mod monte_carlo;
mod optimize;
mod roots;

// =================================================================================================
// Parallel Execution Threshold
// =================================================================================================
//
// Deciding *when* an inner loop hands work to Rayon is an execution concern
// shared by the matrix product, Monte Carlo batches and k-means assignment.
// It lives here rather than on each call's configuration so that benchmarks
// can move the crossover for the whole crate at once.
//
// The threshold is stored in an AtomicUsize so that it can be changed at
// runtime (useful in benchmarks and tests) without a mutex on every inner
// loop. Relaxed ordering is sufficient: the value is a performance hint, not
// a synchronisation point. Results never depend on it.
// =================================================================================================

use std::sync::atomic::{AtomicUsize, Ordering};

/// Default number of elements above which data-parallel inner loops switch
/// to rayon.
///
/// Loops over more than 999 elements go parallel (the comparison is strict,
/// so 1 000 is the first parallel size). Smaller loops stay sequential, where
/// Rayon's dispatch costs more than a multiply-add or a function evaluation.
const DEFAULT_PARALLEL_THRESHOLD: usize = 999;

/// Runtime-configurable parallel-execution threshold.
///
/// Read via [`parallel_threshold()`], written via [`set_parallel_threshold()`].
static PARALLEL_THRESHOLD: AtomicUsize = AtomicUsize::new(DEFAULT_PARALLEL_THRESHOLD);

/// Return the current parallel-execution threshold.
///
/// Inner loops run sequentially when they have at most this many elements
/// and switch to Rayon above it, but only when the crate is compiled with
/// the `parallel` feature.
///
/// # Example
///
/// ```rust
/// use numerix::solver::parallel_threshold;
///
/// assert!(parallel_threshold() > 0);
/// ```
pub fn parallel_threshold() -> usize {
    PARALLEL_THRESHOLD.load(Ordering::Relaxed)
}

/// Set the parallel-execution threshold to a new value.
///
/// # Panics
///
/// Panics when `threshold == 0`.
///
/// # Example
///
/// ```rust
/// use numerix::solver::{parallel_threshold, set_parallel_threshold};
///
/// let previous = parallel_threshold();
/// set_parallel_threshold(2048);
/// assert_eq!(parallel_threshold(), 2048);
///
/// // Restore so other tests are not affected.
/// set_parallel_threshold(previous);
/// ```
pub fn set_parallel_threshold(threshold: usize) {
    assert!(threshold > 0, "parallel threshold must be at least 1");
    PARALLEL_THRESHOLD.store(threshold, Ordering::Relaxed);
}

/// RAII guard that saves the current threshold on construction and restores
/// it on drop.
///
/// Only compiled in test builds. Guards serialise on a re-entrant lock so
/// that concurrently running tests never observe each other's value.
///
/// ```rust,ignore
/// let _guard = crate::solver::ThresholdGuard::save(50);
/// // threshold is now 50 …
/// // … and is automatically restored when _guard is dropped.
/// ```
#[cfg(test)]
pub(crate) struct ThresholdGuard {
    previous: usize,
    _lock: parking_lot::ReentrantMutexGuard<'static, ()>,
}

#[cfg(test)]
static THRESHOLD_LOCK: parking_lot::ReentrantMutex<()> = parking_lot::ReentrantMutex::new(());

#[cfg(test)]
impl ThresholdGuard {
    /// Set the threshold to `new_value` and return a guard that will
    /// restore the previous value on drop.
    pub(crate) fn save(new_value: usize) -> Self {
        let lock = THRESHOLD_LOCK.lock();
        let previous = parallel_threshold();
        set_parallel_threshold(new_value);
        Self {
            previous,
            _lock: lock,
        }
    }
}

#[cfg(test)]
impl Drop for ThresholdGuard {
    fn drop(&mut self) {
        // Bypass the public setter so that restoring never panics.
        PARALLEL_THRESHOLD.store(self.previous, Ordering::Relaxed);
    }
}

// =================================================================================================
// Public Re-exports
// =================================================================================================

pub use calculus::{derivative, integrate};
pub use clustering::{KMeansResult, kmeans};
pub use monte_carlo::{MonteCarloEstimate, monte_carlo_integrate};
pub use optimize::{GradientDescentResult, gradient_descent, numerical_gradient};
pub use roots::{RootResult, bisection, newton_raphson};

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold_value() {
        assert_eq!(DEFAULT_PARALLEL_THRESHOLD, 999);
    }

    #[test]
    fn test_get_and_set_threshold() {
        let _guard = ThresholdGuard::save(500);
        assert_eq!(parallel_threshold(), 500);
    }

    #[test]
    #[should_panic(expected = "parallel threshold must be at least 1")]
    fn test_zero_threshold_panics() {
        set_parallel_threshold(0);
    }

    #[test]
    fn test_threshold_guard_restores_previous_value() {
        let _outer = ThresholdGuard::save(7);
        {
            let _guard = ThresholdGuard::save(42);
            assert_eq!(parallel_threshold(), 42);
        }
        // Inner guard dropped, value must be back to the outer one.
        assert_eq!(parallel_threshold(), 7);
    }

    #[test]
    fn test_threshold_is_visible_across_threads() {
        use std::thread;

        let _guard = ThresholdGuard::save(1234);

        let handles: Vec<_> = (0..8)
            .map(|_| thread::spawn(parallel_threshold))
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1234);
        }
    }
}
