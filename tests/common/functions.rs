//! Function objects with known integrals, roots and derivatives
//!
//! Each one pairs the numeric evaluation with its closed form so tests can
//! compare solver output against the exact answer.

use numerix::numeric::{FnFunction, MathFunction};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// =================================================================================================
// Gaussian: exp(-x²/2σ²)
// =================================================================================================

/// Unnormalised Gaussian with analytical derivative
pub struct Gaussian {
    pub sigma: f64,
}

impl Gaussian {
    pub fn new(sigma: f64) -> Self {
        Self { sigma }
    }

    /// ∫ over the whole line
    pub fn total_mass(&self) -> f64 {
        self.sigma * (2.0 * std::f64::consts::PI).sqrt()
    }
}

impl MathFunction for Gaussian {
    fn evaluate(&self, x: f64) -> f64 {
        (-x * x / (2.0 * self.sigma * self.sigma)).exp()
    }

    fn derivative(&self) -> Option<Arc<dyn MathFunction>> {
        let s2 = self.sigma * self.sigma;
        Some(Arc::new(FnFunction::new("gaussian'", move |x| {
            -x / s2 * (-x * x / (2.0 * s2)).exp()
        })))
    }

    fn name(&self) -> &str {
        "gaussian"
    }
}

// =================================================================================================
// Oscillator: sin(ωx)
// =================================================================================================

pub struct Oscillator {
    pub omega: f64,
}

impl Oscillator {
    pub fn new(omega: f64) -> Self {
        Self { omega }
    }

    pub fn integral(&self, a: f64, b: f64) -> f64 {
        ((self.omega * a).cos() - (self.omega * b).cos()) / self.omega
    }
}

impl MathFunction for Oscillator {
    fn evaluate(&self, x: f64) -> f64 {
        (self.omega * x).sin()
    }

    fn name(&self) -> &str {
        "oscillator"
    }
}

// =================================================================================================
// SlowFunction: f(x) = 1 with a sleep per call
// =================================================================================================

/// Constant one that sleeps on every evaluation and counts its calls
///
/// Gives cancellation tests a window in which a task is reliably running.
pub struct SlowFunction {
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl SlowFunction {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl MathFunction for SlowFunction {
    fn evaluate(&self, _x: f64) -> f64 {
        self.calls.fetch_add(1, Ordering::Relaxed);
        std::thread::sleep(self.delay);
        1.0
    }

    fn name(&self) -> &str {
        "slow"
    }
}
