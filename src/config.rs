//! Numerical configuration
//!
//! Every tolerance, iteration cap, crossover threshold and random seed used by
//! the crate lives in one of the structures below. Algorithms receive their
//! configuration explicitly; there are no tolerance literals at call sites.
//!
//! # Design
//!
//! Each structure follows the same pattern:
//! - `Default` gives the documented defaults
//! - named constructors for the common cases
//! - builder-style setters (`with_*`) for tweaking one field
//! - `validate()` rejects meaningless values before any work starts
//!
//! [`NumericConfig`] bundles one of each for callers that want to carry a
//! single object around.
//!
//! # Example
//!
//! ```rust
//! use numerix::config::{IntegrationConfig, RootConfig};
//!
//! let integration = IntegrationConfig::new(1e-12, 60);
//! integration.validate().unwrap();
//!
//! let roots = RootConfig::default().with_max_iterations(200);
//! assert_eq!(roots.max_iterations, 200);
//! ```

use crate::error::{NumericError, Result};

fn positive(name: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(NumericError::config(format!(
            "{name} must be a positive finite number, got {value}"
        )));
    }
    Ok(())
}

fn non_zero(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(NumericError::config(format!("{name} must be greater than 0")));
    }
    Ok(())
}

// =================================================================================================
// Linear algebra
// =================================================================================================

/// Tolerances for the linear algebra engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinalgConfig {
    /// A matrix is singular when some LU pivot is smaller than
    /// `singular_epsilon` times the largest pivot.
    pub singular_epsilon: f64,

    /// Relative size below which a subdiagonal entry is treated as zero
    /// during QR iteration.
    pub eigen_tolerance: f64,

    /// QR iterations allowed before `eigenvalues` gives up.
    pub max_eigen_iterations: usize,
}

impl Default for LinalgConfig {
    fn default() -> Self {
        Self {
            singular_epsilon: 1e-12,
            eigen_tolerance: 1e-12,
            max_eigen_iterations: 1000,
        }
    }
}

impl LinalgConfig {
    /// Builder pattern: set the singularity threshold
    pub fn with_singular_epsilon(mut self, epsilon: f64) -> Self {
        self.singular_epsilon = epsilon;
        self
    }

    /// Builder pattern: set the eigenvalue iteration budget
    pub fn with_max_eigen_iterations(mut self, iterations: usize) -> Self {
        self.max_eigen_iterations = iterations;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        positive("singular_epsilon", self.singular_epsilon)?;
        positive("eigen_tolerance", self.eigen_tolerance)?;
        non_zero("max_eigen_iterations", self.max_eigen_iterations)
    }
}

// =================================================================================================
// Transforms
// =================================================================================================

/// Tuning for the transform engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformConfig {
    /// `convolution` uses the direct O(n·m) sum when `a.len() * b.len()` is
    /// at most this value and the FFT path above it.
    pub convolution_crossover: usize,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            convolution_crossover: 4096,
        }
    }
}

impl TransformConfig {
    /// Builder pattern: set the direct/FFT crossover
    pub fn with_crossover(mut self, crossover: usize) -> Self {
        self.convolution_crossover = crossover;
        self
    }
}

// =================================================================================================
// Differentiation and integration
// =================================================================================================

/// How `derivative` chooses between the analytical capability and finite
/// differences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DerivativePolicy {
    /// Use `f.derivative()` when present, central differences otherwise.
    #[default]
    PreferAnalytical,

    /// Fail with `UnsupportedOperation` when `f.derivative()` is absent.
    RequireAnalytical,

    /// Always use central differences.
    NumericalOnly,
}

/// Configuration for numerical differentiation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivativeConfig {
    /// Finite-difference step. `None` scales the step to the magnitude of `x`:
    /// `h = cbrt(ε) * max(|x|, 1)`.
    pub step: Option<f64>,

    /// Analytical vs numerical selection.
    pub policy: DerivativePolicy,
}

impl DerivativeConfig {
    /// Create a configuration with a fixed finite-difference step
    pub fn with_step(step: f64) -> Self {
        Self {
            step: Some(step),
            ..Default::default()
        }
    }

    /// Builder pattern: set the policy
    pub fn policy(mut self, policy: DerivativePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Step actually used at `x`.
    pub fn step_at(&self, x: f64) -> f64 {
        self.step
            .unwrap_or_else(|| f64::EPSILON.cbrt() * x.abs().max(1.0))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(step) = self.step {
            positive("derivative step", step)?;
        }
        Ok(())
    }
}

/// Configuration for adaptive Simpson integration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationConfig {
    /// Absolute error target over the whole interval.
    pub tolerance: f64,

    /// Maximum bisection depth of any sub-interval.
    pub max_depth: usize,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_depth: 50,
        }
    }
}

impl IntegrationConfig {
    /// Create an integration configuration
    pub fn new(tolerance: f64, max_depth: usize) -> Self {
        Self {
            tolerance,
            max_depth,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        positive("integration tolerance", self.tolerance)?;
        non_zero("max_depth", self.max_depth)
    }
}

// =================================================================================================
// Root finding
// =================================================================================================

/// Configuration for Newton-Raphson and bisection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootConfig {
    /// Success when `|f(x)| < tolerance`.
    pub tolerance: f64,

    /// Iteration cap.
    pub max_iterations: usize,

    /// `|f'(x)|` below this value is a vanishing derivative.
    pub derivative_epsilon: f64,

    /// How `f'` is obtained.
    pub derivative: DerivativeConfig,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 100,
            derivative_epsilon: 1e-12,
            derivative: DerivativeConfig::default(),
        }
    }
}

impl RootConfig {
    /// Create an iterative configuration
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
            ..Default::default()
        }
    }

    /// Builder pattern: set the iteration cap
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Builder pattern: set the derivative configuration
    pub fn with_derivative(mut self, derivative: DerivativeConfig) -> Self {
        self.derivative = derivative;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        positive("root tolerance", self.tolerance)?;
        non_zero("max_iterations", self.max_iterations)?;
        positive("derivative_epsilon", self.derivative_epsilon)?;
        self.derivative.validate()
    }
}

// =================================================================================================
// Gradient descent
// =================================================================================================

/// Learning-rate schedule for gradient descent.
///
/// With base rate `η₀` and iteration `k`:
///
/// ```text
/// Fixed                 η_k = η₀
/// InverseTime { d }     η_k = η₀ / (1 + d·k)
/// Exponential { d }     η_k = η₀ · exp(-d·k)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum StepSchedule {
    #[default]
    Fixed,
    InverseTime { decay: f64 },
    Exponential { decay: f64 },
}

impl StepSchedule {
    /// Learning rate at iteration `k`.
    pub fn rate(&self, base: f64, k: usize) -> f64 {
        match *self {
            StepSchedule::Fixed => base,
            StepSchedule::InverseTime { decay } => base / (1.0 + decay * k as f64),
            StepSchedule::Exponential { decay } => base * (-decay * k as f64).exp(),
        }
    }
}

/// Configuration for gradient descent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientDescentConfig {
    /// Step schedule applied to the base learning rate.
    pub schedule: StepSchedule,

    /// Success when `‖∇f‖ < tolerance`.
    pub tolerance: f64,

    /// Iteration cap; reaching it returns a non-converged result.
    pub max_iterations: usize,

    /// Divergence when `‖∇f‖ > divergence_factor * max(‖∇f(x₀)‖, 1)`.
    pub divergence_factor: f64,
}

impl Default for GradientDescentConfig {
    fn default() -> Self {
        Self {
            schedule: StepSchedule::Fixed,
            tolerance: 1e-8,
            max_iterations: 10_000,
            divergence_factor: 1e6,
        }
    }
}

impl GradientDescentConfig {
    /// Builder pattern: set the step schedule
    pub fn with_schedule(mut self, schedule: StepSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Builder pattern: set the iteration cap
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        positive("gradient tolerance", self.tolerance)?;
        non_zero("max_iterations", self.max_iterations)?;
        positive("divergence_factor", self.divergence_factor)?;
        match self.schedule {
            StepSchedule::Fixed => Ok(()),
            StepSchedule::InverseTime { decay } | StepSchedule::Exponential { decay } => {
                if decay.is_finite() && decay >= 0.0 {
                    Ok(())
                } else {
                    Err(NumericError::config(format!(
                        "schedule decay must be non-negative, got {decay}"
                    )))
                }
            }
        }
    }
}

// =================================================================================================
// Stochastic methods
// =================================================================================================

/// Configuration for Monte Carlo integration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonteCarloConfig {
    /// Seed of the sampling generator. Same seed, same estimate.
    pub seed: u64,

    /// Samples drawn between cancellation checkpoints / progress events.
    pub batch_size: usize,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            batch_size: 4096,
        }
    }
}

impl MonteCarloConfig {
    /// Create a configuration with an explicit seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        non_zero("batch_size", self.batch_size)
    }
}

/// Configuration for k-means clustering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeansConfig {
    /// Seed for k-means++ initialisation and re-seeding.
    pub seed: u64,

    /// Lloyd iterations allowed.
    pub max_iterations: usize,

    /// Stop when no centroid moves further than this.
    pub tolerance: f64,

    /// Empty-cluster re-seeds allowed over the whole run.
    ///
    /// One budget shared by every cluster and every iteration; it is not
    /// reset when a re-seeded cluster fills up again. The run fails with
    /// `ConvergenceError` on the re-seed that would exceed it.
    pub max_reseed_attempts: usize,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            max_iterations: 300,
            tolerance: 1e-9,
            max_reseed_attempts: 10,
        }
    }
}

impl KMeansConfig {
    /// Create a configuration with an explicit seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        non_zero("max_iterations", self.max_iterations)?;
        positive("kmeans tolerance", self.tolerance)
    }
}

// =================================================================================================
// Runtime and keys
// =================================================================================================

/// Configuration for the task scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Number of worker threads in the pool.
    pub workers: usize,

    /// Prefix of worker thread names (`<prefix>-<index>`).
    pub thread_name: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            thread_name: "numerix-worker".to_string(),
        }
    }
}

impl SchedulerConfig {
    /// Create a configuration with a fixed number of workers
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        non_zero("workers", self.workers)
    }
}

/// Configuration for RSA key generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyGenConfig {
    /// Seed of the candidate generator.
    pub seed: u64,

    /// Prime candidates drawn (over both primes) before giving up.
    pub max_attempts: usize,

    /// Miller-Rabin witnesses per candidate.
    pub miller_rabin_rounds: usize,

    /// Preferred public exponent.
    pub public_exponent: u64,
}

impl Default for KeyGenConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            max_attempts: 20_000,
            miller_rabin_rounds: 32,
            public_exponent: 65_537,
        }
    }
}

impl KeyGenConfig {
    /// Create a configuration with an explicit seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        non_zero("miller_rabin_rounds", self.miller_rabin_rounds)?;
        if self.public_exponent < 3 || self.public_exponent % 2 == 0 {
            return Err(NumericError::config(format!(
                "public exponent must be odd and at least 3, got {}",
                self.public_exponent
            )));
        }
        Ok(())
    }
}

// =================================================================================================
// Aggregate
// =================================================================================================

/// One of each configuration structure.
#[derive(Debug, Clone, Default)]
pub struct NumericConfig {
    pub linalg: LinalgConfig,
    pub transform: TransformConfig,
    pub derivative: DerivativeConfig,
    pub integration: IntegrationConfig,
    pub roots: RootConfig,
    pub gradient_descent: GradientDescentConfig,
    pub monte_carlo: MonteCarloConfig,
    pub kmeans: KMeansConfig,
    pub scheduler: SchedulerConfig,
    pub keygen: KeyGenConfig,
}

impl NumericConfig {
    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.linalg.validate()?;
        self.derivative.validate()?;
        self.integration.validate()?;
        self.roots.validate()?;
        self.gradient_descent.validate()?;
        self.monte_carlo.validate()?;
        self.kmeans.validate()?;
        self.scheduler.validate()?;
        self.keygen.validate()
    }
}

// =================================================================================================
// Tests
// =================================================================================================
