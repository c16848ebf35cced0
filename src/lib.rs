//! numerix: numerical computation core
//!
//! Dense linear algebra, complex arithmetic, polynomials, Fourier transforms,
//! calculus, root finding, optimisation, Monte Carlo integration and
//! clustering, plus an asynchronous task layer that runs any of them on a
//! bounded worker pool with cooperative cancellation and progress events.
//!
//! # Architecture
//!
//! numerix is built on two core principles:
//!
//! 1. **Separation of Numerics and Execution**
//!    - Numerical routines are plain functions over values and configs
//!    - The runtime decides where they run and who hears about progress,
//!      through an [`runtime::ExecutionContext`] passed to every iterative
//!      routine
//!
//! 2. **Typed failures**
//!    - Every fallible operation returns [`error::Result`]
//!    - Callers match on [`error::NumericError`] kinds, never on strings
//!
//! # Quick Start
//!
//! ```rust
//! use numerix::prelude::*;
//! use std::sync::Arc;
//!
//! // Inline: solve, integrate, factorise
//! let p = Polynomial::new(vec![1.0, -2.0, 1.0]);
//! let ctx = ExecutionContext::detached();
//! let root = newton_raphson(&p, 0.5, &RootConfig::default(), &ctx).unwrap();
//! assert!((root.root - 1.0).abs() < 1e-4);
//!
//! let m = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
//! assert_eq!(numerix::linalg::determinant(&m).unwrap(), -2.0);
//!
//! // Scheduled: the same numerics on a worker pool
//! let bus = Arc::new(EventBus::new());
//! let scheduler = Scheduler::new(SchedulerConfig::with_workers(2), bus).unwrap();
//! let f: Arc<dyn MathFunction> = Arc::new(p);
//! let area = scheduler
//!     .parallel_integrate(f, 0.0, 1.0, 4, &IntegrationConfig::default())
//!     .wait()
//!     .unwrap();
//! assert!((area - 1.0 / 3.0).abs() < 1e-9);
//! ```
//!
//! # Modules
//!
//! - [`numeric`]: complex numbers, matrices, polynomials, function objects
//! - [`linalg`]: determinant, inverse, solve, LU, QR, eigenvalues
//! - [`transform`]: FFT and convolution
//! - [`solver`]: derivatives, integration, roots, optimisation, Monte Carlo,
//!   k-means
//! - [`runtime`]: scheduler, task handles, cancellation, event bus
//! - [`output`]: sampling for external renderers and CSV export
//! - [`crypto`]: RSA key generation over big integers
//! - [`config`]: every tolerance, cap and seed, with validation
//! - [`error`]: the error taxonomy
//!
//! # Features
//!
//! - `parallel` (default): data-parallel inner loops above
//!   [`solver::parallel_threshold`]

pub mod config;
pub mod crypto;
pub mod error;
pub mod linalg;
pub mod numeric;
pub mod output;
pub mod runtime;
pub mod solver;
pub mod transform;

pub mod prelude {
    //! Convenient imports for common usage
    //!
    //! ```rust
    //! use numerix::prelude::*;
    //! ```
    pub use crate::config::{
        DerivativeConfig, DerivativePolicy, GradientDescentConfig, IntegrationConfig,
        KMeansConfig, LinalgConfig, MonteCarloConfig, NumericConfig, RootConfig,
        SchedulerConfig, StepSchedule, TransformConfig,
    };
    pub use crate::error::{NumericError, Result};
    pub use crate::numeric::{Complex, FnFunction, MathFunction, Matrix, Polynomial};
    pub use crate::runtime::{
        CancellationToken, Event, EventBus, ExecutionContext, Scheduler, TaskHandle, TaskState,
    };
    pub use crate::solver::{
        derivative, gradient_descent, integrate, kmeans, monte_carlo_integrate, newton_raphson,
    };
}
