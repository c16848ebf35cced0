//! Error taxonomy
//!
//! Every fallible operation in the crate returns [`Result<T>`], whose error
//! type is the closed [`NumericError`] enumeration. Callers always receive a
//! specific kind plus a message naming the offending operands or iteration
//! count, never a generic failure.
//!
//! # Recovery policy
//!
//! - Failures with an algorithmic fallback are recovered where they happen
//!   (FFT falling back to a direct DFT, analytical derivative falling back
//!   to finite differences).
//! - Everything else is surfaced to the immediate caller.
//! - In the runtime layer the error is stored in the task and handed to
//!   whoever waits on it.

use crate::runtime::TaskId;
use thiserror::Error;

/// All errors returned by `numerix`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NumericError {
    /// Invalid mathematical input (division by a zero-modulus complex,
    /// vanishing derivative, empty bracket, ...).
    #[error("domain error in {operation}: {reason}")]
    Domain {
        operation: &'static str,
        reason: String,
    },

    /// Operand shapes do not match.
    #[error("dimension mismatch in {operation}: expected {expected}, got {got}")]
    Dimension {
        operation: &'static str,
        expected: String,
        got: String,
    },

    /// The matrix is (numerically) singular.
    #[error("singular matrix ({rows}x{cols}): |det| = {determinant:e}, pivot below threshold {threshold:e}")]
    SingularMatrix {
        rows: usize,
        cols: usize,
        determinant: f64,
        threshold: f64,
    },

    /// Iteration or subdivision budget exhausted before meeting tolerance.
    #[error("{operation} did not converge after {iterations} iterations (last error {last_error:e}, tolerance {tolerance:e})")]
    Convergence {
        operation: &'static str,
        iterations: usize,
        last_error: f64,
        tolerance: f64,
    },

    /// The iteration blew up.
    #[error("{operation} diverged at iteration {iteration}: norm {norm:e} exceeded {limit:e}")]
    Divergence {
        operation: &'static str,
        iteration: usize,
        norm: f64,
        limit: f64,
    },

    /// The supplied function lacks a capability the operation needs and no
    /// numerical fallback applies.
    #[error("{operation} requires capability `{capability}` which `{function}` does not provide")]
    UnsupportedOperation {
        operation: &'static str,
        capability: &'static str,
        function: String,
    },

    /// Prime search for RSA keys exceeded its retry budget.
    #[error("key generation failed for {bit_length}-bit modulus after {attempts} attempts")]
    KeyGeneration { bit_length: u64, attempts: usize },

    /// An event subscriber panicked. Only ever reported through the event
    /// bus, never returned from a solver.
    #[error("event handler for `{event}` failed: {message}")]
    Handler { event: String, message: String },

    /// The task was cancelled; its partial result has been discarded.
    #[error("task {task} was cancelled")]
    Cancelled { task: TaskId },

    /// The job running inside a task panicked.
    #[error("task {task} panicked: {message}")]
    TaskPanicked { task: TaskId, message: String },

    /// A configuration value is out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },
}

impl NumericError {
    /// Shorthand for [`NumericError::Domain`].
    pub fn domain(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Domain {
            operation,
            reason: reason.into(),
        }
    }

    /// Shorthand for [`NumericError::Dimension`].
    pub fn dimension(
        operation: &'static str,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Self::Dimension {
            operation,
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Shorthand for [`NumericError::InvalidConfiguration`].
    pub fn config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    /// Stable kind name, used as the `error` field of task events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Domain { .. } => "DomainError",
            Self::Dimension { .. } => "DimensionError",
            Self::SingularMatrix { .. } => "SingularMatrixError",
            Self::Convergence { .. } => "ConvergenceError",
            Self::Divergence { .. } => "DivergenceError",
            Self::UnsupportedOperation { .. } => "UnsupportedOperationError",
            Self::KeyGeneration { .. } => "KeyGenerationError",
            Self::Handler { .. } => "HandlerError",
            Self::Cancelled { .. } => "Cancelled",
            Self::TaskPanicked { .. } => "TaskPanicked",
            Self::InvalidConfiguration { .. } => "InvalidConfiguration",
        }
    }

    /// True for the cooperative-cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Convenience alias used throughout `numerix`.
pub type Result<T> = std::result::Result<T, NumericError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_operands() {
        let err = NumericError::dimension("Matrix::add", "2x3", "3x2");
        assert_eq!(
            err.to_string(),
            "dimension mismatch in Matrix::add: expected 2x3, got 3x2"
        );

        let err = NumericError::Convergence {
            operation: "newton_raphson",
            iterations: 50,
            last_error: 0.5,
            tolerance: 1e-10,
        };
        assert!(err.to_string().contains("after 50 iterations"));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(NumericError::domain("x", "y").kind(), "DomainError");
        assert_eq!(
            NumericError::KeyGeneration {
                bit_length: 64,
                attempts: 3
            }
            .kind(),
            "KeyGenerationError"
        );
        assert!(NumericError::Cancelled { task: TaskId::from_raw(7) }.is_cancelled());
    }
}
