//! Cooperative cancellation
//!
//! A [`CancellationToken`] is a shared flag. Cancelling is idempotent and
//! never interrupts anything by itself: long-running code calls
//! [`CancellationToken::checkpoint`] (usually through
//! [`super::ExecutionContext::checkpoint`]) between bounded units of work and
//! returns `Cancelled` once the flag is set.
//!
//! Child tokens observe their ancestors, so cancelling a fan-out parent
//! reaches every partition without touching each one.
//!
//! ```text
//! parent ──cancel()──► parent.is_cancelled() == true
//!   ├── child A         A.is_cancelled() == true
//!   └── child B ──cancel()──► only B (and its children)
//! ```

use super::TaskId;
use crate::error::{NumericError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
struct TokenInner {
    cancelled: AtomicBool,
    parent: Option<CancellationToken>,
}

/// Shared, cloneable cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// New token that is also cancelled whenever `self` is
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                parent: Some(self.clone()),
            }),
        }
    }

    /// Request cancellation. Calling it again has no further effect.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    /// True when this token or any ancestor has been cancelled
    pub fn is_cancelled(&self) -> bool {
        let mut token = Some(self);
        while let Some(t) = token {
            if t.inner.cancelled.load(Ordering::Acquire) {
                return true;
            }
            token = t.inner.parent.as_ref();
        }
        false
    }

    /// `Err(Cancelled)` once cancellation has been requested
    pub fn checkpoint(&self, task: TaskId) -> Result<()> {
        if self.is_cancelled() {
            return Err(NumericError::Cancelled { task });
        }
        Ok(())
    }
}
