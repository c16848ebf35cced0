//! Async execution and event layer
//!
//! - [`Scheduler`]: bounded rayon worker pool; [`Scheduler::submit`] returns a
//!   [`TaskHandle`] immediately, [`Scheduler::fan_out`] splits work into
//!   partitions and reduces them in index order
//! - [`TaskHandle`]: wait (condition variable) or `.await` (waker) on a task
//! - [`CancellationToken`]: cooperative, idempotent cancellation
//! - [`EventBus`]: named publish/subscribe for progress and convergence
//!   events
//! - [`ExecutionContext`]: what a running computation sees of all the above
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use numerix::config::{IntegrationConfig, SchedulerConfig};
//! use numerix::numeric::{FnFunction, MathFunction};
//! use numerix::runtime::{Event, EventBus, Scheduler};
//!
//! let bus = Arc::new(EventBus::new());
//! bus.subscribe(Event::PARTITION_COMPLETED, |e: &Event| {
//!     println!("{:?} done", e.partition());
//! });
//!
//! let scheduler = Scheduler::new(SchedulerConfig::with_workers(2), bus).unwrap();
//! let f: Arc<dyn MathFunction> = Arc::new(FnFunction::new("square", |x| x * x));
//! let area = scheduler
//!     .parallel_integrate(f, 0.0, 3.0, 4, &IntegrationConfig::default())
//!     .wait()
//!     .unwrap();
//! assert!((area - 9.0).abs() < 1e-9);
//! ```

mod cancel;
mod context;
mod events;
mod scheduler;
mod task;

pub use cancel::CancellationToken;
pub use context::ExecutionContext;
pub use events::{Event, EventBus, EventValue, SubscriptionToken, WILDCARD};
pub use scheduler::{Scheduler, SchedulerStats};
pub use task::{TaskHandle, TaskId, TaskState};

use std::any::Any;

/// Text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
