//! Tasks and task handles
//!
//! # Task lifecycle
//!
//! ```text
//!            start()            complete(outcome)
//! ┌─────────┐      ┌─────────┐ ───────────────► Completed | Failed
//! │ Pending │ ───► │ Running │
//! └─────────┘      └─────────┘ ──token set────► Cancelled
//!      │
//!      └── cancel() ──────────────────────────► Cancelled (never runs)
//! ```
//!
//! The shared state lives in a [`TaskCell`] owned jointly by the scheduler
//! (which drives it) and the caller's [`TaskHandle`] (which observes it).
//! Terminal states are final: a second `complete` or a late `cancel` is a
//! no-op, which is what makes cancellation idempotent and lets completed
//! tasks ignore it.
//!
//! A job that returns after its token was cancelled resolves `Cancelled`
//! and its value is dropped, so no partial result ever reaches the caller.

use super::{CancellationToken, Event, EventBus};
use crate::error::{NumericError, Result};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

// =================================================================================================
// Identity and state
// =================================================================================================

/// Process-unique task identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Id reported for cancellation outside any scheduled task
    pub const UNASSIGNED: TaskId = TaskId(0);

    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position in the task lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Cancelled | TaskState::Failed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Completed => "completed",
            TaskState::Cancelled => "cancelled",
            TaskState::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a job ended
pub(crate) enum Outcome<T> {
    Completed(T),
    Failed(NumericError),
    Cancelled,
}

// =================================================================================================
// Shared cell
// =================================================================================================

/// Counters shared by every task of one scheduler
#[derive(Debug, Default)]
pub(crate) struct TaskCounters {
    pub(crate) submitted: AtomicU64,
    pub(crate) completed: AtomicU64,
    pub(crate) failed: AtomicU64,
    pub(crate) cancelled: AtomicU64,
}

impl TaskCounters {
    fn record(&self, state: TaskState) {
        let counter = match state {
            TaskState::Completed => &self.completed,
            TaskState::Failed => &self.failed,
            TaskState::Cancelled => &self.cancelled,
            TaskState::Pending | TaskState::Running => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

struct TaskSlot<T> {
    state: TaskState,
    result: Option<T>,
    error: Option<NumericError>,
    waker: Option<Waker>,
    /// Set once the terminal transition has been published
    announced: bool,
}

/// State shared between the scheduler and a [`TaskHandle`]
pub(crate) struct TaskCell<T> {
    id: TaskId,
    name: String,
    token: CancellationToken,
    slot: Mutex<TaskSlot<T>>,
    done: Condvar,
    bus: Option<Arc<EventBus>>,
    counters: Option<Arc<TaskCounters>>,
}

impl<T> TaskCell<T> {
    pub(crate) fn new(
        name: impl Into<String>,
        token: CancellationToken,
        bus: Option<Arc<EventBus>>,
        counters: Option<Arc<TaskCounters>>,
    ) -> Arc<Self> {
        if let Some(counters) = &counters {
            counters.submitted.fetch_add(1, Ordering::Relaxed);
        }
        Arc::new(Self {
            id: TaskId::next(),
            name: name.into(),
            token,
            slot: Mutex::new(TaskSlot {
                state: TaskState::Pending,
                result: None,
                error: None,
                waker: None,
                announced: false,
            }),
            done: Condvar::new(),
            bus,
            counters,
        })
    }

    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub(crate) fn bus(&self) -> Option<&Arc<EventBus>> {
        self.bus.as_ref()
    }

    pub(crate) fn state(&self) -> TaskState {
        self.slot.lock().state
    }

    /// Move Pending → Running
    ///
    /// Returns true when the task is running afterwards (including when it
    /// already was). A task whose token is already cancelled resolves
    /// `Cancelled` instead and returns false.
    pub(crate) fn start(&self) -> bool {
        let (running, transition) = {
            let mut slot = self.slot.lock();
            let current = slot.state;
            match current {
                TaskState::Running => (true, None),
                TaskState::Pending if self.token.is_cancelled() => {
                    Self::resolve(&mut slot, Outcome::Cancelled);
                    (false, Some((TaskState::Cancelled, None)))
                }
                TaskState::Pending => {
                    slot.state = TaskState::Running;
                    (true, Some((TaskState::Running, None)))
                }
                _ => (false, None),
            }
        };
        if let Some((state, error)) = transition {
            self.announce(state, error);
        }
        running
    }

    /// Resolve the task. Returns the final state, or `None` when the task was
    /// already terminal.
    pub(crate) fn complete(&self, outcome: Outcome<T>) -> Option<TaskState> {
        let (state, error) = {
            let mut slot = self.slot.lock();
            if slot.state.is_terminal() {
                return None;
            }
            let outcome = if self.token.is_cancelled() {
                Outcome::Cancelled
            } else {
                outcome
            };
            Self::resolve(&mut slot, outcome);
            (slot.state, slot.error.clone())
        };
        self.announce(state, error);
        Some(state)
    }

    /// Request cancellation; a Pending task resolves immediately
    pub(crate) fn cancel(&self) {
        self.token.cancel();
        {
            let mut slot = self.slot.lock();
            if slot.state != TaskState::Pending {
                return;
            }
            Self::resolve(&mut slot, Outcome::Cancelled);
        }
        self.announce(TaskState::Cancelled, None);
    }

    fn resolve(slot: &mut TaskSlot<T>, outcome: Outcome<T>) {
        match outcome {
            Outcome::Completed(value) => {
                slot.state = TaskState::Completed;
                slot.result = Some(value);
            }
            Outcome::Failed(error) => {
                slot.state = TaskState::Failed;
                slot.error = Some(error);
            }
            Outcome::Cancelled => {
                slot.state = TaskState::Cancelled;
            }
        }
    }

    /// Publish the transition, then wake waiters; called without the slot lock
    ///
    /// A waiter that returns from `wait` has therefore already seen the
    /// task's terminal event delivered and its counters recorded.
    fn announce(&self, state: TaskState, error: Option<NumericError>) {
        match (&error, state) {
            (Some(e), _) => log::info!("task {} `{}` failed: {e}", self.id, self.name),
            (None, TaskState::Running) => log::trace!("task {} `{}` running", self.id, self.name),
            (None, _) => log::debug!("task {} `{}` {state}", self.id, self.name),
        }

        if let Some(bus) = &self.bus {
            let mut event = Event::new(Event::TASK_STATE)
                .with("task", self.id.raw())
                .with("name", self.name.as_str())
                .with("state", state.as_str());
            if let Some(e) = error {
                event = event.with("error", e.kind()).with("message", e.to_string());
            }
            bus.emit(event);
        }

        if state.is_terminal() {
            if let Some(counters) = &self.counters {
                counters.record(state);
            }
            let waker = {
                let mut slot = self.slot.lock();
                slot.announced = true;
                slot.waker.take()
            };
            self.done.notify_all();
            if let Some(waker) = waker {
                waker.wake();
            }
        }
    }

    /// Take the outcome of a terminal task
    fn take(&self, slot: &mut TaskSlot<T>) -> Result<T> {
        let already_taken = || NumericError::Domain {
            operation: "TaskHandle::wait",
            reason: format!("result of task {} was already retrieved", self.id),
        };
        match slot.state {
            TaskState::Completed => slot.result.take().ok_or_else(already_taken),
            TaskState::Failed => Err(slot.error.take().unwrap_or_else(already_taken)),
            _ => Err(NumericError::Cancelled { task: self.id }),
        }
    }

    /// Completed value, for fan-in
    pub(crate) fn take_result(&self) -> Option<T> {
        self.slot.lock().result.take()
    }

    /// Failure, for fan-in
    pub(crate) fn take_error(&self) -> Option<NumericError> {
        self.slot.lock().error.take()
    }
}

// =================================================================================================
// Handle
// =================================================================================================

/// Caller's side of a submitted task
///
/// Retrieving the result ([`TaskHandle::wait`] or `.await`) consumes the
/// handle. Waiting blocks on a condition variable; awaiting registers the
/// task's waker. Neither busy-waits.
pub struct TaskHandle<T> {
    cell: Arc<TaskCell<T>>,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(cell: Arc<TaskCell<T>>) -> Self {
        Self { cell }
    }

    pub fn id(&self) -> TaskId {
        self.cell.id()
    }

    pub fn name(&self) -> &str {
        self.cell.name()
    }

    pub fn state(&self) -> TaskState {
        self.cell.state()
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Request cooperative cancellation. Idempotent; ignored once the task
    /// has finished.
    pub fn cancel(&self) {
        self.cell.cancel();
    }

    /// Block until the task resolves
    ///
    /// # Errors
    ///
    /// The job's own error, `TaskPanicked`, or `Cancelled`.
    pub fn wait(self) -> Result<T> {
        let mut slot = self.cell.slot.lock();
        while !slot.announced {
            self.cell.done.wait(&mut slot);
        }
        self.cell.take(&mut slot)
    }

    /// Block for at most `timeout`; on timeout the handle is given back
    pub fn wait_timeout(self, timeout: Duration) -> std::result::Result<Result<T>, TaskHandle<T>> {
        let deadline = Instant::now() + timeout;
        {
            let mut slot = self.cell.slot.lock();
            while !slot.announced {
                if self.cell.done.wait_until(&mut slot, deadline).timed_out() {
                    break;
                }
            }
            if slot.announced {
                return Ok(self.cell.take(&mut slot));
            }
        }
        Err(self)
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.cell.slot.lock();
        if slot.announced {
            Poll::Ready(self.cell.take(&mut slot))
        } else {
            slot.waker = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}

// =================================================================================================
// Tests
// =================================================================================================
