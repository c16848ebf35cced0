//! Execution context threaded through long-running numerics
//!
//! Every iterative routine takes an `&ExecutionContext`. It carries the event
//! bus (if any), the cancellation token (if any) and the identity of the task
//! and partition the computation belongs to, so that events emitted from deep
//! inside a solver are attributed correctly and cancellation is observed at
//! each checkpoint.
//!
//! [`ExecutionContext::detached`] gives a context with neither bus nor token;
//! emitting is then a no-op and checkpoints always succeed.

use super::{CancellationToken, Event, EventBus, TaskId};
use crate::error::Result;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    bus: Option<Arc<EventBus>>,
    token: Option<CancellationToken>,
    task: Option<TaskId>,
    partition: Option<usize>,
}

impl ExecutionContext {
    /// No bus, no token
    pub fn detached() -> Self {
        Self::default()
    }

    /// Publish events to `bus`
    pub fn with_bus(bus: Arc<EventBus>) -> Self {
        Self {
            bus: Some(bus),
            ..Self::default()
        }
    }

    /// Observe `token` at each checkpoint
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Same bus, token and task, tagged with partition `index`
    pub fn with_partition(&self, index: usize) -> Self {
        Self {
            partition: Some(index),
            ..self.clone()
        }
    }

    pub(crate) fn for_task(
        task: TaskId,
        token: CancellationToken,
        bus: Option<Arc<EventBus>>,
    ) -> Self {
        Self {
            bus,
            token: Some(token),
            task: Some(task),
            partition: None,
        }
    }

    pub fn task(&self) -> Option<TaskId> {
        self.task
    }

    pub fn partition(&self) -> Option<usize> {
        self.partition
    }

    pub fn bus(&self) -> Option<&Arc<EventBus>> {
        self.bus.as_ref()
    }

    pub fn token(&self) -> Option<&CancellationToken> {
        self.token.as_ref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// `Err(Cancelled)` once the token has been cancelled
    pub fn checkpoint(&self) -> Result<()> {
        match &self.token {
            Some(token) => token.checkpoint(self.task.unwrap_or(TaskId::UNASSIGNED)),
            None => Ok(()),
        }
    }

    /// Publish `event`, tagged with this context's task and partition
    pub fn emit(&self, event: Event) {
        if let Some(bus) = &self.bus {
            bus.emit(self.tag(event));
        }
    }

    /// Like [`emit`](Self::emit), but only builds the event when a bus is
    /// attached
    pub fn emit_with(&self, build: impl FnOnce() -> Event) {
        if let Some(bus) = &self.bus {
            bus.emit(self.tag(build()));
        }
    }

    fn tag(&self, mut event: Event) -> Event {
        if let Some(task) = self.task {
            event.insert_if_absent("task", task.raw());
        }
        if let Some(partition) = self.partition {
            event.insert_if_absent("partition", partition);
        }
        event
    }
}
