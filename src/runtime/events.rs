//! Progress events and the publish/subscribe bus
//!
//! # Lifecycle
//!
//! An [`EventBus`] is an ordinary value: create it, share it as
//! `Arc<EventBus>` with the scheduler and any [`super::ExecutionContext`],
//! and drop it when done. Subscriptions stay registered until
//! [`EventBus::unsubscribe`] is called with their token.
//!
//! # Delivery
//!
//! - Synchronous, on the emitting thread. Events emitted by one task
//!   therefore reach each subscriber in emission order.
//! - The registry lock is held only while matching handlers are collected,
//!   never while a handler runs, so handlers may subscribe, unsubscribe or
//!   emit.
//! - A panicking handler is isolated: the panic is caught and reported as a
//!   `handler_error` event. A panic inside a `handler_error` handler is only
//!   logged.
//!
//! # Event names and payload keys
//!
//! | Name | Keys |
//! |------|------|
//! | `convergence` | `iteration`, `x`, `error` |
//! | `progress` | `iteration`, `error`, `progress_fraction` (when known) |
//! | `partition_completed` | `partition`, `progress_fraction` |
//! | `task_state` | `task`, `name`, `state`, `error` (kind) and `message` on failure |
//! | `handler_error` | `event`, `message` |
//! | `eigenvalue_warning` | `iteration`, `error`, `real_parts`, `imag_parts` |
//!
//! Events emitted through a task's context also carry `task`, and
//! `partition` for fan-out children.

use crate::error::NumericError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Subscribe to every event
pub const WILDCARD: &str = "*";

/// Payload value
#[derive(Debug, Clone, PartialEq)]
pub enum EventValue {
    Number(f64),
    Integer(i64),
    Text(String),
    Bool(bool),
    Series(Vec<f64>),
}

impl From<f64> for EventValue {
    fn from(v: f64) -> Self {
        EventValue::Number(v)
    }
}

impl From<i64> for EventValue {
    fn from(v: i64) -> Self {
        EventValue::Integer(v)
    }
}

impl From<usize> for EventValue {
    fn from(v: usize) -> Self {
        EventValue::Integer(v as i64)
    }
}

impl From<u64> for EventValue {
    fn from(v: u64) -> Self {
        EventValue::Integer(v as i64)
    }
}

impl From<bool> for EventValue {
    fn from(v: bool) -> Self {
        EventValue::Bool(v)
    }
}

impl From<&str> for EventValue {
    fn from(v: &str) -> Self {
        EventValue::Text(v.to_string())
    }
}

impl From<String> for EventValue {
    fn from(v: String) -> Self {
        EventValue::Text(v)
    }
}

impl From<Vec<f64>> for EventValue {
    fn from(v: Vec<f64>) -> Self {
        EventValue::Series(v)
    }
}

/// A named, timestamped payload
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    name: String,
    payload: BTreeMap<String, EventValue>,
    timestamp: DateTime<Utc>,
}

impl Event {
    pub const CONVERGENCE: &'static str = "convergence";
    pub const PROGRESS: &'static str = "progress";
    pub const PARTITION_COMPLETED: &'static str = "partition_completed";
    pub const TASK_STATE: &'static str = "task_state";
    pub const HANDLER_ERROR: &'static str = "handler_error";
    pub const EIGENVALUE_WARNING: &'static str = "eigenvalue_warning";

    /// Empty event stamped with the current time
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Builder pattern: add one payload entry
    pub fn with(mut self, key: impl Into<String>, value: impl Into<EventValue>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub(crate) fn insert_if_absent(&mut self, key: &str, value: impl Into<EventValue>) {
        if !self.payload.contains_key(key) {
            self.payload.insert(key.to_string(), value.into());
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &BTreeMap<String, EventValue> {
        &self.payload
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn get(&self, key: &str) -> Option<&EventValue> {
        self.payload.get(key)
    }

    /// Numeric entry; integers are widened
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.payload.get(key)? {
            EventValue::Number(v) => Some(*v),
            EventValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.payload.get(key)? {
            EventValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.payload.get(key)? {
            EventValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn series(&self, key: &str) -> Option<&[f64]> {
        match self.payload.get(key)? {
            EventValue::Series(v) => Some(v),
            _ => None,
        }
    }

    pub fn iteration(&self) -> Option<usize> {
        self.integer("iteration").and_then(|v| usize::try_from(v).ok())
    }

    pub fn error(&self) -> Option<f64> {
        self.number("error")
    }

    pub fn partition(&self) -> Option<usize> {
        self.integer("partition").and_then(|v| usize::try_from(v).ok())
    }

    pub fn progress_fraction(&self) -> Option<f64> {
        self.number("progress_fraction")
    }
}

/// Returned by [`EventBus::subscribe`], needed to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

struct Subscription {
    token: SubscriptionToken,
    name: String,
    handler: Handler,
}

/// Publish/subscribe registry
///
/// ```rust
/// use numerix::runtime::{Event, EventBus};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let bus = EventBus::new();
/// let count = Arc::new(AtomicUsize::new(0));
/// let seen = Arc::clone(&count);
/// let token = bus.subscribe("progress", move |_| {
///     seen.fetch_add(1, Ordering::SeqCst);
/// });
///
/// bus.emit(Event::new("progress"));
/// bus.emit(Event::new("other"));
/// assert_eq!(count.load(Ordering::SeqCst), 1);
///
/// assert!(bus.unsubscribe(token));
/// bus.emit(Event::new("progress"));
/// assert_eq!(count.load(Ordering::SeqCst), 1);
/// ```
pub struct EventBus {
    subscriptions: RwLock<Vec<Subscription>>,
    next_token: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            next_token: AtomicU64::new(1),
        }
    }

    /// Register `handler` for events called `name` (or every event for
    /// [`WILDCARD`])
    pub fn subscribe(
        &self,
        name: impl Into<String>,
        handler: impl Fn(&Event) + Send + Sync + 'static,
    ) -> SubscriptionToken {
        let token = SubscriptionToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.write().push(Subscription {
            token,
            name: name.into(),
            handler: Arc::new(handler),
        });
        token
    }

    /// Remove a subscription. Returns false when the token is unknown.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        let mut subscriptions = self.subscriptions.write();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.token != token);
        subscriptions.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Deliver `event` to every matching subscriber
    pub fn emit(&self, event: Event) {
        let handlers: Vec<Handler> = self
            .subscriptions
            .read()
            .iter()
            .filter(|s| s.name == event.name || s.name == WILDCARD)
            .map(|s| Arc::clone(&s.handler))
            .collect();

        for handler in handlers {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                let message = super::panic_message(panic.as_ref());
                if event.name == Event::HANDLER_ERROR {
                    log::error!("handler_error subscriber panicked: {message}");
                    continue;
                }

                let error = NumericError::Handler {
                    event: event.name.clone(),
                    message,
                };
                log::warn!("{error}");
                self.emit(
                    Event::new(Event::HANDLER_ERROR)
                        .with("event", event.name.as_str())
                        .with("message", error.to_string()),
                );
            }
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

// =================================================================================================
// Tests
// =================================================================================================
