//! Task scheduler
//!
//! A [`Scheduler`] owns a fixed-size rayon thread pool. Submitting a job is
//! non-blocking: the job is queued on the pool and a [`TaskHandle`] comes
//! back immediately. Workers drive the task through its lifecycle and store
//! the outcome in the shared task cell.
//!
//! # Fan-out / fan-in
//!
//! ```text
//!                    ┌──► partition 0 ──┐
//! fan_out(parts) ────┼──► partition 1 ──┼──► reduce(values in index order)
//!                    └──► partition 2 ──┘
//! ```
//!
//! Each partition runs as its own task under a child of the parent's
//! cancellation token. Partial results are stored by partition index and
//! reduced in index order once every partition has completed, so the result
//! does not depend on which worker finished first. The first partition to
//! fail settles the whole operation with its error and cancels the others.

use super::task::{Outcome, TaskCell, TaskCounters};
use super::{CancellationToken, Event, EventBus, ExecutionContext, TaskHandle, TaskState};
use crate::config::{IntegrationConfig, MonteCarloConfig, RootConfig, SchedulerConfig};
use crate::error::{NumericError, Result};
use crate::numeric::{Complex, MathFunction};
use crate::solver::{MonteCarloEstimate, RootResult, integrate, monte_carlo_integrate, newton_raphson};
use crate::transform::fft;
use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::Ordering;

/// Snapshot of the scheduler's task counters
///
/// Every fan-out partition counts as a task of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerStats {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
}

impl SchedulerStats {
    /// Tasks not yet in a terminal state
    pub fn in_flight(&self) -> u64 {
        self.submitted
            .saturating_sub(self.completed + self.failed + self.cancelled)
    }
}

pub struct Scheduler {
    pool: ThreadPool,
    bus: Arc<EventBus>,
    counters: Arc<TaskCounters>,
    workers: usize,
}

impl Scheduler {
    /// Build the worker pool
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` when the config is invalid or the pool cannot
    /// be created.
    pub fn new(config: SchedulerConfig, bus: Arc<EventBus>) -> Result<Self> {
        config.validate()?;

        let prefix = config.thread_name.clone();
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(move |index| format!("{prefix}-{index}"))
            .build()
            .map_err(|e| NumericError::config(format!("cannot build worker pool: {e}")))?;

        log::info!(
            "scheduler started with {} workers ({}-*)",
            config.workers,
            config.thread_name
        );

        Ok(Self {
            pool,
            bus,
            counters: Arc::new(TaskCounters::default()),
            workers: config.workers,
        })
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            cancelled: self.counters.cancelled.load(Ordering::Relaxed),
        }
    }

    fn cell<T>(&self, name: impl Into<String>, token: CancellationToken) -> Arc<TaskCell<T>> {
        TaskCell::new(
            name,
            token,
            Some(Arc::clone(&self.bus)),
            Some(Arc::clone(&self.counters)),
        )
    }

    /// Queue `job` on the pool and return its handle
    ///
    /// The job receives an [`ExecutionContext`] bound to the task's token and
    /// the scheduler's bus. Returning `Err(Cancelled)` or returning anything
    /// after cancellation was requested resolves the task `Cancelled`.
    pub fn submit<T, F>(&self, name: impl Into<String>, job: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(&ExecutionContext) -> Result<T> + Send + 'static,
    {
        let cell = self.cell(name, CancellationToken::new());
        let worker = Arc::clone(&cell);
        self.pool.spawn(move || {
            if worker.start() {
                run_job(&worker, None, job);
            }
        });
        TaskHandle::new(cell)
    }

    /// Run every part as its own task and reduce the results
    ///
    /// `reduce` receives the partial results ordered by partition index. An
    /// empty `parts` runs `reduce(vec![])` as a single task.
    pub fn fan_out<T, U, F, R>(&self, name: impl Into<String>, parts: Vec<F>, reduce: R) -> TaskHandle<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnOnce(&ExecutionContext) -> Result<T> + Send + 'static,
        R: FnOnce(Vec<T>) -> Result<U> + Send + 'static,
    {
        let name = name.into();
        if parts.is_empty() {
            return self.submit(name, move |_| reduce(Vec::new()));
        }

        let parent = self.cell::<U>(name.as_str(), CancellationToken::new());
        let total = parts.len();
        let children: Vec<Arc<TaskCell<T>>> = (0..total)
            .map(|index| self.cell(format!("{name}[{index}]"), parent.token().child()))
            .collect();

        let fan_in = Arc::new(FanIn {
            parent: Arc::clone(&parent),
            children,
            state: Mutex::new(FanInState {
                partials: (0..total).map(|_| None).collect(),
                remaining: total,
                reduce: Some(reduce),
                settled: false,
            }),
        });

        log::debug!("fan-out `{name}` over {total} partitions");

        for (index, job) in parts.into_iter().enumerate() {
            let fan_in = Arc::clone(&fan_in);
            self.pool.spawn(move || {
                fan_in.parent.start();
                let child = &fan_in.children[index];
                if child.start() {
                    run_job(child, Some(index), job);
                }
                fan_in.on_child_done(index);
            });
        }

        TaskHandle::new(parent)
    }

    /// Integrate `f` over `[a, b]` split into `n` contiguous partitions
    ///
    /// Each partition gets `tolerance / n`; the last one ends exactly at `b`.
    /// The partial integrals are summed in partition order.
    pub fn parallel_integrate(
        &self,
        f: Arc<dyn MathFunction>,
        a: f64,
        b: f64,
        n: usize,
        config: &IntegrationConfig,
    ) -> TaskHandle<f64> {
        const NAME: &str = "parallel_integrate";

        if n == 0 {
            let err = NumericError::domain(NAME, "partition count must be at least 1");
            return self.submit(NAME, move |_| Err(err));
        }
        if let Err(err) = config.validate() {
            return self.submit(NAME, move |_| Err(err));
        }

        let width = (b - a) / n as f64;
        let partition = IntegrationConfig {
            tolerance: config.tolerance / n as f64,
            ..*config
        };

        let parts: Vec<_> = (0..n)
            .map(|i| {
                let f = Arc::clone(&f);
                let lo = a + width * i as f64;
                let hi = if i + 1 == n { b } else { a + width * (i + 1) as f64 };
                move |ctx: &ExecutionContext| integrate(f.as_ref(), lo, hi, &partition, ctx)
            })
            .collect();

        self.fan_out(NAME, parts, |partials: Vec<f64>| Ok(partials.iter().sum()))
    }

    /// [`newton_raphson`] as a task
    pub fn submit_newton(
        &self,
        f: Arc<dyn MathFunction>,
        x0: f64,
        config: RootConfig,
    ) -> TaskHandle<RootResult> {
        self.submit("newton_raphson", move |ctx| {
            newton_raphson(f.as_ref(), x0, &config, ctx)
        })
    }

    /// [`fft`] as a task
    pub fn submit_fft(&self, signal: Vec<Complex>) -> TaskHandle<Vec<Complex>> {
        self.submit("fft", move |ctx| {
            ctx.checkpoint()?;
            Ok(fft(&signal))
        })
    }

    /// [`monte_carlo_integrate`] as a task
    pub fn submit_monte_carlo(
        &self,
        f: Arc<dyn MathFunction>,
        a: f64,
        b: f64,
        samples: usize,
        config: MonteCarloConfig,
    ) -> TaskHandle<MonteCarloEstimate> {
        self.submit("monte_carlo_integrate", move |ctx| {
            monte_carlo_integrate(f.as_ref(), a, b, samples, &config, ctx)
        })
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("workers", &self.workers)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Run a started task's job and resolve the cell
fn run_job<T, F>(cell: &TaskCell<T>, partition: Option<usize>, job: F)
where
    F: FnOnce(&ExecutionContext) -> Result<T>,
{
    let mut ctx = ExecutionContext::for_task(cell.id(), cell.token().clone(), cell.bus().cloned());
    if let Some(index) = partition {
        ctx = ctx.with_partition(index);
    }

    let outcome = match catch_unwind(AssertUnwindSafe(|| job(&ctx))) {
        Ok(Ok(value)) => Outcome::Completed(value),
        Ok(Err(e)) if e.is_cancelled() => Outcome::Cancelled,
        Ok(Err(e)) => Outcome::Failed(e),
        Err(panic) => {
            let message = super::panic_message(panic.as_ref());
            log::error!("task {} `{}` panicked: {message}", cell.id(), cell.name());
            Outcome::Failed(NumericError::TaskPanicked {
                task: cell.id(),
                message,
            })
        }
    };
    cell.complete(outcome);
}

// =================================================================================================
// Fan-in
// =================================================================================================

struct FanInState<T, R> {
    partials: Vec<Option<T>>,
    remaining: usize,
    reduce: Option<R>,
    settled: bool,
}

struct FanIn<T, U, R> {
    parent: Arc<TaskCell<U>>,
    children: Vec<Arc<TaskCell<T>>>,
    state: Mutex<FanInState<T, R>>,
}

impl<T, U, R> FanIn<T, U, R>
where
    R: FnOnce(Vec<T>) -> Result<U>,
{
    fn on_child_done(&self, index: usize) {
        let child = &self.children[index];
        match child.state() {
            TaskState::Completed => self.on_completed(index, child.take_result()),
            TaskState::Failed => {
                if self.settle() {
                    let error = child.take_error().unwrap_or_else(|| {
                        NumericError::domain("Scheduler::fan_out", "partition failed without an error")
                    });
                    log::info!(
                        "partition {index} of task {} failed, cancelling siblings",
                        self.parent.id()
                    );
                    self.parent.complete(Outcome::Failed(error));
                    self.cancel_children();
                }
            }
            TaskState::Cancelled => {
                if self.settle() {
                    self.parent.complete(Outcome::Cancelled);
                    self.cancel_children();
                }
            }
            TaskState::Pending | TaskState::Running => {}
        }
    }

    fn on_completed(&self, index: usize, value: Option<T>) {
        let total = self.children.len();
        let ready = {
            let mut state = self.state.lock();
            if state.settled {
                return;
            }
            state.partials[index] = value;
            state.remaining -= 1;

            // Emitted under the lock so progress fractions arrive in order
            if let Some(bus) = self.parent.bus() {
                bus.emit(
                    Event::new(Event::PARTITION_COMPLETED)
                        .with("task", self.parent.id().raw())
                        .with("partition", index)
                        .with("progress_fraction", (total - state.remaining) as f64 / total as f64),
                );
            }

            if state.remaining == 0 {
                state.settled = true;
                let partials = std::mem::take(&mut state.partials);
                Some((partials, state.reduce.take()))
            } else {
                None
            }
        };

        if let Some((partials, reduce)) = ready {
            self.parent.complete(self.reduce(partials, reduce));
        }
    }

    fn reduce(&self, partials: Vec<Option<T>>, reduce: Option<R>) -> Outcome<U> {
        let values: Option<Vec<T>> = partials.into_iter().collect();
        let (Some(values), Some(reduce)) = (values, reduce) else {
            return Outcome::Failed(NumericError::domain(
                "Scheduler::fan_out",
                "partial result missing at reduction",
            ));
        };
        match catch_unwind(AssertUnwindSafe(|| reduce(values))) {
            Ok(Ok(value)) => Outcome::Completed(value),
            Ok(Err(e)) if e.is_cancelled() => Outcome::Cancelled,
            Ok(Err(e)) => Outcome::Failed(e),
            Err(panic) => Outcome::Failed(NumericError::TaskPanicked {
                task: self.parent.id(),
                message: super::panic_message(panic.as_ref()),
            }),
        }
    }

    /// True for the first caller only
    fn settle(&self) -> bool {
        let mut state = self.state.lock();
        !std::mem::replace(&mut state.settled, true)
    }

    fn cancel_children(&self) {
        for child in &self.children {
            child.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::FnFunction;
    use std::time::Duration;

    fn scheduler(workers: usize) -> Scheduler {
        Scheduler::new(SchedulerConfig::with_workers(workers), Arc::new(EventBus::new())).unwrap()
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = Scheduler::new(SchedulerConfig::with_workers(0), Arc::new(EventBus::new())).unwrap_err();
        assert_eq!(err.kind(), "InvalidConfiguration");
    }

    #[test]
    fn test_submit_and_wait() {
        let s = scheduler(2);
        let handle = s.submit("answer", |_| Ok(6 * 7));
        assert_eq!(handle.wait(), Ok(42));
        let stats = s.stats();
        assert_eq!(stats.submitted, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.in_flight(), 0);
    }

    #[test]
    fn test_panic_becomes_failure() {
        let s = scheduler(1);
        let handle = s.submit("boom", |_| -> Result<()> { panic!("exploded") });
        let id = handle.id();
        match handle.wait() {
            Err(NumericError::TaskPanicked { task, message }) => {
                assert_eq!(task, id);
                assert!(message.contains("exploded"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(s.stats().failed, 1);
    }

    #[test]
    fn test_cancel_while_running() {
        let s = scheduler(1);
        let handle = s.submit("spin", |ctx| -> Result<()> {
            loop {
                ctx.checkpoint()?;
                std::thread::sleep(Duration::from_millis(1));
            }
        });
        while handle.state() == TaskState::Pending {
            std::thread::sleep(Duration::from_millis(1));
        }
        handle.cancel();
        handle.cancel();
        assert!(handle.wait().unwrap_err().is_cancelled());
    }

    #[test]
    fn test_fan_out_reduces_in_index_order() {
        let s = scheduler(4);
        let parts: Vec<_> = (0..8u64)
            .map(|i| {
                move |_: &ExecutionContext| {
                    std::thread::sleep(Duration::from_millis(8 - i));
                    Ok(i)
                }
            })
            .collect();
        let handle = s.fan_out("ordered", parts, |values: Vec<u64>| Ok(values));
        assert_eq!(handle.wait().unwrap(), (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_fan_out_empty() {
        let s = scheduler(1);
        let parts: Vec<fn(&ExecutionContext) -> Result<u8>> = Vec::new();
        let handle = s.fan_out("empty", parts, |values: Vec<u8>| Ok(values.len()));
        assert_eq!(handle.wait(), Ok(0));
    }

    #[test]
    fn test_parallel_integrate_zero_partitions() {
        let s = scheduler(1);
        let f: Arc<dyn MathFunction> = Arc::new(FnFunction::new("one", |_| 1.0));
        let err = s
            .parallel_integrate(f, 0.0, 1.0, 0, &IntegrationConfig::default())
            .wait()
            .unwrap_err();
        assert_eq!(err.kind(), "DomainError");
    }

    #[test]
    fn test_submit_fft() {
        let s = scheduler(1);
        let signal = vec![Complex::ONE; 4];
        let spectrum = s.submit_fft(signal).wait().unwrap();
        assert!(spectrum[0].approx_eq(Complex::real(4.0), 1e-12));
        assert!(spectrum[1].approx_eq(Complex::ZERO, 1e-12));
    }
}
