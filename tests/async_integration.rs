//! End-to-end tests of the scheduler: numerics running as tasks, fan-out
//! reduction, cooperative cancellation and event delivery.

use numerix::config::{IntegrationConfig, MonteCarloConfig, RootConfig, SchedulerConfig};
use numerix::error::{NumericError, Result};
use numerix::numeric::{FnFunction, MathFunction, Polynomial};
use numerix::runtime::{Event, EventBus, ExecutionContext, Scheduler, TaskState, WILDCARD};
use numerix::solver::integrate;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

mod common;
use common::{Gaussian, SlowFunction, assert_close};

fn scheduler(workers: usize) -> (Scheduler, Arc<EventBus>) {
    let bus = Arc::new(EventBus::new());
    let scheduler = Scheduler::new(SchedulerConfig::with_workers(workers), Arc::clone(&bus)).unwrap();
    (scheduler, bus)
}

/// Record every event published on `bus`
fn record(bus: &EventBus) -> Arc<Mutex<Vec<Event>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    bus.subscribe(WILDCARD, move |e| sink.lock().push(e.clone()));
    log
}

/// Poll `condition` for up to a second
fn eventually(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(1);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

#[test]
fn test_parallel_integrate_agrees_with_inline() {
    let (scheduler, _) = scheduler(4);
    let f: Arc<dyn MathFunction> = Arc::new(Gaussian::new(0.7));
    let cfg = IntegrationConfig::default();
    let inline = integrate(f.as_ref(), -3.0, 2.0, &cfg, &ExecutionContext::detached()).unwrap();

    for n in 1..=8 {
        let area = scheduler
            .parallel_integrate(Arc::clone(&f), -3.0, 2.0, n, &cfg)
            .wait()
            .unwrap();
        assert_close(area, inline, 2.0 * cfg.tolerance, &format!("{n} partitions"));
    }
}

#[test]
fn test_parallel_integrate_reversed_bounds() {
    let (scheduler, _) = scheduler(2);
    let p: Arc<dyn MathFunction> = Arc::new(Polynomial::new(vec![0.0, 0.0, 3.0]));
    let area = scheduler
        .parallel_integrate(p, 2.0, 0.0, 3, &IntegrationConfig::default())
        .wait()
        .unwrap();
    assert_close(area, -8.0, 1e-9, "∫₂⁰ 3x²");
}

#[test]
fn test_partition_events_arrive_in_order() {
    let (scheduler, bus) = scheduler(4);
    let log = record(&bus);
    let f: Arc<dyn MathFunction> = Arc::new(FnFunction::new("cos", f64::cos));

    let handle = scheduler.parallel_integrate(f, 0.0, 4.0, 4, &IntegrationConfig::default());
    let parent = handle.id().raw() as i64;
    handle.wait().unwrap();

    let events = log.lock();
    let fractions: Vec<f64> = events
        .iter()
        .filter(|e| e.name() == Event::PARTITION_COMPLETED)
        .map(|e| {
            assert_eq!(e.integer("task"), Some(parent));
            e.progress_fraction().unwrap()
        })
        .collect();
    assert_eq!(fractions, vec![0.25, 0.5, 0.75, 1.0]);

    let parent_states: Vec<&str> = events
        .iter()
        .filter(|e| e.name() == Event::TASK_STATE && e.integer("task") == Some(parent))
        .map(|e| e.text("state").unwrap())
        .collect();
    assert_eq!(parent_states, vec!["running", "completed"]);

    // The parent's terminal event is the last thing published
    let last = events.last().unwrap();
    assert_eq!(last.name(), Event::TASK_STATE);
    assert_eq!(last.integer("task"), Some(parent));
}

#[test]
fn test_convergence_events_carry_task_id() {
    let (scheduler, bus) = scheduler(1);
    let log = record(&bus);
    let p: Arc<dyn MathFunction> = Arc::new(Polynomial::new(vec![-2.0, 0.0, 1.0]));

    let handle = scheduler.submit_newton(p, 1.0, RootConfig::default());
    let id = handle.id().raw() as i64;
    let result = handle.wait().unwrap();

    let iterations: Vec<usize> = log
        .lock()
        .iter()
        .filter(|e| e.name() == Event::CONVERGENCE)
        .map(|e| {
            assert_eq!(e.integer("task"), Some(id));
            e.iteration().unwrap()
        })
        .collect();
    assert_eq!(iterations, (1..=result.iterations).collect::<Vec<_>>());
}

#[test]
fn test_cancel_running_monte_carlo() {
    let (scheduler, _) = scheduler(1);
    let slow = Arc::new(SlowFunction::new(Duration::from_millis(1)));
    let f: Arc<dyn MathFunction> = slow.clone();
    let cfg = MonteCarloConfig {
        batch_size: 8,
        ..MonteCarloConfig::seeded(1)
    };

    let handle = scheduler.submit_monte_carlo(f, 0.0, 1.0, 100_000, cfg);
    assert!(eventually(|| slow.calls() > 0));
    handle.cancel();

    let err = handle.wait().unwrap_err();
    assert!(err.is_cancelled(), "{err:?}");
    // Stopped at the next batch boundary, far short of the full run
    assert!(slow.calls() < 10_000);
    assert_eq!(scheduler.stats().cancelled, 1);
}

#[test]
fn test_cancel_fan_out_cancels_every_partition() {
    let (scheduler, bus) = scheduler(3);
    let log = record(&bus);

    let parts: Vec<_> = (0..3)
        .map(|_| {
            |ctx: &ExecutionContext| -> Result<f64> {
                loop {
                    ctx.checkpoint()?;
                    std::thread::sleep(Duration::from_millis(1));
                }
            }
        })
        .collect();
    let handle = scheduler.fan_out("spin", parts, |partials: Vec<f64>| Ok(partials.len()));
    let parent = handle.id().raw() as i64;

    assert!(eventually(|| scheduler.stats().in_flight() == 4
        && log.lock().iter().filter(|e| e.text("state") == Some("running")).count() == 4));
    handle.cancel();
    assert!(handle.wait().unwrap_err().is_cancelled());

    assert!(eventually(|| scheduler.stats().in_flight() == 0));
    let stats = scheduler.stats();
    assert_eq!(stats.submitted, 4);
    assert_eq!(stats.cancelled, 4);
    assert!(
        log.lock()
            .iter()
            .any(|e| e.integer("task") == Some(parent) && e.text("state") == Some("cancelled"))
    );
}

#[test]
fn test_cancel_parallel_integrate_after_first_partition() {
    // One worker: partitions run one after another, each taking ~100 ms
    let (scheduler, bus) = scheduler(1);
    let log = record(&bus);
    let slow = Arc::new(SlowFunction::new(Duration::from_millis(20)));
    let f: Arc<dyn MathFunction> = slow.clone();

    let handle = scheduler.parallel_integrate(f, 0.0, 4.0, 4, &IntegrationConfig::default());
    assert!(eventually(|| {
        log.lock().iter().any(|e| e.name() == Event::PARTITION_COMPLETED)
    }));
    handle.cancel();

    assert!(eventually(|| handle.state() == TaskState::Cancelled));
    let err = handle.wait().unwrap_err();
    assert!(err.is_cancelled(), "{err:?}");

    assert!(eventually(|| scheduler.stats().in_flight() == 0));
    let stats = scheduler.stats();
    assert_eq!(stats.submitted, 5);
    assert_eq!(stats.completed, 1, "only the first partition finishes");
    assert_eq!(stats.cancelled, 4, "three partitions and the parent");
    assert_eq!(stats.failed, 0);

    let completed_partitions = log
        .lock()
        .iter()
        .filter(|e| e.name() == Event::PARTITION_COMPLETED)
        .count();
    assert_eq!(completed_partitions, 1);
}

#[test]
fn test_first_failure_wins_and_stops_siblings() {
    let (scheduler, _) = scheduler(2);
    let sibling_stopped = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&sibling_stopped);

    let spin = move |ctx: &ExecutionContext| -> Result<f64> {
        let outcome = loop {
            if let Err(e) = ctx.checkpoint() {
                break Err(e);
            }
            std::thread::sleep(Duration::from_millis(1));
        };
        flag.store(true, Ordering::SeqCst);
        outcome
    };
    let fail = |_: &ExecutionContext| -> Result<f64> {
        std::thread::sleep(Duration::from_millis(20));
        Err(NumericError::domain("partition", "bad input"))
    };
    let parts: Vec<Box<dyn FnOnce(&ExecutionContext) -> Result<f64> + Send>> =
        vec![Box::new(spin), Box::new(fail)];

    let err = scheduler
        .fan_out("mixed", parts, |partials: Vec<f64>| Ok(partials.iter().sum::<f64>()))
        .wait()
        .unwrap_err();

    match err {
        NumericError::Domain { operation, .. } => assert_eq!(operation, "partition"),
        other => panic!("expected the partition's own error, got {other:?}"),
    }
    assert!(eventually(|| sibling_stopped.load(Ordering::SeqCst)));
}

#[test]
fn test_await_handle() {
    let (scheduler, _) = scheduler(2);
    let f: Arc<dyn MathFunction> = Arc::new(FnFunction::new("x", |x| x));

    let value = futures::executor::block_on(async {
        let a = scheduler.parallel_integrate(Arc::clone(&f), 0.0, 1.0, 2, &IntegrationConfig::default());
        let b = scheduler.submit("constant", |_| Ok(0.5));
        Ok::<f64, NumericError>(a.await? + b.await?)
    })
    .unwrap();

    assert_close(value, 1.0, 1e-12, "½ + ½");
}

#[test]
fn test_panicking_subscriber_does_not_break_tasks() {
    let (scheduler, bus) = scheduler(1);
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    bus.subscribe(Event::PARTITION_COMPLETED, |_| panic!("subscriber bug"));
    bus.subscribe(Event::HANDLER_ERROR, move |e| sink.lock().push(e.clone()));

    let f: Arc<dyn MathFunction> = Arc::new(FnFunction::new("one", |_| 1.0));
    let area = scheduler
        .parallel_integrate(f, 0.0, 3.0, 3, &IntegrationConfig::default())
        .wait()
        .unwrap();

    assert_close(area, 3.0, 1e-12, "∫ 1");
    assert_eq!(errors.lock().len(), 3);
}

#[test]
fn test_invalid_partition_count_fails_as_task() {
    let (scheduler, _) = scheduler(1);
    let f: Arc<dyn MathFunction> = Arc::new(FnFunction::new("one", |_| 1.0));
    let handle = scheduler.parallel_integrate(f, 0.0, 1.0, 0, &IntegrationConfig::default());
    assert_eq!(handle.wait().unwrap_err().kind(), "DomainError");
    assert_eq!(scheduler.stats().failed, 1);
}

#[test]
fn test_wait_timeout_on_quick_task() {
    let (scheduler, _) = scheduler(1);
    match scheduler.submit("quick", |_| Ok(1u8)).wait_timeout(Duration::from_secs(5)) {
        Ok(result) => assert_eq!(result, Ok(1)),
        Err(handle) => panic!("task still {:?} after five seconds", handle.state()),
    }
}

#[test]
fn test_state_names() {
    for (state, name) in [
        (TaskState::Pending, "pending"),
        (TaskState::Running, "running"),
        (TaskState::Completed, "completed"),
        (TaskState::Cancelled, "cancelled"),
        (TaskState::Failed, "failed"),
    ] {
        assert_eq!(state.as_str(), name);
    }
}
