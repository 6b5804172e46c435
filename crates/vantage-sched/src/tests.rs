use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::FutureExt;

use vantage_core::constants::{
    PRIORITY_DEFAULT, PRIORITY_FIRST, PRIORITY_READ_FINAL_STATE, PRIORITY_SAFETY_FEATURE,
};
use vantage_core::error::{TaskError, TaskResult};
use vantage_core::events::Event;

use crate::{Listener, Runtime, SuspendBehavior, SuspendHandler, TaskState, Ticker};

#[derive(Debug, Clone, PartialEq)]
struct Ping(u32);

impl Event for Ping {}

fn counter() -> Rc<Cell<u32>> {
    Rc::new(Cell::new(0))
}

#[test]
fn test_tick_until_resumes_exactly_at_k() {
    let runtime = Runtime::new();
    let listener = Listener::new("Waiter");
    let ticker = runtime.ticker().clone();
    let resumed = Rc::new(Cell::new(None));

    let out = resumed.clone();
    runtime.scheduler().spawn(&listener, async move {
        let elapsed = ticker.tick_until(|it| it >= 3).await;
        out.set(Some(elapsed));
        Ok::<(), TaskError>(())
    });
    runtime.scheduler().run_ready();

    runtime.tick();
    runtime.tick();
    assert_eq!(resumed.get(), None, "resumed before tick 3");
    runtime.tick();
    assert_eq!(resumed.get(), Some(3));
}

#[test]
fn test_callback_registered_during_pass_waits_for_next_pass() {
    let ticker = Ticker::new();
    let inner_runs = counter();

    let registrar = ticker.clone();
    let runs = inner_runs.clone();
    ticker.register("outer", move || {
        let runs = runs.clone();
        registrar.register("inner", move || {
            runs.set(runs.get() + 1);
            false
        });
        true
    });

    ticker.tick();
    assert_eq!(inner_runs.get(), 0);
    ticker.tick();
    assert_eq!(inner_runs.get(), 1);
    ticker.tick();
    assert_eq!(inner_runs.get(), 2);
}

#[test]
fn test_hooks_run_in_descending_priority_stable_for_ties() {
    let runtime = Runtime::new();
    let listener = Listener::new("Order");
    let order = Rc::new(RefCell::new(Vec::new()));

    for (label, priority) in [("a", 0), ("b", 10), ("c", -5), ("d", 10), ("e", 0)] {
        let order = order.clone();
        runtime.handler::<Ping>(&listener, priority, move |_| order.borrow_mut().push(label));
    }
    runtime.post(&mut Ping(0));

    assert_eq!(*order.borrow(), vec!["b", "d", "a", "e", "c"]);
}

#[test]
fn test_unregister_during_dispatch_is_safe() {
    let runtime = Runtime::new();
    let listener = Listener::new("SelfRemoving");
    let events = runtime.events().clone();
    let calls = counter();

    let hook_id = Rc::new(Cell::new(None));
    let id_slot = hook_id.clone();
    let seen = calls.clone();
    let id = runtime.handler::<Ping>(&listener, PRIORITY_DEFAULT, move |_| {
        seen.set(seen.get() + 1);
        if let Some(id) = id_slot.get() {
            events.unregister::<Ping>(id);
        }
    });
    hook_id.set(Some(id));

    runtime.post(&mut Ping(1));
    runtime.post(&mut Ping(2));
    assert_eq!(calls.get(), 1);
    assert_eq!(runtime.events().hook_count::<Ping>(), 0);
}

#[test]
fn test_hooks_of_stopped_listener_are_skipped() {
    let runtime = Runtime::new();
    let listener = Listener::new("Sleeper");
    let calls = counter();
    let seen = calls.clone();
    runtime.handler::<Ping>(&listener, PRIORITY_DEFAULT, move |_| seen.set(seen.get() + 1));

    runtime.disable_listener(&listener);
    runtime.post(&mut Ping(1));
    assert_eq!(calls.get(), 0);

    runtime.enable_listener(&listener);
    runtime.post(&mut Ping(2));
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_discard_latest_spawns_exactly_one_task() {
    let runtime = Runtime::new();
    let listener = Listener::new("Discarder");
    let started = counter();

    let ticker = runtime.ticker().clone();
    let runs = started.clone();
    let handler = runtime.suspend_handler(
        &listener,
        PRIORITY_DEFAULT,
        SuspendBehavior::discard_latest(),
        move |_: Ping| {
            let ticker = ticker.clone();
            let runs = runs.clone();
            async move {
                runs.set(runs.get() + 1);
                ticker.wait_ticks(5).await;
                Ok::<(), TaskError>(())
            }
        },
    );

    // Both admissions land before the executor polls anything.
    handler.admit(Ping(1));
    handler.admit(Ping(2));
    runtime.post(&mut Ping(3));

    assert_eq!(started.get(), 1);
    assert_eq!(runtime.scheduler().task_count(), 1);
    assert!(handler.active_task().is_some());
}

#[test]
fn test_wait_ticks_zero_returns_synchronously() {
    let ticker = Ticker::new();
    assert_eq!(ticker.wait_ticks(0).now_or_never(), Some(()));
    assert_eq!(ticker.scheduled(), 0);
    assert_eq!(ticker.passes(), 0);
}

#[test]
fn test_tick_conditional_zero_checks_once() {
    let ticker = Ticker::new();
    assert_eq!(ticker.tick_conditional(0, || false).now_or_never(), Some(true));
    assert_eq!(ticker.tick_conditional(0, || true).now_or_never(), Some(false));
    assert_eq!(ticker.scheduled(), 0);
}

fn run_tick_conditional(break_at: Option<u32>) -> Vec<Option<bool>> {
    let runtime = Runtime::new();
    let listener = Listener::new("Conditional");
    let ticker = runtime.ticker().clone();
    let now = counter();
    let result = Rc::new(Cell::new(None));

    let clock = now.clone();
    let out = result.clone();
    runtime.scheduler().spawn(&listener, async move {
        let full = ticker
            .tick_conditional(5, move || break_at.is_some_and(|at| clock.get() >= at))
            .await;
        out.set(Some(full));
        Ok::<(), TaskError>(())
    });
    runtime.scheduler().run_ready();

    (1..=5)
        .map(|tick| {
            now.set(tick);
            runtime.tick();
            result.get()
        })
        .collect()
}

#[test]
fn test_tick_conditional_full_duration() {
    let results = run_tick_conditional(None);
    assert_eq!(results, vec![None, None, None, None, Some(true)]);
}

#[test]
fn test_tick_conditional_breaks_early() {
    let results = run_tick_conditional(Some(3));
    assert_eq!(results[1], None);
    assert_eq!(results[2], Some(false));
}

#[test]
fn test_suspend_processes_in_arrival_order() {
    let runtime = Runtime::new();
    let listener = Listener::new("Serial");
    let ticker = runtime.ticker().clone();
    let log = Rc::new(RefCell::new(Vec::new()));

    let seen = log.clone();
    let handler = runtime.suspend_handler(
        &listener,
        PRIORITY_DEFAULT,
        SuspendBehavior::Suspend,
        move |ping: Ping| {
            let ticker = ticker.clone();
            let seen = seen.clone();
            async move {
                ticker.wait_ticks(1).await;
                seen.borrow_mut().push(ping.0);
                Ok::<(), TaskError>(())
            }
        },
    );

    for id in 1..=3 {
        runtime.post(&mut Ping(id));
    }
    assert_eq!(handler.queued(), 2);
    let worker = handler.active_task();
    assert!(worker.is_some());

    runtime.tick();
    assert_eq!(*log.borrow(), vec![1]);
    runtime.tick();
    runtime.tick();
    assert_eq!(*log.borrow(), vec![1, 2, 3]);

    // The worker ends once the queue is empty; the next event starts a new one.
    assert_eq!(handler.active_task(), None);
    runtime.post(&mut Ping(4));
    assert!(handler.active_task().is_some());
    assert_ne!(handler.active_task(), worker);
}

#[test]
fn test_event_admitted_while_worker_is_cancelled_starts_new_worker() {
    let runtime = Runtime::new();
    let listener = Listener::new("SelfCancelling");
    let log = Rc::new(RefCell::new(Vec::new()));
    let slot: Rc<RefCell<Option<Rc<SuspendHandler<Ping>>>>> = Rc::new(RefCell::new(None));

    let seen = log.clone();
    let own = slot.clone();
    let handler = runtime.suspend_handler(
        &listener,
        PRIORITY_DEFAULT,
        SuspendBehavior::Suspend,
        move |ping: Ping| {
            let seen = seen.clone();
            let own = own.clone();
            async move {
                seen.borrow_mut().push(ping.0);
                if ping.0 == 1 {
                    // Cancel the worker mid-poll, then hand it another event
                    // before its future is dropped.
                    let handler = own.borrow().clone();
                    if let Some(handler) = handler {
                        let worker = handler.active_task();
                        handler.cancel();
                        assert_eq!(handler.active_task(), None);
                        handler.admit(Ping(2));
                        assert_ne!(handler.active_task(), worker);
                    }
                }
                Ok::<(), TaskError>(())
            }
        },
    );
    *slot.borrow_mut() = Some(handler.clone());

    runtime.post(&mut Ping(1));
    runtime.scheduler().run_ready();

    assert_eq!(*log.borrow(), vec![1, 2]);
    assert_eq!(handler.queued(), 0);
    assert_eq!(handler.active_task(), None);

    runtime.post(&mut Ping(3));
    assert_eq!(*log.borrow(), vec![1, 2, 3]);
    slot.borrow_mut().take();
}

#[test]
fn test_cancelling_scope_abandons_suspend_queue() {
    let runtime = Runtime::new();
    let listener = Listener::new("PacketQueue");
    let ticker = runtime.ticker().clone();
    let log = Rc::new(RefCell::new(Vec::new()));

    let seen = log.clone();
    let handler = runtime.suspend_handler(
        &listener,
        PRIORITY_DEFAULT,
        SuspendBehavior::Suspend,
        move |ping: Ping| {
            let ticker = ticker.clone();
            let seen = seen.clone();
            async move {
                ticker.wait_ticks(1).await;
                seen.borrow_mut().push(ping.0);
                Ok::<(), TaskError>(())
            }
        },
    );
    for id in 1..=3 {
        runtime.post(&mut Ping(id));
    }
    runtime.tick();
    assert_eq!(*log.borrow(), vec![1]);

    runtime.disable_listener(&listener);
    assert_eq!(handler.queued(), 0);
    assert_eq!(handler.active_task(), None);

    for _ in 0..5 {
        runtime.tick();
    }
    assert_eq!(*log.borrow(), vec![1]);
}

#[test]
fn test_cancel_previous_replaces_in_flight_task() {
    let runtime = Runtime::new();
    let listener = Listener::new("Restarter");
    let ticker = runtime.ticker().clone();
    let log = Rc::new(RefCell::new(Vec::new()));

    let seen = log.clone();
    let handler = runtime.suspend_handler(
        &listener,
        PRIORITY_DEFAULT,
        SuspendBehavior::CancelPrevious,
        move |ping: Ping| {
            let ticker = ticker.clone();
            let seen = seen.clone();
            async move {
                ticker.wait_ticks(2).await;
                seen.borrow_mut().push(ping.0);
                Ok::<(), TaskError>(())
            }
        },
    );

    runtime.post(&mut Ping(1));
    let first = handler.active_task().expect("first task in flight");
    runtime.tick();
    runtime.post(&mut Ping(2));
    assert!(!runtime.scheduler().is_active(first));

    runtime.tick();
    runtime.tick();
    assert_eq!(*log.borrow(), vec![2]);
}

#[test]
fn test_on_cancel_runs_once_and_only_for_cancelled_tasks() {
    let runtime = Runtime::new();
    let listener = Listener::new("Parallel");
    let ticker = runtime.ticker().clone();
    let cancelled = counter();

    let hook_count = cancelled.clone();
    let handler = runtime.suspend_handler(
        &listener,
        PRIORITY_DEFAULT,
        SuspendBehavior::parallel().with_on_cancel(move || hook_count.set(hook_count.get() + 1)),
        move |ping: Ping| {
            let ticker = ticker.clone();
            async move {
                ticker.wait_ticks(ping.0).await;
                if ping.0 == 99 {
                    return Err(TaskError::Failed("bad ping".into()));
                }
                Ok(())
            }
        },
    );

    runtime.post(&mut Ping(1));
    runtime.post(&mut Ping(99));
    runtime.tick();
    assert_eq!(cancelled.get(), 0, "completion must not fire the hook");

    runtime.post(&mut Ping(50));
    let task = handler.active_task().expect("long task in flight");
    runtime.scheduler().cancel_id(task);
    runtime.scheduler().cancel_id(task);
    assert_eq!(cancelled.get(), 1);

    for _ in 0..100 {
        runtime.tick();
    }
    assert_eq!(cancelled.get(), 1, "failure must not fire the hook");
}

#[test]
fn test_panicking_tick_callback_is_isolated() {
    let ticker = Ticker::new();
    let runs = counter();

    ticker.register("Faulty", || panic!("callback fault"));
    let seen = runs.clone();
    ticker.register("Healthy", move || {
        seen.set(seen.get() + 1);
        false
    });

    ticker.tick();
    ticker.tick();
    assert_eq!(runs.get(), 2);
    assert_eq!(ticker.scheduled(), 1);
}

fn explode() -> TaskResult {
    panic!("task fault")
}

#[test]
fn test_panicking_task_is_failed_without_affecting_others() {
    let runtime = Runtime::new();
    let faulty = Listener::new("Faulty");
    let healthy = Listener::new("Healthy");
    let ticker = runtime.ticker().clone();

    let crashing = runtime.scheduler().spawn(&faulty, async { explode() });
    let finishing = runtime.scheduler().spawn(&healthy, async move {
        ticker.wait_ticks(1).await;
        Ok::<(), TaskError>(())
    });
    runtime.scheduler().run_ready();
    runtime.tick();

    assert_eq!(crashing.state(), TaskState::Failed);
    assert_eq!(finishing.state(), TaskState::Completed);
}

#[test]
fn test_resume_after_listener_stopped_is_cancelled() {
    let runtime = Runtime::new();
    let listener = Listener::new("Stopped");
    let ticker = runtime.ticker().clone();
    let reached = Rc::new(Cell::new(false));

    let flag = reached.clone();
    let task = runtime.scheduler().spawn(&listener, async move {
        ticker.wait_ticks(2).await;
        flag.set(true);
        Ok::<(), TaskError>(())
    });
    runtime.scheduler().run_ready();
    assert_eq!(task.state(), TaskState::Running);

    listener.set_running(false);
    runtime.tick();
    runtime.tick();
    assert!(!reached.get());
    assert_eq!(task.state(), TaskState::Cancelled);
}

#[test]
fn test_remove_scope_cancels_all_and_is_idempotent() {
    let runtime = Runtime::new();
    let listener = Listener::new("Scoped");
    let ticker = runtime.ticker().clone();

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let ticker = ticker.clone();
            runtime.scheduler().spawn(&listener, async move {
                ticker.wait_seconds(1).await;
                Ok::<(), TaskError>(())
            })
        })
        .collect();
    runtime.scheduler().run_ready();
    assert!(runtime.scheduler().has_scope(&listener));

    runtime.disable_listener(&listener);
    runtime.disable_listener(&listener);
    assert!(tasks.iter().all(|t| t.state() == TaskState::Cancelled));
    assert!(!runtime.scheduler().has_scope(&listener));
    assert_eq!(runtime.scheduler().task_count(), 0);

    // Abandoned waits are dropped on the next pass.
    runtime.tick();
    assert_eq!(runtime.ticker().scheduled(), 0);
}

#[test]
fn test_wait_matches_resolves_on_first_match() {
    let runtime = Runtime::new();
    let listener = Listener::new("Matcher");
    let events = runtime.events().clone();
    let matched = Rc::new(Cell::new(None));

    let out = matched.clone();
    let watcher = listener.clone();
    runtime.scheduler().spawn(&listener, async move {
        let ping = events
            .wait_matches::<Ping>(&watcher, PRIORITY_DEFAULT, |ping| ping.0 % 2 == 0)
            .await;
        out.set(Some(ping.0));
        Ok::<(), TaskError>(())
    });
    runtime.scheduler().run_ready();
    assert_eq!(runtime.events().hook_count::<Ping>(), 1);

    runtime.post(&mut Ping(1));
    assert_eq!(matched.get(), None);
    runtime.post(&mut Ping(4));
    runtime.post(&mut Ping(6));
    assert_eq!(matched.get(), Some(4));
    assert_eq!(runtime.events().hook_count::<Ping>(), 0);
}

#[test]
fn test_dropped_wait_matches_unregisters() {
    let runtime = Runtime::new();
    let listener = Listener::new("Impatient");
    let wait = runtime
        .events()
        .wait_matches::<Ping>(&listener, PRIORITY_FIRST, |_| true);
    assert_eq!(runtime.events().hook_count::<Ping>(), 1);
    drop(wait);
    assert_eq!(runtime.events().hook_count::<Ping>(), 0);
}

#[test]
fn test_tick_handler_reruns_after_previous_body_finished() {
    let runtime = Runtime::new();
    let listener = Listener::new("Ticking");
    let ticker = runtime.ticker().clone();
    let runs = counter();

    let seen = runs.clone();
    runtime.tick_handler(&listener, move || {
        let ticker = ticker.clone();
        let seen = seen.clone();
        async move {
            seen.set(seen.get() + 1);
            ticker.wait_ticks(2).await;
            Ok::<(), TaskError>(())
        }
    });

    for _ in 0..6 {
        runtime.tick();
    }
    assert_eq!(runs.get(), 3);
    assert_eq!(runtime.current_tick(), 6);
}

#[test]
fn test_sequence_handler_runs_events_side_by_side() {
    let runtime = Runtime::new();
    let listener = Listener::new("Sequence");
    let ticker = runtime.ticker().clone();
    let log = Rc::new(RefCell::new(Vec::new()));

    let seen = log.clone();
    let handler = runtime.sequence_handler(&listener, move |ping: Ping| {
        let ticker = ticker.clone();
        let seen = seen.clone();
        async move {
            seen.borrow_mut().push(("start", ping.0));
            ticker.wait_ticks(2).await;
            seen.borrow_mut().push(("end", ping.0));
            Ok::<(), TaskError>(())
        }
    });

    // Hooks on either side of the default tier see the event before and
    // after the sequence spawned its task.
    let counts = Rc::new(RefCell::new(Vec::new()));
    for priority in [PRIORITY_READ_FINAL_STATE, PRIORITY_SAFETY_FEATURE] {
        let scheduler = runtime.scheduler().clone();
        let counts = counts.clone();
        runtime.handler::<Ping>(&listener, priority, move |_| {
            counts.borrow_mut().push((priority, scheduler.task_count()));
        });
    }

    runtime.post(&mut Ping(1));
    runtime.post(&mut Ping(2));
    assert_eq!(*log.borrow(), vec![("start", 1), ("start", 2)]);
    assert!(handler.active_task().is_some());

    {
        let counts = counts.borrow();
        assert_eq!(counts.len(), 4);
        for pair in counts.chunks(2) {
            assert_eq!(pair[0].0, PRIORITY_SAFETY_FEATURE);
            assert_eq!(pair[1].0, PRIORITY_READ_FINAL_STATE);
            assert_eq!(pair[1].1, pair[0].1 + 1);
        }
    }

    runtime.tick();
    runtime.tick();
    assert_eq!(
        *log.borrow(),
        vec![("start", 1), ("start", 2), ("end", 1), ("end", 2)]
    );
    assert_eq!(handler.active_task(), None);
}
