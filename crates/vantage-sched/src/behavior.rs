//! Policies reconciling a new event with tasks spawned for earlier ones.
//!
//! A [`SuspendBehavior`] is picked when a handler is registered and turned
//! into a [`SuspendHandler`], which owns the per-registration state: the
//! queue of a serializing worker, or the id of the task currently in flight.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::LocalBoxFuture;
use futures::FutureExt;

use vantage_core::error::TaskResult;
use vantage_core::events::Event;

use crate::executor::{Scheduler, TaskHandle, TaskId};
use crate::listener::Listener;

type OnCancel = Rc<dyn Fn()>;
type TaskBody<E> = Rc<dyn Fn(E) -> LocalBoxFuture<'static, TaskResult>>;

#[derive(Clone)]
pub enum SuspendBehavior {
    /// Every event gets its own task.
    Parallel { on_cancel: Option<OnCancel> },
    /// One worker drains the events in arrival order.
    Suspend,
    /// A new event cancels the task of the previous one.
    CancelPrevious,
    /// Events arriving while a task is active are dropped.
    DiscardLatest { on_cancel: Option<OnCancel> },
}

impl Default for SuspendBehavior {
    fn default() -> Self {
        Self::parallel()
    }
}

impl SuspendBehavior {
    pub fn parallel() -> Self {
        SuspendBehavior::Parallel { on_cancel: None }
    }

    pub fn discard_latest() -> Self {
        SuspendBehavior::DiscardLatest { on_cancel: None }
    }

    /// Attach a hook run when one of the spawned tasks is cancelled.
    ///
    /// Only `Parallel` and `DiscardLatest` carry one; other policies are
    /// returned unchanged.
    pub fn with_on_cancel(self, hook: impl Fn() + 'static) -> Self {
        match self {
            SuspendBehavior::Parallel { .. } => SuspendBehavior::Parallel {
                on_cancel: Some(Rc::new(hook)),
            },
            SuspendBehavior::DiscardLatest { .. } => SuspendBehavior::DiscardLatest {
                on_cancel: Some(Rc::new(hook)),
            },
            other => other,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SuspendBehavior::Parallel { .. } => "Parallel",
            SuspendBehavior::Suspend => "Suspend",
            SuspendBehavior::CancelPrevious => "CancelPrevious",
            SuspendBehavior::DiscardLatest { .. } => "DiscardLatest",
        }
    }
}

impl fmt::Debug for SuspendBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuspendBehavior::Parallel { on_cancel } | SuspendBehavior::DiscardLatest { on_cancel } => f
                .debug_struct(self.name())
                .field("on_cancel", &on_cancel.is_some())
                .finish(),
            _ => f.write_str(self.name()),
        }
    }
}

struct SuspendQueue<E> {
    pending: RefCell<VecDeque<E>>,
    worker: Cell<Option<TaskId>>,
}

/// Resets the queue when the worker ends, however it ends, unless a
/// successor has already taken it over.
struct WorkerGuard<E> {
    queue: Rc<SuspendQueue<E>>,
    id: TaskId,
}

impl<E> Drop for WorkerGuard<E> {
    fn drop(&mut self) {
        if self.queue.worker.get() != Some(self.id) {
            return;
        }
        self.queue.worker.set(None);
        self.queue.pending.borrow_mut().clear();
    }
}

enum PolicyState<E> {
    Parallel {
        tasks: RefCell<Vec<TaskHandle>>,
        on_cancel: Option<OnCancel>,
    },
    Suspend {
        queue: Rc<SuspendQueue<E>>,
    },
    CancelPrevious {
        current: AtomicU64,
    },
    DiscardLatest {
        current: AtomicU64,
        on_cancel: Option<OnCancel>,
    },
}

/// Admits events of one listener/event-type pairing under a policy.
pub struct SuspendHandler<E> {
    scheduler: Rc<Scheduler>,
    listener: Rc<Listener>,
    body: TaskBody<E>,
    state: PolicyState<E>,
}

impl<E: Event> SuspendHandler<E> {
    pub fn new<F, Fut>(
        scheduler: &Rc<Scheduler>,
        listener: &Rc<Listener>,
        behavior: SuspendBehavior,
        body: F,
    ) -> Self
    where
        F: Fn(E) -> Fut + 'static,
        Fut: Future<Output = TaskResult> + 'static,
    {
        let state = match behavior {
            SuspendBehavior::Parallel { on_cancel } => PolicyState::Parallel {
                tasks: RefCell::new(Vec::new()),
                on_cancel,
            },
            SuspendBehavior::Suspend => PolicyState::Suspend {
                queue: Rc::new(SuspendQueue {
                    pending: RefCell::new(VecDeque::new()),
                    worker: Cell::new(None),
                }),
            },
            SuspendBehavior::CancelPrevious => PolicyState::CancelPrevious {
                current: AtomicU64::new(TaskId::NONE.raw()),
            },
            SuspendBehavior::DiscardLatest { on_cancel } => PolicyState::DiscardLatest {
                current: AtomicU64::new(TaskId::NONE.raw()),
                on_cancel,
            },
        };
        Self {
            scheduler: scheduler.clone(),
            listener: listener.clone(),
            body: Rc::new(move |event| body(event).boxed_local()),
            state,
        }
    }

    /// Hand an event to the policy.
    pub fn admit(&self, event: E) {
        match &self.state {
            PolicyState::Parallel { tasks, on_cancel } => {
                let handle = self.spawn_body(TaskId::NONE, event);
                if let Some(hook) = on_cancel {
                    let hook = hook.clone();
                    handle.on_cancel(move || hook());
                }
                let mut tasks = tasks.borrow_mut();
                tasks.retain(TaskHandle::is_active);
                tasks.push(handle);
            }
            PolicyState::Suspend { queue } => {
                // A cancelled worker may not have been dropped yet.
                let running = queue
                    .worker
                    .get()
                    .is_some_and(|id| self.scheduler.is_active(id));
                if !running {
                    queue.pending.borrow_mut().clear();
                }
                queue.pending.borrow_mut().push_back(event);
                if !running {
                    self.start_worker(queue);
                }
            }
            PolicyState::CancelPrevious { current } => {
                let id = self.scheduler.reserve_id();
                let previous = current.swap(id.raw(), Ordering::AcqRel);
                if previous != TaskId::NONE.raw() {
                    self.scheduler.cancel_id(TaskId(previous));
                }
                self.spawn_body(id, event);
            }
            PolicyState::DiscardLatest { current, on_cancel } => loop {
                let observed = current.load(Ordering::Acquire);
                if observed != TaskId::NONE.raw() && self.scheduler.is_active(TaskId(observed)) {
                    return;
                }
                let id = self.scheduler.reserve_id();
                if current
                    .compare_exchange(observed, id.raw(), Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    let handle = self.spawn_body(id, event);
                    if let Some(hook) = on_cancel {
                        let hook = hook.clone();
                        handle.on_cancel(move || hook());
                    }
                    return;
                }
            },
        }
    }

    fn spawn_body(&self, id: TaskId, event: E) -> TaskHandle {
        let future = (self.body)(event);
        if id == TaskId::NONE {
            self.scheduler.spawn(&self.listener, future)
        } else {
            self.scheduler.spawn_with_id(id, &self.listener, future)
        }
    }

    fn start_worker(&self, queue: &Rc<SuspendQueue<E>>) {
        let id = self.scheduler.reserve_id();
        let guard = WorkerGuard {
            queue: queue.clone(),
            id,
        };
        let queue = queue.clone();
        let body = self.body.clone();
        let scheduler = Rc::downgrade(&self.scheduler);
        queue.worker.set(Some(id));
        self.scheduler.spawn_with_id(id, &self.listener, async move {
            let _guard = guard;
            loop {
                if !scheduler.upgrade().is_some_and(|s| s.is_active(id)) {
                    return Ok(());
                }
                let next = queue.pending.borrow_mut().pop_front();
                let Some(event) = next else {
                    return Ok(());
                };
                body(event).await?;
            }
        });
    }

    /// Id of the task currently in flight, if any.
    pub fn active_task(&self) -> Option<TaskId> {
        let id = match &self.state {
            PolicyState::Parallel { tasks, .. } => tasks
                .borrow()
                .iter()
                .rev()
                .find(|task| task.is_active())
                .map(TaskHandle::id),
            PolicyState::Suspend { queue } => queue.worker.get(),
            PolicyState::CancelPrevious { current } | PolicyState::DiscardLatest { current, .. } => {
                Some(TaskId(current.load(Ordering::Acquire)))
            }
        };
        id.filter(|id| self.scheduler.is_active(*id))
    }

    /// Events waiting for the serializing worker. Always 0 for other policies.
    pub fn queued(&self) -> usize {
        match &self.state {
            PolicyState::Suspend { queue } => queue.pending.borrow().len(),
            _ => 0,
        }
    }

    /// Cancel whatever this registration has in flight.
    pub fn cancel(&self) {
        match &self.state {
            PolicyState::Parallel { tasks, .. } => {
                let tasks = std::mem::take(&mut *tasks.borrow_mut());
                for task in tasks {
                    self.scheduler.cancel(&task);
                }
            }
            PolicyState::Suspend { queue } => {
                if let Some(id) = queue.worker.get() {
                    self.scheduler.cancel_id(id);
                }
            }
            PolicyState::CancelPrevious { current } | PolicyState::DiscardLatest { current, .. } => {
                let id = current.swap(TaskId::NONE.raw(), Ordering::AcqRel);
                self.scheduler.cancel_id(TaskId(id));
            }
        }
    }
}
