//! Single-threaded cooperative executor for listener-owned tasks.
//!
//! Tasks are `!Send` futures polled only from the tick thread. A task is woken
//! by the tick clock (or any other waker) and polled on the next call to
//! [`Scheduler::run_ready`]; the first-priority tick hook calls it right after
//! the clock pass, before any feature hook of the same tick runs.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures::future::LocalBoxFuture;
use futures::task::{waker, ArcWake};
use futures::FutureExt;

use vantage_core::error::{TaskError, TaskResult};

use crate::listener::{Listener, ListenerId, ListenerScope};
use crate::ticker::{panic_message, Ticker};

/// Identifier of a scheduled task. `TaskId::NONE` never names a real task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    pub const NONE: TaskId = TaskId(0);

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Lifecycle of a scheduled task. Terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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
}

struct TaskShared {
    state: Cell<TaskState>,
    owner: Rc<str>,
    on_cancel: RefCell<Option<Box<dyn FnOnce()>>>,
}

/// Shared view of a task. Cloning does not duplicate the task.
#[derive(Clone)]
pub struct TaskHandle {
    id: TaskId,
    shared: Rc<TaskShared>,
}

impl TaskHandle {
    fn new(id: TaskId, owner: Rc<str>) -> Self {
        Self {
            id,
            shared: Rc::new(TaskShared {
                state: Cell::new(TaskState::Pending),
                owner,
                on_cancel: RefCell::new(None),
            }),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn state(&self) -> TaskState {
        self.shared.state.get()
    }

    pub fn is_active(&self) -> bool {
        !self.state().is_terminal()
    }

    /// Name of the listener that owns the task.
    pub fn owner(&self) -> &str {
        &self.shared.owner
    }

    /// Run `hook` once if and when the task ends up cancelled.
    ///
    /// Replaces any hook set earlier. Runs immediately if the task is
    /// already cancelled.
    pub fn on_cancel(&self, hook: impl FnOnce() + 'static) {
        match self.state() {
            TaskState::Cancelled => hook(),
            TaskState::Completed | TaskState::Failed => {}
            TaskState::Pending | TaskState::Running => {
                *self.shared.on_cancel.borrow_mut() = Some(Box::new(hook));
            }
        }
    }

    fn mark_running(&self) {
        if self.state() == TaskState::Pending {
            self.shared.state.set(TaskState::Running);
        }
    }

    /// Move into a terminal state. The first terminal state wins.
    fn finish(&self, state: TaskState) -> bool {
        if self.state().is_terminal() {
            return false;
        }
        self.shared.state.set(state);
        let hook = self.shared.on_cancel.borrow_mut().take();
        if state == TaskState::Cancelled {
            if let Some(hook) = hook {
                hook();
            }
        }
        true
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("owner", &self.shared.owner)
            .field("state", &self.state())
            .finish()
    }
}

thread_local! {
    static CURRENT_OWNER: RefCell<Option<Rc<str>>> = const { RefCell::new(None) };
}

/// Name of the listener whose task is being polled, or `"host"` outside a task.
pub(crate) fn current_owner() -> Rc<str> {
    CURRENT_OWNER
        .with(|owner| owner.borrow().clone())
        .unwrap_or_else(|| Rc::from("host"))
}

struct OwnerGuard(Option<Rc<str>>);

impl OwnerGuard {
    fn enter(owner: Rc<str>) -> Self {
        Self(CURRENT_OWNER.with(|current| current.borrow_mut().replace(owner)))
    }
}

impl Drop for OwnerGuard {
    fn drop(&mut self) {
        let previous = self.0.take();
        CURRENT_OWNER.with(|current| *current.borrow_mut() = previous);
    }
}

type ReadyQueue = Arc<Mutex<VecDeque<TaskId>>>;

struct TaskWaker {
    id: TaskId,
    ready: ReadyQueue,
}

impl ArcWake for TaskWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        let mut ready = arc_self.ready.lock().unwrap_or_else(PoisonError::into_inner);
        if !ready.contains(&arc_self.id) {
            ready.push_back(arc_self.id);
        }
    }
}

/// Fails the wrapped task as soon as its listener stops running.
struct ListenerGuard<F> {
    listener: Rc<Listener>,
    inner: Pin<Box<F>>,
}

impl<F: Future<Output = TaskResult>> Future for ListenerGuard<F> {
    type Output = TaskResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<TaskResult> {
        if !self.listener.is_running() {
            return Poll::Ready(Err(TaskError::ListenerNotActive {
                listener: self.listener.name().to_string(),
            }));
        }
        self.inner.as_mut().poll(cx)
    }
}

struct TaskSlot {
    future: Option<LocalBoxFuture<'static, TaskResult>>,
    handle: TaskHandle,
}

/// The cooperative executor plus the tick clock it resumes tasks from.
pub struct Scheduler {
    ticker: Ticker,
    tasks: RefCell<HashMap<TaskId, TaskSlot>>,
    ready: ReadyQueue,
    next_id: AtomicU64,
    scopes: RefCell<HashMap<ListenerId, Rc<ListenerScope>>>,
    polling: Cell<bool>,
}

impl Scheduler {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            ticker: Ticker::new(),
            tasks: RefCell::new(HashMap::new()),
            ready: Arc::new(Mutex::new(VecDeque::new())),
            next_id: AtomicU64::new(1),
            scopes: RefCell::new(HashMap::new()),
            polling: Cell::new(false),
        })
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    /// Scope of `listener`, created on first use.
    pub fn scope(&self, listener: &Rc<Listener>) -> Rc<ListenerScope> {
        self.scopes
            .borrow_mut()
            .entry(listener.id())
            .or_insert_with(|| Rc::new(ListenerScope::new(listener.clone())))
            .clone()
    }

    pub fn has_scope(&self, listener: &Listener) -> bool {
        self.scopes.borrow().contains_key(&listener.id())
    }

    /// Allocate a task id without spawning anything yet.
    pub fn reserve_id(&self) -> TaskId {
        TaskId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Spawn a task owned by `listener`. It is first polled by the next
    /// [`Scheduler::run_ready`].
    pub fn spawn<F>(&self, listener: &Rc<Listener>, future: F) -> TaskHandle
    where
        F: Future<Output = TaskResult> + 'static,
    {
        let id = self.reserve_id();
        self.spawn_with_id(id, listener, future)
    }

    /// Spawn under an id obtained from [`Scheduler::reserve_id`].
    pub fn spawn_with_id<F>(&self, id: TaskId, listener: &Rc<Listener>, future: F) -> TaskHandle
    where
        F: Future<Output = TaskResult> + 'static,
    {
        let handle = TaskHandle::new(id, listener.shared_name());
        let guarded = ListenerGuard {
            listener: listener.clone(),
            inner: Box::pin(future),
        };
        self.tasks.borrow_mut().insert(
            id,
            TaskSlot {
                future: Some(guarded.boxed_local()),
                handle: handle.clone(),
            },
        );
        self.scope(listener).adopt(handle.clone());
        self.enqueue(id);
        handle
    }

    fn enqueue(&self, id: TaskId) {
        let mut ready = self.ready.lock().unwrap_or_else(PoisonError::into_inner);
        if !ready.contains(&id) {
            ready.push_back(id);
        }
    }

    fn pop_ready(&self) -> Option<TaskId> {
        self.ready
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    /// Cancel a task. Cancelling a finished task is a no-op.
    pub fn cancel(&self, handle: &TaskHandle) {
        if !handle.finish(TaskState::Cancelled) {
            return;
        }
        let slot = self.tasks.borrow_mut().remove(&handle.id);
        // Dropping the future may run destructors that touch the scheduler.
        drop(slot);
    }

    pub fn cancel_id(&self, id: TaskId) {
        let handle = self.tasks.borrow().get(&id).map(|slot| slot.handle.clone());
        if let Some(handle) = handle {
            self.cancel(&handle);
        }
    }

    /// Poll every woken task until none is left.
    ///
    /// Re-entrant calls (a task posting an event) return at once; the
    /// outer call keeps draining the queue.
    pub fn run_ready(&self) {
        if self.polling.replace(true) {
            return;
        }
        self.drain_ready();
        self.polling.set(false);
    }

    fn drain_ready(&self) {
        while let Some(id) = self.pop_ready() {
            let taken = {
                let mut tasks = self.tasks.borrow_mut();
                tasks
                    .get_mut(&id)
                    .and_then(|slot| slot.future.take().map(|f| (f, slot.handle.clone())))
            };
            let Some((mut future, handle)) = taken else {
                continue;
            };
            handle.mark_running();

            let waker = waker(Arc::new(TaskWaker {
                id,
                ready: self.ready.clone(),
            }));
            let mut cx = Context::from_waker(&waker);
            let polled = {
                let _owner = OwnerGuard::enter(handle.shared.owner.clone());
                panic::catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut cx)))
            };

            match polled {
                Ok(Poll::Pending) => {
                    if handle.is_active() {
                        if let Some(slot) = self.tasks.borrow_mut().get_mut(&id) {
                            slot.future = Some(future);
                            continue;
                        }
                    }
                    drop(future);
                }
                Ok(Poll::Ready(result)) => {
                    drop(future);
                    self.tasks.borrow_mut().remove(&id);
                    self.complete(&handle, result);
                }
                Err(payload) => {
                    drop(future);
                    self.tasks.borrow_mut().remove(&id);
                    log::error!(
                        "task {} of {} panicked: {}",
                        id.0,
                        handle.owner(),
                        panic_message(payload.as_ref())
                    );
                    handle.finish(TaskState::Failed);
                }
            }
        }
    }

    fn complete(&self, handle: &TaskHandle, result: TaskResult) {
        match result {
            Ok(()) => {
                handle.finish(TaskState::Completed);
            }
            Err(err) if err.is_cancellation() => {
                log::debug!("task {} of {} ended: {}", handle.id.0, handle.owner(), err);
                handle.finish(TaskState::Cancelled);
            }
            Err(err) => {
                log::error!("task {} of {} failed: {}", handle.id.0, handle.owner(), err);
                handle.finish(TaskState::Failed);
            }
        }
    }

    /// Whether `id` names a task that has not reached a terminal state.
    pub fn is_active(&self, id: TaskId) -> bool {
        self.tasks
            .borrow()
            .get(&id)
            .is_some_and(|slot| slot.handle.is_active())
    }

    /// State of a live task. Finished tasks are forgotten; keep the
    /// [`TaskHandle`] to observe their terminal state.
    pub fn state_of(&self, id: TaskId) -> Option<TaskState> {
        self.tasks.borrow().get(&id).map(|slot| slot.handle.state())
    }

    pub fn task_count(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Tear down the scope of `listener`, cancelling every task it owns.
    pub fn remove_scope(&self, listener: &Listener) {
        let scope = self.scopes.borrow_mut().remove(&listener.id());
        if let Some(scope) = scope {
            log::debug!(
                "cancelling {} task(s) of {}",
                scope.active_tasks(),
                listener.name()
            );
            scope.cancel_all(self);
        }
    }

    /// One clock pass followed by polling every task it woke.
    pub fn tick(&self) {
        self.ticker.tick();
        self.run_ready();
    }
}
