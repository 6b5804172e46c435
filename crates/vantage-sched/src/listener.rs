//! Listener identity and the per-listener task scope.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::executor::{Scheduler, TaskHandle};

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// A feature that owns hooks and tasks and can be switched on and off.
pub struct Listener {
    id: ListenerId,
    name: Rc<str>,
    running: Cell<bool>,
}

impl Listener {
    /// Create a running listener.
    pub fn new(name: &str) -> Rc<Self> {
        Rc::new(Self {
            id: ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed)),
            name: Rc::from(name),
            running: Cell::new(true),
        })
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Rc<str> {
        self.name.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Flip the liveness flag. Suspended tasks notice on their next resume.
    pub fn set_running(&self, running: bool) {
        self.running.set(running);
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("running", &self.running.get())
            .finish()
    }
}

/// Tasks spawned on behalf of one listener.
///
/// Created lazily by [`Scheduler::scope`]; cancelling it cancels every
/// task it still owns.
pub struct ListenerScope {
    listener: Rc<Listener>,
    tasks: RefCell<Vec<TaskHandle>>,
}

impl ListenerScope {
    pub(crate) fn new(listener: Rc<Listener>) -> Self {
        Self {
            listener,
            tasks: RefCell::new(Vec::new()),
        }
    }

    pub fn listener(&self) -> &Rc<Listener> {
        &self.listener
    }

    pub(crate) fn adopt(&self, task: TaskHandle) {
        let mut tasks = self.tasks.borrow_mut();
        tasks.retain(TaskHandle::is_active);
        tasks.push(task);
    }

    /// Number of tasks of this scope that have not reached a terminal state.
    pub fn active_tasks(&self) -> usize {
        self.tasks.borrow().iter().filter(|t| t.is_active()).count()
    }

    pub(crate) fn cancel_all(&self, scheduler: &Scheduler) {
        let tasks = std::mem::take(&mut *self.tasks.borrow_mut());
        for task in tasks {
            scheduler.cancel(&task);
        }
    }
}
