//! Wiring of the hook registry and the scheduler for one session.

use std::cell::Cell;
use std::future::Future;
use std::rc::{Rc, Weak};

use vantage_core::constants::{PRIORITY_DEFAULT, PRIORITY_FIRST};
use vantage_core::error::TaskResult;
use vantage_core::events::{Event, GameTickEvent};

use crate::behavior::{SuspendBehavior, SuspendHandler};
use crate::events::{EventManager, HookId};
use crate::executor::Scheduler;
use crate::listener::Listener;
use crate::ticker::Ticker;

impl Scheduler {
    /// Drive this scheduler from `GameTickEvent`s dispatched through `events`.
    ///
    /// The hook runs at [`PRIORITY_FIRST`] so resumed tasks make progress
    /// before any feature hook of the same tick.
    pub fn install(self: &Rc<Self>, events: &EventManager) -> Rc<Listener> {
        let listener = Listener::new("Scheduler");
        let scheduler: Weak<Scheduler> = Rc::downgrade(self);
        events.register::<GameTickEvent>(&listener, PRIORITY_FIRST, move |_| {
            if let Some(scheduler) = scheduler.upgrade() {
                scheduler.tick();
            }
        });
        listener
    }
}

/// Event hooks plus the scheduler that resumes tasks on tick boundaries.
pub struct Runtime {
    events: Rc<EventManager>,
    scheduler: Rc<Scheduler>,
    system: Rc<Listener>,
    tick: Cell<u64>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    pub fn new() -> Self {
        let events = EventManager::new();
        let scheduler = Scheduler::new();
        let system = scheduler.install(&events);
        Self {
            events,
            scheduler,
            system,
            tick: Cell::new(0),
        }
    }

    pub fn events(&self) -> &Rc<EventManager> {
        &self.events
    }

    pub fn scheduler(&self) -> &Rc<Scheduler> {
        &self.scheduler
    }

    pub fn ticker(&self) -> &Ticker {
        self.scheduler.ticker()
    }

    /// The listener owning the scheduler's own tick hook.
    pub fn system_listener(&self) -> &Rc<Listener> {
        &self.system
    }

    /// Number of ticks posted so far.
    pub fn current_tick(&self) -> u64 {
        self.tick.get()
    }

    /// Plain synchronous hook.
    pub fn handler<E: Event>(
        &self,
        listener: &Rc<Listener>,
        priority: i16,
        handler: impl Fn(&mut E) + 'static,
    ) -> HookId {
        self.events.register(listener, priority, handler)
    }

    /// Hook that runs `body` as a task per event, reconciled by `behavior`.
    pub fn suspend_handler<E, F, Fut>(
        &self,
        listener: &Rc<Listener>,
        priority: i16,
        behavior: SuspendBehavior,
        body: F,
    ) -> Rc<SuspendHandler<E>>
    where
        E: Event + Clone,
        F: Fn(E) -> Fut + 'static,
        Fut: Future<Output = TaskResult> + 'static,
    {
        let handler = Rc::new(SuspendHandler::new(
            &self.scheduler,
            listener,
            behavior,
            body,
        ));
        let admit = handler.clone();
        self.events
            .register::<E>(listener, priority, move |event| admit.admit(event.clone()));
        handler
    }

    /// A task per event, all running side by side.
    pub fn sequence_handler<E, F, Fut>(
        &self,
        listener: &Rc<Listener>,
        body: F,
    ) -> Rc<SuspendHandler<E>>
    where
        E: Event + Clone,
        F: Fn(E) -> Fut + 'static,
        Fut: Future<Output = TaskResult> + 'static,
    {
        self.suspend_handler(listener, PRIORITY_DEFAULT, SuspendBehavior::parallel(), body)
    }

    /// Start `body` on every tick unless the previous run is still going.
    pub fn tick_handler<F, Fut>(
        &self,
        listener: &Rc<Listener>,
        body: F,
    ) -> Rc<SuspendHandler<GameTickEvent>>
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = TaskResult> + 'static,
    {
        self.suspend_handler(
            listener,
            PRIORITY_DEFAULT,
            SuspendBehavior::discard_latest(),
            move |_: GameTickEvent| body(),
        )
    }

    /// Dispatch an event, then poll every task it spawned or woke.
    pub fn post<E: Event>(&self, event: &mut E) {
        self.events.dispatch(event);
        self.scheduler.run_ready();
    }

    /// Advance one tick. Returns the new tick number.
    pub fn tick(&self) -> u64 {
        let tick = self.tick.get() + 1;
        self.tick.set(tick);
        self.post(&mut GameTickEvent { tick });
        tick
    }

    /// Stop a listener: its hooks are skipped and its tasks cancelled.
    pub fn disable_listener(&self, listener: &Listener) {
        listener.set_running(false);
        self.scheduler.remove_scope(listener);
    }

    pub fn enable_listener(&self, listener: &Listener) {
        listener.set_running(true);
    }

    /// Disable a listener and drop all of its hooks.
    pub fn remove_listener(&self, listener: &Listener) {
        self.disable_listener(listener);
        self.events.unregister_listener(listener.id());
    }
}
