//! Type-keyed, priority-ordered event hooks.
//!
//! Buckets are kept in descending priority order, stable for equal
//! priorities. Dispatch walks a snapshot of the bucket, so hooks may be
//! registered or unregistered from inside a handler; changes take effect
//! from the next dispatch.

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use vantage_core::events::Event;

use crate::listener::{Listener, ListenerId};
use crate::ticker::panic_message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(u64);

struct Handler<E>(Box<dyn Fn(&mut E)>);

struct HookEntry {
    id: HookId,
    priority: i16,
    listener: Rc<Listener>,
    handler: Rc<dyn Any>,
}

#[derive(Default)]
pub struct EventManager {
    buckets: RefCell<HashMap<TypeId, Vec<HookEntry>>>,
    next_id: Cell<u64>,
}

impl EventManager {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Register `handler` for events of type `E`. Higher priorities run first.
    pub fn register<E: Event>(
        &self,
        listener: &Rc<Listener>,
        priority: i16,
        handler: impl Fn(&mut E) + 'static,
    ) -> HookId {
        let id = HookId(self.next_id.get() + 1);
        self.next_id.set(id.0);

        let entry = HookEntry {
            id,
            priority,
            listener: listener.clone(),
            handler: Rc::new(Handler::<E>(Box::new(handler))),
        };
        let mut buckets = self.buckets.borrow_mut();
        let bucket = buckets.entry(TypeId::of::<E>()).or_default();
        let index = bucket
            .iter()
            .position(|hook| hook.priority < priority)
            .unwrap_or(bucket.len());
        bucket.insert(index, entry);
        id
    }

    /// Remove a hook. Returns false if it was not registered.
    pub fn unregister<E: Event>(&self, hook: HookId) -> bool {
        let mut buckets = self.buckets.borrow_mut();
        let Some(bucket) = buckets.get_mut(&TypeId::of::<E>()) else {
            return false;
        };
        let before = bucket.len();
        bucket.retain(|entry| entry.id != hook);
        bucket.len() != before
    }

    /// Remove every hook of a listener across all event types.
    pub fn unregister_listener(&self, listener: ListenerId) {
        for bucket in self.buckets.borrow_mut().values_mut() {
            bucket.retain(|entry| entry.listener.id() != listener);
        }
    }

    pub fn hook_count<E: Event>(&self) -> usize {
        self.buckets
            .borrow()
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }

    /// Run every hook of `E` in priority order.
    ///
    /// Cancelling the event does not stop dispatch. Hooks of listeners that
    /// are not running are skipped, and a panicking hook is logged without
    /// affecting the rest.
    pub fn dispatch<E: Event>(&self, event: &mut E) {
        let snapshot: Vec<(Rc<Listener>, Rc<dyn Any>)> = match self
            .buckets
            .borrow()
            .get(&TypeId::of::<E>())
        {
            Some(bucket) => bucket
                .iter()
                .map(|entry| (entry.listener.clone(), entry.handler.clone()))
                .collect(),
            None => return,
        };

        for (listener, handler) in snapshot {
            if !listener.is_running() {
                continue;
            }
            let Ok(handler) = handler.downcast::<Handler<E>>() else {
                continue;
            };
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| (handler.0)(event))) {
                log::error!(
                    "{} hook of {} panicked: {}",
                    std::any::type_name::<E>(),
                    listener.name(),
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    /// Resolve with the first event of type `E` for which `predicate` holds.
    ///
    /// The temporary hook is registered right away and removed once the
    /// future completes or is dropped.
    pub fn wait_matches<E: Event + Clone>(
        self: &Rc<Self>,
        listener: &Rc<Listener>,
        priority: i16,
        predicate: impl Fn(&E) -> bool + 'static,
    ) -> WaitMatches<E> {
        let slot: Rc<MatchSlot<E>> = Rc::new(MatchSlot {
            event: RefCell::new(None),
            waker: RefCell::new(None),
        });
        let shared = slot.clone();
        let hook = self.register::<E>(listener, priority, move |event| {
            if shared.event.borrow().is_some() || !predicate(event) {
                return;
            }
            *shared.event.borrow_mut() = Some(event.clone());
            if let Some(waker) = shared.waker.borrow_mut().take() {
                waker.wake();
            }
        });
        WaitMatches {
            events: self.clone(),
            hook: Some(hook),
            slot,
        }
    }
}

struct MatchSlot<E> {
    event: RefCell<Option<E>>,
    waker: RefCell<Option<Waker>>,
}

/// Future returned by [`EventManager::wait_matches`].
pub struct WaitMatches<E: Event> {
    events: Rc<EventManager>,
    hook: Option<HookId>,
    slot: Rc<MatchSlot<E>>,
}

impl<E: Event> WaitMatches<E> {
    fn release(&mut self) {
        if let Some(hook) = self.hook.take() {
            self.events.unregister::<E>(hook);
        }
    }
}

impl<E: Event> Future for WaitMatches<E> {
    type Output = E;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<E> {
        let this = self.get_mut();
        let matched = this.slot.event.borrow_mut().take();
        match matched {
            Some(event) => {
                this.release();
                Poll::Ready(event)
            }
            None => {
                *this.slot.waker.borrow_mut() = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl<E: Event> Drop for WaitMatches<E> {
    fn drop(&mut self) {
        self.release();
    }
}
