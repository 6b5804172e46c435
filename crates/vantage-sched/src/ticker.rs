//! Tick clock: turns the host's tick signal into resumption points.
//!
//! Callbacks registered with [`Ticker::register`] wait in a pending list and
//! are only promoted at the start of the next pass, so a callback added while
//! a pass is running never runs twice in the same tick.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use vantage_core::constants::TICKS_PER_SECOND;

use crate::executor;

struct TickCallback {
    owner: Rc<str>,
    /// Returns true once the callback wants to be removed.
    callback: Box<dyn FnMut() -> bool>,
}

#[derive(Default)]
struct TickerInner {
    running: RefCell<Vec<TickCallback>>,
    pending: RefCell<Vec<TickCallback>>,
    passes: Cell<u64>,
}

/// Cheap to clone; all clones share the same callback lists.
#[derive(Clone, Default)]
pub struct Ticker {
    inner: Rc<TickerInner>,
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback to be run from the next tick on until it returns true.
    pub fn register(&self, owner: &str, callback: impl FnMut() -> bool + 'static) {
        self.register_shared(Rc::from(owner), Box::new(callback));
    }

    fn register_shared(&self, owner: Rc<str>, callback: Box<dyn FnMut() -> bool>) {
        self.inner
            .pending
            .borrow_mut()
            .push(TickCallback { owner, callback });
    }

    /// Run one tick pass.
    ///
    /// A panicking callback is logged with its owner and dropped; the
    /// remaining callbacks of the pass still run.
    pub fn tick(&self) {
        let mut running = std::mem::take(&mut *self.inner.running.borrow_mut());
        running.append(&mut self.inner.pending.borrow_mut());

        running.retain_mut(|entry| {
            match panic::catch_unwind(AssertUnwindSafe(|| (entry.callback)())) {
                Ok(done) => !done,
                Err(payload) => {
                    log::error!(
                        "tick callback of {} panicked: {}",
                        entry.owner,
                        panic_message(payload.as_ref())
                    );
                    false
                }
            }
        });

        let mut slot = self.inner.running.borrow_mut();
        running.append(&mut slot);
        *slot = running;
        self.inner.passes.set(self.inner.passes.get() + 1);
    }

    /// Number of completed tick passes.
    pub fn passes(&self) -> u64 {
        self.inner.passes.get()
    }

    /// Callbacks that will run on the next pass.
    pub fn scheduled(&self) -> usize {
        self.inner.running.borrow().len() + self.inner.pending.borrow().len()
    }

    /// Suspend until `stop_at(elapsed)` holds; elapsed starts at 1 on the first tick.
    ///
    /// - `tick_until(|_| true)` resolves with `1`
    /// - `tick_until(|it| it >= 2)` resolves with `2`
    pub fn tick_until(&self, stop_at: impl FnMut(u32) -> bool + 'static) -> TickUntil {
        TickUntil {
            ticker: self.clone(),
            stop_at: Some(Box::new(stop_at)),
            state: Rc::new(WaitState::default()),
        }
    }

    /// Wait a fixed number of ticks. `0` returns without suspending.
    pub async fn wait_ticks(&self, ticks: u32) {
        if ticks == 0 {
            return;
        }
        self.tick_until(move |elapsed| elapsed >= ticks).await;
    }

    /// Wait whole seconds at the nominal tick rate.
    pub async fn wait_seconds(&self, seconds: u32) {
        self.wait_ticks(seconds * TICKS_PER_SECOND).await;
    }

    /// Wait up to `ticks` ticks, stopping early once `break_loop` holds.
    ///
    /// Returns true if the full duration passed without breaking.
    pub async fn tick_conditional(
        &self,
        ticks: u32,
        mut break_loop: impl FnMut() -> bool + 'static,
    ) -> bool {
        if ticks == 0 {
            return !break_loop();
        }
        self.tick_until(move |elapsed| break_loop() || elapsed >= ticks)
            .await
            >= ticks
    }
}

#[derive(Default)]
struct WaitState {
    cancelled: Cell<bool>,
    result: Cell<Option<u32>>,
    waker: RefCell<Option<Waker>>,
}

/// Future returned by [`Ticker::tick_until`].
///
/// Dropping it abandons the wait; its callback is removed on the next pass
/// without evaluating the predicate again.
pub struct TickUntil {
    ticker: Ticker,
    stop_at: Option<Box<dyn FnMut(u32) -> bool>>,
    state: Rc<WaitState>,
}

impl Future for TickUntil {
    type Output = u32;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<u32> {
        let this = self.get_mut();
        if let Some(elapsed) = this.state.result.get() {
            return Poll::Ready(elapsed);
        }
        *this.state.waker.borrow_mut() = Some(cx.waker().clone());

        if let Some(mut stop_at) = this.stop_at.take() {
            let state = this.state.clone();
            let mut elapsed = 0;
            this.ticker.register_shared(
                executor::current_owner(),
                Box::new(move || {
                    if state.cancelled.get() {
                        return true;
                    }
                    elapsed += 1;
                    if stop_at(elapsed) {
                        state.result.set(Some(elapsed));
                        if let Some(waker) = state.waker.borrow_mut().take() {
                            waker.wake();
                        }
                        true
                    } else {
                        false
                    }
                }),
            );
        }
        Poll::Pending
    }
}

impl Drop for TickUntil {
    fn drop(&mut self) {
        self.state.cancelled.set(true);
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
