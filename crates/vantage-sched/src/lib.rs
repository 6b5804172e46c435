//! Tick-driven cooperative scheduling for vantage.
//!
//! Implements the tick clock and its wait primitives, a single-threaded
//! executor for listener-owned tasks, the priority-ordered event hook
//! registry and the suspension behaviors that reconcile new events with
//! tasks that are still running. No ECS dependency; everything here runs
//! on the host's tick thread.

pub mod behavior;
pub mod events;
pub mod executor;
pub mod listener;
pub mod runtime;
pub mod ticker;

pub use vantage_core as core;
pub use vantage_core::events::{Cancellable, Event};

pub use behavior::{SuspendBehavior, SuspendHandler};
pub use events::{EventManager, HookId, WaitMatches};
pub use executor::{Scheduler, TaskHandle, TaskId, TaskState};
pub use listener::{Listener, ListenerId, ListenerScope};
pub use runtime::Runtime;
pub use ticker::{TickUntil, Ticker};

#[cfg(test)]
mod tests;
