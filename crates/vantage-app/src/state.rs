//! Host state shared between the control surface and the tick thread.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use vantage_core::commands::SessionCommand;
use vantage_core::state::TickSnapshot;

/// Messages sent to the tick thread.
#[derive(Debug)]
pub enum LoopCommand {
    /// Forward to the session; applied at the next tick boundary.
    Session(SessionCommand),
    /// Stop the tick thread after the current tick.
    Shutdown,
}

/// Shared host state.
///
/// Must be Send + Sync so any I/O thread can hold it:
/// - `mpsc::Sender` is wrapped in `Mutex` (Sender is Send but not Sync)
/// - `Option` covers the time before `start_session`
/// - the latest snapshot is an `Arc<Mutex<..>>` shared with the tick thread
pub struct AppState {
    /// `None` until `start_session` is called.
    pub command_tx: Mutex<Option<mpsc::Sender<LoopCommand>>>,
    /// Written by the tick thread after every tick.
    pub latest_snapshot: Arc<Mutex<Option<TickSnapshot>>>,
    pub running: Mutex<bool>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            command_tx: Mutex::new(None),
            latest_snapshot: Arc::new(Mutex::new(None)),
            running: Mutex::new(false),
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_creation() {
        let state = AppState::new();
        assert!(state.command_tx.lock().unwrap().is_none());
        assert!(state.latest_snapshot.lock().unwrap().is_none());
        assert!(!*state.running.lock().unwrap());
    }
}
