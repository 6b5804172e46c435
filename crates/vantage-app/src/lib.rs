//! Headless vantage host.
//!
//! Runs an `AimSession` on its own tick thread and exposes a small control
//! surface (start, send command, read snapshot) that any I/O thread can use.

pub mod control;
pub mod game_loop;
pub mod state;

pub use vantage_core as core;
