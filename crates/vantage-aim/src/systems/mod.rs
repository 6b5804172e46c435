//! ECS systems that operate on the mirrored world each tick.
//!
//! Systems are plain functions over `&mut World` (or `&World` when read-only).
//! They hold no state of their own.

pub mod cleanup;
pub mod movement;
pub mod snapshot;
