//! Core types and definitions for vantage.
//!
//! This crate defines the vocabulary shared across all other crates:
//! rotations, bounding boxes and projectile constants, ECS components,
//! commands, snapshots, events, configuration, error types and tuning
//! constants. It has no dependency on the scheduler or on any host runtime.

pub mod commands;
pub mod components;
pub mod config;
pub mod constants;
pub mod enums;
pub mod error;
pub mod events;
pub mod state;
pub mod types;
