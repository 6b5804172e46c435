//! Aim pipeline for vantage.
//!
//! Target selection over the live `hecs` world, rotation arbitration,
//! position extrapolation, projectile angle solvers and the trajectory
//! simulator, tied together by [`AimSession`], which runs one host tick at a
//! time and produces `TickSnapshot`s for the outbound layer.

pub mod context;
pub mod extrapolation;
pub mod modules;
pub mod rotation;
pub mod session;
pub mod simulation;
pub mod systems;
pub mod targeting;
pub mod trajectory;
pub mod world_setup;

pub use vantage_core as core;
pub use session::AimSession;
