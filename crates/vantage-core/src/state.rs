//! Tick snapshot: the immutable result of one tick, safe to hand to other threads.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::enums::{EntityClass, RotationPriority};
use crate::types::Rotation;

/// Everything the outbound layer needs after a tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickSnapshot {
    pub tick: u64,
    /// Rotation to send this tick.
    pub rotation: Rotation,
    /// Rotation the server last acknowledged.
    pub server_rotation: Rotation,
    /// Request that won arbitration this tick, if any.
    pub request: Option<RotationRequestView>,
    /// Sticky target of the aimbot.
    pub target: Option<TargetView>,
    /// Scheduler tasks still in flight.
    pub active_tasks: usize,
}

/// The winning rotation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationRequestView {
    pub rotation: Rotation,
    pub priority: RotationPriority,
    pub requester: String,
}

/// A targeted entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetView {
    /// `hecs::Entity::to_bits` of the entity.
    pub id: u64,
    pub class: EntityClass,
    pub position: DVec3,
    pub health: f32,
    /// Distance from the player's eyes to the hitbox.
    pub distance: f64,
}
