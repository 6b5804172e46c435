//! Events dispatched through the hook registry.

use serde::{Deserialize, Serialize};

use crate::enums::{PacketDirection, RotationPriority};
use crate::types::Rotation;

/// Anything that can be dispatched to event hooks.
///
/// Events are keyed by their concrete type; there is no subtype dispatch.
pub trait Event: 'static {}

/// Events whose handlers may veto the underlying action.
///
/// Cancellation is cooperative: dispatch continues after a hook cancels,
/// and later hooks decide for themselves whether to look at the flag.
pub trait Cancellable: Event {
    fn is_cancelled(&self) -> bool;
    fn cancel(&mut self);
}

/// Fired exactly once per host tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTickEvent {
    pub tick: u64,
}

impl Event for GameTickEvent {}

/// A packet passing through the network layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketEvent {
    pub direction: PacketDirection,
    /// Opaque packet identifier assigned by the host.
    pub id: u32,
    pub payload: Vec<u8>,
    pub cancelled: bool,
}

impl PacketEvent {
    pub fn new(direction: PacketDirection, id: u32, payload: Vec<u8>) -> Self {
        Self {
            direction,
            id,
            payload,
            cancelled: false,
        }
    }
}

impl Event for PacketEvent {}

impl Cancellable for PacketEvent {
    fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    fn cancel(&mut self) {
        self.cancelled = true;
    }
}

/// Posted after rotation arbitration picked the rotation for this tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationUpdateEvent {
    pub tick: u64,
    pub rotation: Rotation,
    pub priority: RotationPriority,
    pub requester: String,
}

impl Event for RotationUpdateEvent {}

/// A feature switched its sticky target.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetChangeEvent {
    pub requester: String,
    pub target: Option<hecs::Entity>,
}

impl Event for TargetChangeEvent {}
