//! ECS components attached to live world entities.
//!
//! The host mirrors its entity list into a `hecs::World` once per tick;
//! everything vantage reads about an entity comes from these components.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::enums::EntityClass;
pub use crate::types::Hitbox;

/// Feet position in world space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position(pub DVec3);

/// Motion over the last tick (current position minus previous position).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity(pub DVec3);

/// Vital state of a living entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Living {
    /// Health including absorption.
    pub health: f32,
    /// Ticks left of the damage flash; 0 when not recently hurt.
    pub hurt_time: u32,
    /// Ticks since the entity was spawned.
    pub age: u32,
}

impl Default for Living {
    fn default() -> Self {
        Self {
            health: 20.0,
            hurt_time: 0,
            age: 0,
        }
    }
}

impl Living {
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }
}

/// Class of the entity for target ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class(pub EntityClass);

/// Anger state of neutral mobs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Anger {
    pub angry_at: Option<hecs::Entity>,
}

/// Marks the local player's own entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalPlayer;

/// Entities the user never wants to attack (friends, teammates).
#[derive(Debug, Clone, Copy, Default)]
pub struct Friendly;

/// Entity was removed from the world this tick but not yet despawned.
#[derive(Debug, Clone, Copy, Default)]
pub struct Removed;
