//! Commands sent from the host to an aim session.
//!
//! Commands are queued and processed at the next tick boundary, so other
//! threads never touch session state directly.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::config::VantageConfig;
use crate::enums::EntityClass;
use crate::types::{Hitbox, Rotation};

/// All possible host actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionCommand {
    // --- Modules ---
    EnableModule { name: String },
    DisableModule { name: String },
    /// Replace the configuration of every module.
    ApplyConfig { config: VantageConfig },

    // --- World mirror ---
    SpawnEntity { spawn: EntitySpawn },
    /// Remove an entity by its `hecs::Entity::to_bits` id.
    DespawnEntity { id: u64 },
    /// Mirror a fresh host position for an entity. Vitals are kept unless given.
    UpdateEntity {
        id: u64,
        position: DVec3,
        velocity: DVec3,
        #[serde(default)]
        health: Option<f32>,
        #[serde(default)]
        hurt_time: Option<u32>,
    },
    /// Spawn `count` random entities around the local player.
    Populate { count: usize },

    // --- Local player ---
    UpdateObserver {
        position: DVec3,
        velocity: DVec3,
        on_ground: bool,
    },
    /// The player turned by hand.
    SetRotation { rotation: Rotation },
    SetInventoryOpen { open: bool },
}

/// Description of an entity to mirror into the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitySpawn {
    pub class: EntityClass,
    pub position: DVec3,
    pub velocity: DVec3,
    pub health: f32,
    pub hitbox: Hitbox,
    pub friendly: bool,
    /// Angerable mobs only: angry at the local player.
    pub angry_at_player: bool,
}

impl Default for EntitySpawn {
    fn default() -> Self {
        Self {
            class: EntityClass::Hostile,
            position: DVec3::ZERO,
            velocity: DVec3::ZERO,
            health: 20.0,
            hitbox: Hitbox::default(),
            friendly: false,
            angry_at_player: false,
        }
    }
}
