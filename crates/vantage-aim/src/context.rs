//! Per-session game state shared between the session and its modules.

use glam::DVec3;
use hecs::World;

use vantage_core::constants::PLAYER_EYE_HEIGHT;
use vantage_core::types::Rotation;

/// The local player as the aim pipeline sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observer {
    /// The player's own entity in the world, excluded from targeting.
    pub entity: Option<hecs::Entity>,
    /// Feet position.
    pub position: DVec3,
    pub eye_height: f64,
    /// Rotation the player is currently looking along.
    pub rotation: Rotation,
    /// Motion over the last tick.
    pub velocity: DVec3,
    pub on_ground: bool,
}

impl Default for Observer {
    fn default() -> Self {
        Self {
            entity: None,
            position: DVec3::ZERO,
            eye_height: PLAYER_EYE_HEIGHT,
            rotation: Rotation::ZERO,
            velocity: DVec3::ZERO,
            on_ground: true,
        }
    }
}

impl Observer {
    pub fn eye_position(&self) -> DVec3 {
        self.position + DVec3::new(0.0, self.eye_height, 0.0)
    }
}

/// The live world plus the local player.
///
/// Mutated only at the tick boundary; modules borrow it read-only while
/// they run.
#[derive(Default)]
pub struct GameContext {
    pub world: World,
    pub observer: Observer,
}

impl GameContext {
    pub fn new(observer: Observer) -> Self {
        Self {
            world: World::new(),
            observer,
        }
    }
}
