//! Cleanup system: despawns entities that left the world or died.

use hecs::{Entity, World};

use vantage_core::components::{Living, LocalPlayer, Position, Removed};
use vantage_core::constants::WORLD_BOTTOM_Y;

/// Despawn removed, dead and fallen-out entities. The local player is never
/// despawned. Uses a caller-owned buffer to avoid per-tick allocation.
pub fn run(world: &mut World, despawn_buffer: &mut Vec<Entity>) {
    despawn_buffer.clear();

    for (entity, ()) in world
        .query_mut::<()>()
        .with::<&Removed>()
        .without::<&LocalPlayer>()
    {
        despawn_buffer.push(entity);
    }

    for (entity, living) in world.query_mut::<&Living>().without::<&LocalPlayer>() {
        if !living.is_alive() {
            despawn_buffer.push(entity);
        }
    }

    for (entity, pos) in world.query_mut::<&Position>().without::<&LocalPlayer>() {
        if pos.0.y < WORLD_BOTTOM_Y {
            despawn_buffer.push(entity);
        }
    }

    despawn_buffer.sort_unstable();
    despawn_buffer.dedup();
    for entity in despawn_buffer.drain(..) {
        let _ = world.despawn(entity);
    }
}
