//! Snapshot system: reads the session state and builds a TickSnapshot.
//!
//! Read-only; never modifies the world.

use vantage_core::components::{Class, Hitbox, Living, Position};
use vantage_core::state::{TargetView, TickSnapshot};

use crate::context::GameContext;
use crate::rotation::RotationManager;

/// Build the snapshot handed to the outbound layer after a tick.
pub fn build_snapshot(
    tick: u64,
    ctx: &GameContext,
    rotations: &RotationManager,
    target: Option<hecs::Entity>,
    active_tasks: usize,
) -> TickSnapshot {
    let rotation = rotations.snapshot();
    TickSnapshot {
        tick,
        rotation: rotation.current,
        server_rotation: rotation.server,
        request: rotation.active,
        target: target.and_then(|entity| build_target(ctx, entity)),
        active_tasks,
    }
}

fn build_target(ctx: &GameContext, entity: hecs::Entity) -> Option<TargetView> {
    let world = &ctx.world;
    let position = world.get::<&Position>(entity).ok()?.0;
    let class = world.get::<&Class>(entity).ok()?.0;
    let health = world
        .get::<&Living>(entity)
        .map(|living| living.health)
        .unwrap_or_default();
    let hitbox = world
        .get::<&Hitbox>(entity)
        .map(|hitbox| *hitbox)
        .unwrap_or_default();

    Some(TargetView {
        id: entity.to_bits().get(),
        class,
        position,
        health,
        distance: hitbox
            .at(position)
            .squared_distance_to(ctx.observer.eye_position())
            .sqrt(),
    })
}
