//! Dead-reckoning between host updates.
//!
//! Entities keep moving by their last per-tick motion until the host mirrors
//! a fresh position. The local player is driven by `UpdateObserver` instead.

use hecs::World;

use vantage_core::components::{Living, LocalPlayer, Position, Velocity};

/// Advance every non-player entity by its velocity.
pub fn run(world: &mut World) {
    for (_entity, (pos, vel)) in world
        .query_mut::<(&mut Position, &Velocity)>()
        .without::<&LocalPlayer>()
    {
        pos.0 += vel.0;
    }
}

/// Age living entities and count down their hurt time.
pub fn update_vitals(world: &mut World) {
    for (_entity, living) in world.query_mut::<&mut Living>() {
        living.age = living.age.saturating_add(1);
        living.hurt_time = living.hurt_time.saturating_sub(1);
    }
}
