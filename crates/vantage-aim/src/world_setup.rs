//! Entity spawn factories for mirroring the host world.

use glam::DVec3;
use hecs::World;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use vantage_core::commands::EntitySpawn;
use vantage_core::components::*;
use vantage_core::enums::EntityClass;

use crate::context::Observer;

/// Radius of the ring random entities are scattered in (blocks).
const POPULATE_MIN_RADIUS: f64 = 3.0;
const POPULATE_MAX_RADIUS: f64 = 40.0;

/// Spawn the local player's own entity and link it to `observer`.
pub fn spawn_observer(world: &mut World, observer: &mut Observer) -> hecs::Entity {
    let entity = world.spawn((
        LocalPlayer,
        Position(observer.position),
        Velocity(observer.velocity),
        Hitbox::default(),
        Living::default(),
        Class(EntityClass::Player),
    ));
    observer.entity = Some(entity);
    entity
}

/// Mirror one host entity into the world.
pub fn spawn_entity(world: &mut World, spawn: &EntitySpawn, observer: &Observer) -> hecs::Entity {
    let entity = world.spawn((
        Position(spawn.position),
        Velocity(spawn.velocity),
        spawn.hitbox,
        Living {
            health: spawn.health,
            ..Living::default()
        },
        Class(spawn.class),
    ));

    if spawn.friendly {
        let _ = world.insert_one(entity, Friendly);
    }
    if spawn.class == EntityClass::Angerable {
        let angry_at = if spawn.angry_at_player {
            observer.entity
        } else {
            None
        };
        let _ = world.insert_one(entity, Anger { angry_at });
    }
    entity
}

/// Scatter `count` random entities on the ground around `center`.
pub fn spawn_random_entities(
    world: &mut World,
    rng: &mut ChaCha8Rng,
    observer: &Observer,
    count: usize,
) -> Vec<hecs::Entity> {
    (0..count)
        .map(|_| {
            let spawn = random_spawn(rng, observer.position);
            spawn_entity(world, &spawn, observer)
        })
        .collect()
}

fn random_spawn(rng: &mut ChaCha8Rng, center: DVec3) -> EntitySpawn {
    let class = match rng.gen_range(0..4) {
        0 => EntityClass::Player,
        1 => EntityClass::Hostile,
        2 => EntityClass::Angerable,
        _ => EntityClass::Passive,
    };
    let angle = rng.gen_range(0.0..std::f64::consts::TAU);
    let radius = rng.gen_range(POPULATE_MIN_RADIUS..POPULATE_MAX_RADIUS);
    let speed = rng.gen_range(0.0..0.2);
    let heading = rng.gen_range(0.0..std::f64::consts::TAU);

    EntitySpawn {
        class,
        position: center + DVec3::new(angle.cos() * radius, 0.0, angle.sin() * radius),
        velocity: DVec3::new(heading.cos() * speed, 0.0, heading.sin() * speed),
        health: rng.gen_range(1.0..=20.0),
        angry_at_player: class == EntityClass::Angerable && rng.gen_bool(0.5),
        ..EntitySpawn::default()
    }
}
