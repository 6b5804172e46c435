//! Tick-by-tick projectile simulation.
//!
//! Steps a projectile the way the host does: the first tick only updates
//! velocity, every following tick moves by the current velocity, checks for
//! hits along the segment, then applies drag and gravity. The long-range
//! angle solver flies its candidate shots through [`tick_velocity`] too.

use glam::DVec3;
use hecs::World;

use vantage_core::components::{Hitbox, Living, Position, Removed};
use vantage_core::constants::{PROJECTILE_SPAWN_EYE_OFFSET, WORLD_BOTTOM_Y};
use vantage_core::types::{Rotation, TrajectoryInfo};

use crate::context::Observer;

/// One tick of drag followed by gravity.
pub fn tick_velocity(velocity: DVec3, info: &TrajectoryInfo, in_fluid: bool) -> DVec3 {
    let drag = if in_fluid {
        info.drag_in_water
    } else {
        info.drag
    };
    let mut velocity = velocity * drag;
    velocity.y -= info.gravity;
    velocity
}

/// Static surroundings the projectile flies through.
pub trait Environment {
    /// Whether `pos` is inside a fluid.
    fn is_fluid(&self, _pos: DVec3) -> bool {
        false
    }

    /// First solid surface hit by the segment `from -> to`.
    fn raycast(&self, _from: DVec3, _to: DVec3) -> Option<DVec3> {
        None
    }

    /// Projectiles below this height are discarded.
    fn bottom_y(&self) -> f64 {
        WORLD_BOTTOM_Y
    }
}

/// Nothing but air.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAir;

impl Environment for OpenAir {}

/// An infinite solid floor, optionally flooded up to `water_level`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatGround {
    pub ground_y: f64,
    pub water_level: Option<f64>,
}

impl Environment for FlatGround {
    fn is_fluid(&self, pos: DVec3) -> bool {
        self.water_level
            .is_some_and(|level| pos.y >= self.ground_y && pos.y < level)
    }

    fn raycast(&self, from: DVec3, to: DVec3) -> Option<DVec3> {
        if from.y < self.ground_y || to.y >= self.ground_y {
            return None;
        }
        let t = (from.y - self.ground_y) / (from.y - to.y);
        Some(from + (to - from) * t)
    }
}

/// What stopped the projectile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimulationHit {
    Block { pos: DVec3 },
    Entity { entity: hecs::Entity, pos: DVec3 },
}

impl SimulationHit {
    pub fn pos(&self) -> DVec3 {
        match *self {
            SimulationHit::Block { pos } | SimulationHit::Entity { pos, .. } => pos,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub hit: Option<SimulationHit>,
    /// Positions after each simulated tick, ending at the hit point.
    pub positions: Vec<DVec3>,
}

/// A projectile in flight.
#[derive(Debug, Clone)]
pub struct TrajectorySimulator {
    pub owner: Option<hecs::Entity>,
    pub pos: DVec3,
    pub velocity: DVec3,
    pub info: TrajectoryInfo,
}

impl TrajectorySimulator {
    pub fn new(
        owner: Option<hecs::Entity>,
        pos: DVec3,
        velocity: DVec3,
        info: TrajectoryInfo,
    ) -> Self {
        Self {
            owner,
            pos,
            velocity,
            info,
        }
    }

    /// The projectile `shooter` would launch when firing along `rotation`.
    pub fn hypothetical(shooter: &Observer, info: TrajectoryInfo, rotation: Rotation) -> Self {
        let yaw = (rotation.yaw as f64).to_radians();
        let pitch = (rotation.pitch as f64).to_radians();
        let rolled = ((rotation.pitch + info.roll) as f64).to_radians();

        let pos = shooter.eye_position() - DVec3::new(0.0, PROJECTILE_SPAWN_EYE_OFFSET, 0.0);
        let mut velocity = DVec3::new(
            -yaw.sin() * pitch.cos(),
            -rolled.sin(),
            yaw.cos() * pitch.cos(),
        )
        .normalize()
            * info.initial_velocity;

        if info.copies_player_velocity {
            let inherited_y = if shooter.on_ground {
                0.0
            } else {
                shooter.velocity.y
            };
            velocity += DVec3::new(shooter.velocity.x, inherited_y, shooter.velocity.z);
        }

        Self::new(shooter.entity, pos, velocity, info)
    }

    /// Step for at most `max_ticks` ticks or until something is hit.
    pub fn run(&mut self, world: &World, env: &dyn Environment, max_ticks: u32) -> SimulationResult {
        let mut positions = Vec::new();

        self.velocity = tick_velocity(self.velocity, &self.info, env.is_fluid(self.pos));

        for _ in 1..max_ticks {
            if self.pos.y < env.bottom_y() {
                break;
            }

            let before = self.pos;
            self.pos += self.velocity;

            if let Some(hit) = self.check_for_hits(world, env, before, self.pos) {
                positions.push(hit.pos());
                return SimulationResult {
                    hit: Some(hit),
                    positions,
                };
            }

            self.velocity = tick_velocity(self.velocity, &self.info, env.is_fluid(self.pos));
            positions.push(self.pos);
        }

        if positions.is_empty() {
            positions.push(self.pos);
        }
        SimulationResult {
            hit: None,
            positions,
        }
    }

    fn check_for_hits(
        &self,
        world: &World,
        env: &dyn Environment,
        before: DVec3,
        after: DVec3,
    ) -> Option<SimulationHit> {
        if let Some(pos) = env.raycast(before, after) {
            return Some(SimulationHit::Block { pos });
        }

        let mut closest: Option<(f64, SimulationHit)> = None;
        let mut query = world.query::<(&Position, Option<&Hitbox>, Option<&Living>)>();
        for (entity, (position, hitbox, living)) in query.iter() {
            if Some(entity) == self.owner || world.get::<&Removed>(entity).is_ok() {
                continue;
            }
            if living.is_some_and(|living| !living.is_alive()) {
                continue;
            }
            let bounds = hitbox
                .copied()
                .unwrap_or_default()
                .at(position.0)
                .expand(self.info.hitbox_radius);
            if let Some(pos) = bounds.clip(before, after) {
                let distance = before.distance_squared(pos);
                if closest.map_or(true, |(best, _)| distance < best) {
                    closest = Some((distance, SimulationHit::Entity { entity, pos }));
                }
            }
        }
        closest.map(|(_, hit)| hit)
    }
}
