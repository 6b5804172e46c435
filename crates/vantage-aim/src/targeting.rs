//! Target selection: filtering and ranking of live entities.
//!
//! The candidate list is rebuilt from the world on every call; nothing about
//! a candidate is cached between ticks except the sticky target handle held
//! by [`TargetTracker`].

use std::cmp::Ordering;

use glam::DVec3;
use hecs::World;

use vantage_core::components::*;
use vantage_core::config::TargetConfig;
use vantage_core::constants::{TARGET_DEFAULT_FOV, TARGET_TIER_OTHER};
use vantage_core::enums::{EntityClass, TargetPriority};
use vantage_core::types::Rotation;

use crate::context::{GameContext, Observer};

/// A candidate and the fields it is ranked by.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedTarget {
    pub entity: hecs::Entity,
    pub position: DVec3,
    pub class: EntityClass,
    /// Squared distance from the observer's eyes to the hitbox.
    pub distance_sq: f64,
    /// Angle between the crosshair and the hitbox center (degrees).
    pub crosshair_angle: f32,
    pub hurt_time: u32,
    pub health: f32,
    pub age: u32,
    /// Class tier; lower ranks first.
    pub tier: u32,
}

/// Filters and ranks candidates according to a [`TargetConfig`].
#[derive(Debug, Clone, Default)]
pub struct TargetSelector {
    pub config: TargetConfig,
    closest_sq: Option<f64>,
}

impl TargetSelector {
    pub fn new(config: TargetConfig) -> Self {
        Self {
            config,
            closest_sq: None,
        }
    }

    /// All valid candidates, best first.
    ///
    /// Also caches the smallest squared distance among them, see
    /// [`TargetSelector::closest_squared_enemy_distance`].
    pub fn targets(&mut self, ctx: &GameContext) -> Vec<TrackedTarget> {
        let mut candidates: Vec<TrackedTarget> = ctx
            .world
            .iter()
            .map(|entity_ref| entity_ref.entity())
            .filter_map(|entity| self.evaluate(ctx, entity))
            .collect();

        self.closest_sq = candidates
            .iter()
            .map(|target| target.distance_sq)
            .min_by(f64::total_cmp);

        let priority = self.config.priority;
        candidates.sort_by(|a, b| compare(a, b, priority));
        candidates
    }

    pub fn count_targets(&mut self, ctx: &GameContext) -> usize {
        self.targets(ctx).len()
    }

    /// Smallest squared distance seen by the last [`TargetSelector::targets`] call.
    pub fn closest_squared_enemy_distance(&self) -> Option<f64> {
        self.closest_sq
    }

    pub fn max_range(&self) -> f32 {
        self.config.range.max_range()
    }

    /// Whether `entity` passes every filter.
    pub fn validate_entity(&self, ctx: &GameContext, entity: hecs::Entity) -> bool {
        self.evaluate(ctx, entity).is_some()
    }

    /// Score `entity`, or `None` if it is not a valid target.
    pub fn evaluate(&self, ctx: &GameContext, entity: hecs::Entity) -> Option<TrackedTarget> {
        let observer = &ctx.observer;
        if Some(entity) == observer.entity {
            return None;
        }
        let world = &ctx.world;
        if !should_be_attacked(world, entity, &self.config) {
            return None;
        }

        let position = world.get::<&Position>(entity).ok()?.0;
        let living = *world.get::<&Living>(entity).ok()?;
        let class = world.get::<&Class>(entity).ok()?.0;
        let hitbox = world
            .get::<&Hitbox>(entity)
            .map(|hitbox| *hitbox)
            .unwrap_or_default();

        let eyes = observer.eye_position();
        let bounds = hitbox.at(position);
        let crosshair_angle = observer
            .rotation
            .angle_to(&Rotation::looking_at(eyes, bounds.center()));
        if self.config.fov < TARGET_DEFAULT_FOV && crosshair_angle > self.config.fov {
            return None;
        }

        let distance_sq = bounds.squared_distance_to(eyes);
        if !self.config.range.accepts(distance_sq) {
            return None;
        }
        if living.hurt_time > self.config.hurt_time {
            return None;
        }

        Some(TrackedTarget {
            entity,
            position,
            class,
            distance_sq,
            crosshair_angle,
            hurt_time: living.hurt_time,
            health: living.health,
            age: living.age,
            tier: class_tier(world, entity, class, observer),
        })
    }
}

/// Alive, not removed, not friendly and of a class the filter allows.
fn should_be_attacked(world: &World, entity: hecs::Entity, config: &TargetConfig) -> bool {
    if world.get::<&Removed>(entity).is_ok() || world.get::<&Friendly>(entity).is_ok() {
        return false;
    }
    let alive = world
        .get::<&Living>(entity)
        .is_ok_and(|living| living.is_alive());
    let allowed = world
        .get::<&Class>(entity)
        .is_ok_and(|class| config.filter.allows(class.0));
    alive && allowed
}

/// Players first, then hostiles, then mobs angry at the observer.
fn class_tier(world: &World, entity: hecs::Entity, class: EntityClass, observer: &Observer) -> u32 {
    match class {
        EntityClass::Player => 0,
        EntityClass::Hostile => 1,
        EntityClass::Angerable => {
            let angry_at_us = world
                .get::<&Anger>(entity)
                .is_ok_and(|anger| anger.angry_at.is_some() && anger.angry_at == observer.entity);
            if angry_at_us {
                2
            } else {
                TARGET_TIER_OTHER
            }
        }
        EntityClass::Passive => TARGET_TIER_OTHER,
    }
}

fn compare(a: &TrackedTarget, b: &TrackedTarget, priority: TargetPriority) -> Ordering {
    let by_priority = match priority {
        TargetPriority::Health => a.health.total_cmp(&b.health),
        TargetPriority::Distance => a.distance_sq.total_cmp(&b.distance_sq),
        TargetPriority::Direction => a.crosshair_angle.total_cmp(&b.crosshair_angle),
        TargetPriority::HurtTime => a.hurt_time.cmp(&b.hurt_time),
        TargetPriority::Age => b.age.cmp(&a.age),
    };
    let ordering = a.tier.cmp(&b.tier).then(by_priority);
    if priority == TargetPriority::Distance {
        ordering
    } else {
        ordering.then(a.distance_sq.total_cmp(&b.distance_sq))
    }
}

/// A selector with a sticky current target.
#[derive(Debug, Clone, Default)]
pub struct TargetTracker {
    pub selector: TargetSelector,
    target: Option<hecs::Entity>,
}

impl TargetTracker {
    pub fn new(config: TargetConfig) -> Self {
        Self {
            selector: TargetSelector::new(config),
            target: None,
        }
    }

    pub fn target(&self) -> Option<hecs::Entity> {
        self.target
    }

    /// Ranked candidates. Does not touch the sticky target.
    pub fn targets(&mut self, ctx: &GameContext) -> Vec<TrackedTarget> {
        self.selector.targets(ctx)
    }

    /// Stick to the best candidate passing `predicate`, or to nothing.
    pub fn select_first(
        &mut self,
        ctx: &GameContext,
        predicate: impl FnMut(&TrackedTarget) -> bool,
    ) -> Option<TrackedTarget> {
        let mut predicate = predicate;
        let found = self.targets(ctx).into_iter().find(|target| predicate(target));
        self.target = found.map(|target| target.entity);
        found
    }

    /// Stick to the best candidate for which `evaluator` yields a value.
    pub fn select<T>(
        &mut self,
        ctx: &GameContext,
        mut evaluator: impl FnMut(&TrackedTarget) -> Option<T>,
    ) -> Option<(TrackedTarget, T)> {
        let found = self
            .targets(ctx)
            .into_iter()
            .find_map(|target| evaluator(&target).map(|value| (target, value)));
        self.target = found.as_ref().map(|(target, _)| target.entity);
        found
    }

    /// Re-check the sticky target on its own; drop it if it no longer
    /// qualifies or fails `predicate`.
    pub fn validate(
        &mut self,
        ctx: &GameContext,
        predicate: impl FnOnce(&TrackedTarget) -> bool,
    ) -> Option<TrackedTarget> {
        let kept = self
            .target
            .and_then(|entity| self.selector.evaluate(ctx, entity))
            .filter(|target| predicate(target));
        self.target = kept.map(|target| target.entity);
        kept
    }

    pub fn reset(&mut self) {
        self.target = None;
    }
}
