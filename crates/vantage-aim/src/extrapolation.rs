//! Predicting where a target will be in a number of ticks.

use glam::DVec3;
use hecs::World;

use vantage_core::components::{Class, Position, Velocity};
use vantage_core::constants::PLAYER_EXTRAPOLATION_HORIZON_TICKS;
use vantage_core::enums::EntityClass;

/// Maps "ticks from now" to a predicted position.
pub trait PositionExtrapolation {
    fn position_in_ticks(&self, ticks: f64) -> DVec3;
}

/// A target that does not move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantPositionExtrapolation(pub DVec3);

impl PositionExtrapolation for ConstantPositionExtrapolation {
    fn position_in_ticks(&self, _ticks: f64) -> DVec3 {
        self.0
    }
}

/// A target keeping its last per-tick motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearPositionExtrapolation {
    pub base: DVec3,
    pub velocity: DVec3,
}

impl LinearPositionExtrapolation {
    pub fn new(base: DVec3, velocity: DVec3) -> Self {
        Self { base, velocity }
    }
}

impl PositionExtrapolation for LinearPositionExtrapolation {
    fn position_in_ticks(&self, ticks: f64) -> DVec3 {
        self.base + self.velocity * ticks
    }
}

/// Linear prediction sampled at whole ticks within a fixed horizon.
///
/// Players change direction too often for a long linear guess; beyond the
/// horizon the prediction stays where it was at the horizon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizonLimitedExtrapolation {
    pub inner: LinearPositionExtrapolation,
    pub horizon: f64,
}

impl HorizonLimitedExtrapolation {
    pub fn new(inner: LinearPositionExtrapolation) -> Self {
        Self {
            inner,
            horizon: PLAYER_EXTRAPOLATION_HORIZON_TICKS,
        }
    }
}

impl PositionExtrapolation for HorizonLimitedExtrapolation {
    fn position_in_ticks(&self, ticks: f64) -> DVec3 {
        let ticks = ticks.min(self.horizon).round().max(0.0);
        self.inner.position_in_ticks(ticks)
    }
}

/// Pick the best available prediction for `entity`.
///
/// Returns `None` for entities without a position.
pub fn best_for_entity(
    world: &World,
    entity: hecs::Entity,
) -> Option<Box<dyn PositionExtrapolation>> {
    let position = world.get::<&Position>(entity).ok()?.0;
    let velocity = world
        .get::<&Velocity>(entity)
        .map(|v| v.0)
        .unwrap_or(DVec3::ZERO);
    let is_player = world
        .get::<&Class>(entity)
        .is_ok_and(|class| class.0 == EntityClass::Player);

    let linear = LinearPositionExtrapolation::new(position, velocity);
    if is_player {
        Some(Box::new(HorizonLimitedExtrapolation::new(linear)))
    } else {
        Some(Box::new(linear))
    }
}
