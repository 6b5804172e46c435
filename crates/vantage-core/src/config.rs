//! User-editable settings.
//!
//! Every field has a default so a partial JSON document is a valid config.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::enums::{EntityClass, ProjectileKind, RotationPriority, TargetPriority};
use crate::error::ConfigError;
use crate::types::Rotation;

/// Top-level configuration of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VantageConfig {
    pub session: SessionConfig,
    pub aimbot: AimbotConfig,
}

impl VantageConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Session-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// RNG seed for determinism. Same seed = same session.
    pub seed: u64,
    /// Rotation the player starts with.
    pub initial_rotation: Rotation,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            initial_rotation: Rotation::ZERO,
        }
    }
}

/// Distance filter of the target selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum RangeSetting {
    /// No distance filtering.
    #[default]
    Unbounded,
    /// `distance <= max`.
    Max(f32),
    /// `min <= distance <= max`, both inclusive.
    Band { min: f32, max: f32 },
}

impl RangeSetting {
    /// Whether a squared distance passes the filter.
    pub fn accepts(&self, distance_sq: f64) -> bool {
        match *self {
            RangeSetting::Unbounded => true,
            RangeSetting::Max(max) => distance_sq <= sq(max),
            RangeSetting::Band { min, max } => distance_sq >= sq(min) && distance_sq <= sq(max),
        }
    }

    /// Upper bound of the filter, `f32::MAX` when unbounded.
    pub fn max_range(&self) -> f32 {
        match *self {
            RangeSetting::Unbounded => f32::MAX,
            RangeSetting::Max(max) => max,
            RangeSetting::Band { max, .. } => max,
        }
    }
}

fn sq(value: f32) -> f64 {
    let value = value as f64;
    value * value
}

/// Which entity classes count as attackable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetFilter {
    pub players: bool,
    pub hostile: bool,
    pub angerable: bool,
    pub passive: bool,
}

impl Default for TargetFilter {
    fn default() -> Self {
        Self {
            players: true,
            hostile: true,
            angerable: true,
            passive: false,
        }
    }
}

impl TargetFilter {
    pub fn allows(&self, class: EntityClass) -> bool {
        match class {
            EntityClass::Player => self.players,
            EntityClass::Hostile => self.hostile,
            EntityClass::Angerable => self.angerable,
            EntityClass::Passive => self.passive,
        }
    }
}

/// Settings of a target selector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub range: RangeSetting,
    /// Maximum angle between crosshair and target (degrees, 0..=180).
    pub fov: f32,
    /// Maximum hurt time a target may have (ticks, 0..=10).
    pub hurt_time: u32,
    pub priority: TargetPriority,
    pub filter: TargetFilter,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            range: RangeSetting::Unbounded,
            fov: TARGET_DEFAULT_FOV,
            hurt_time: TARGET_MAX_HURT_TIME,
            priority: TargetPriority::default(),
            filter: TargetFilter::default(),
        }
    }
}

/// Per-feature rotation smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationsConfig {
    /// Degrees per tick the rotation may turn, sampled uniformly in `[min, max]`.
    pub turn_speed: (f32, f32),
}

impl Default for RotationsConfig {
    fn default() -> Self {
        Self {
            turn_speed: ROTATION_DEFAULT_TURN_SPEED,
        }
    }
}

impl RotationsConfig {
    /// Ticks needed to turn from `from` to `to` at the slowest configured speed.
    pub fn calculate_ticks(&self, from: &Rotation, to: &Rotation) -> u32 {
        let speed = self.turn_speed.0.min(self.turn_speed.1);
        if speed <= 0.0 {
            return u32::MAX;
        }
        (from.angle_to(to) / speed).ceil() as u32
    }
}

/// Settings of the projectile aimbot feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AimbotConfig {
    pub enabled: bool,
    pub projectile: ProjectileKind,
    pub priority: RotationPriority,
    pub target: TargetConfig,
    pub rotations: RotationsConfig,
}

impl Default for AimbotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            projectile: ProjectileKind::Arrow,
            priority: RotationPriority::ImportantForUsage1,
            target: TargetConfig::default(),
            rotations: RotationsConfig::default(),
        }
    }
}
