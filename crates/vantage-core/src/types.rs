//! Fundamental geometric and simulation types.
//!
//! World space follows the host game: y is up, yaw 0 faces +z and grows
//! clockwise when seen from above, negative pitch looks up.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// A look direction in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub yaw: f32,
    pub pitch: f32,
}

impl Rotation {
    pub const ZERO: Rotation = Rotation {
        yaw: 0.0,
        pitch: 0.0,
    };

    pub fn new(yaw: f32, pitch: f32) -> Self {
        Self { yaw, pitch }
    }

    /// Rotation that looks from `from` at `to`.
    ///
    /// A target straight above or below keeps yaw at 0.
    pub fn looking_at(from: DVec3, to: DVec3) -> Self {
        let diff = to - from;
        let horizontal = diff.x.hypot(diff.z);
        let yaw = if horizontal > 0.0 {
            diff.z.atan2(diff.x).to_degrees() as f32 - 90.0
        } else {
            0.0
        };
        let pitch = -(diff.y.atan2(horizontal).to_degrees()) as f32;
        Self::new(wrap_degrees(yaw), pitch.clamp(-90.0, 90.0))
    }

    /// Unit vector this rotation points along.
    pub fn direction(&self) -> DVec3 {
        let yaw = (self.yaw as f64).to_radians();
        let pitch = (self.pitch as f64).to_radians();
        DVec3::new(
            -yaw.sin() * pitch.cos(),
            -pitch.sin(),
            yaw.cos() * pitch.cos(),
        )
    }

    /// Wrap yaw into (-180, 180] and clamp pitch to [-90, 90].
    pub fn normalized(&self) -> Self {
        Self::new(wrap_degrees(self.yaw), self.pitch.clamp(-90.0, 90.0))
    }

    /// Angular distance in degrees, combining yaw and pitch differences.
    pub fn angle_to(&self, other: &Rotation) -> f32 {
        let yaw = angle_difference(other.yaw, self.yaw).abs();
        let pitch = (other.pitch - self.pitch).abs();
        yaw.hypot(pitch)
    }

    /// Step towards `target`, moving at most `max_yaw` / `max_pitch` degrees.
    pub fn towards(&self, target: &Rotation, max_yaw: f32, max_pitch: f32) -> Self {
        let yaw_diff = angle_difference(target.yaw, self.yaw);
        let pitch_diff = target.pitch - self.pitch;
        Self::new(
            self.yaw + yaw_diff.clamp(-max_yaw, max_yaw),
            self.pitch + pitch_diff.clamp(-max_pitch, max_pitch),
        )
        .normalized()
    }
}

/// Wrap an angle in degrees into (-180, 180].
pub fn wrap_degrees(value: f32) -> f32 {
    let mut wrapped = value % 360.0;
    if wrapped > 180.0 {
        wrapped -= 360.0;
    }
    if wrapped <= -180.0 {
        wrapped += 360.0;
    }
    wrapped
}

/// Signed shortest difference `a - b` in degrees.
pub fn angle_difference(a: f32, b: f32) -> f32 {
    wrap_degrees(a - b)
}

/// Entity hitbox dimensions in blocks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hitbox {
    pub width: f64,
    pub height: f64,
}

impl Default for Hitbox {
    fn default() -> Self {
        Self {
            width: crate::constants::PLAYER_WIDTH,
            height: crate::constants::PLAYER_HEIGHT,
        }
    }
}

impl Hitbox {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Box for an entity standing at `feet`.
    pub fn at(&self, feet: DVec3) -> Aabb {
        let half = self.width / 2.0;
        Aabb {
            min: DVec3::new(feet.x - half, feet.y, feet.z - half),
            max: DVec3::new(feet.x + half, feet.y + self.height, feet.z + half),
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn expand(&self, amount: f64) -> Aabb {
        Aabb {
            min: self.min - DVec3::splat(amount),
            max: self.max + DVec3::splat(amount),
        }
    }

    pub fn contains(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Point of the box closest to `point`.
    pub fn closest_point(&self, point: DVec3) -> DVec3 {
        point.clamp(self.min, self.max)
    }

    /// Squared distance from `point` to the box surface (0 inside).
    pub fn squared_distance_to(&self, point: DVec3) -> f64 {
        self.closest_point(point).distance_squared(point)
    }

    /// First intersection of the segment `from -> to` with this box.
    ///
    /// Returns the hit point, or `None` when the segment misses.
    pub fn clip(&self, from: DVec3, to: DVec3) -> Option<DVec3> {
        let delta = to - from;
        let mut t_enter = 0.0_f64;
        let mut t_exit = 1.0_f64;

        for axis in 0..3 {
            let origin = from[axis];
            let d = delta[axis];
            if d.abs() < f64::EPSILON {
                if origin < self.min[axis] || origin > self.max[axis] {
                    return None;
                }
                continue;
            }
            let mut t0 = (self.min[axis] - origin) / d;
            let mut t1 = (self.max[axis] - origin) / d;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_enter = t_enter.max(t0);
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return None;
            }
        }

        Some(from + delta * t_enter)
    }
}

/// Ballistic constants of a projectile kind. Velocities are per tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryInfo {
    /// Gravity subtracted from the vertical velocity every tick.
    pub gravity: f64,
    /// Half size of the projectile's collision box.
    pub hitbox_radius: f64,
    pub initial_velocity: f64,
    /// Velocity multiplier per tick in air.
    pub drag: f64,
    /// Velocity multiplier per tick inside a fluid.
    pub drag_in_water: f64,
    /// Extra pitch applied to the launch direction (degrees).
    pub roll: f32,
    /// Whether the shooter's own motion is added at launch.
    pub copies_player_velocity: bool,
}

impl TrajectoryInfo {
    /// Snowballs, eggs and ender pearls.
    pub const GENERIC: TrajectoryInfo = TrajectoryInfo {
        gravity: 0.03,
        hitbox_radius: 0.25,
        initial_velocity: 1.5,
        drag: 0.99,
        drag_in_water: 0.8,
        roll: 0.0,
        copies_player_velocity: true,
    };

    pub const SNOWBALL: TrajectoryInfo = TrajectoryInfo::GENERIC;

    pub const ENDER_PEARL: TrajectoryInfo = TrajectoryInfo::GENERIC;

    /// Fully drawn bow.
    pub const ARROW: TrajectoryInfo = TrajectoryInfo {
        gravity: 0.05,
        hitbox_radius: 0.5,
        initial_velocity: 3.0,
        drag_in_water: 0.6,
        ..TrajectoryInfo::GENERIC
    };

    pub const TRIDENT: TrajectoryInfo = TrajectoryInfo {
        initial_velocity: 2.5,
        drag_in_water: 0.99,
        ..TrajectoryInfo::ARROW
    };

    pub const POTION: TrajectoryInfo = TrajectoryInfo {
        gravity: 0.05,
        initial_velocity: 0.5,
        roll: -20.0,
        ..TrajectoryInfo::GENERIC
    };

    pub const EXP_BOTTLE: TrajectoryInfo = TrajectoryInfo {
        gravity: 0.07,
        initial_velocity: 0.7,
        roll: -20.0,
        ..TrajectoryInfo::GENERIC
    };

    /// Collision box of the projectile centered on `pos`.
    pub fn hitbox_at(&self, pos: DVec3) -> Aabb {
        Aabb {
            min: pos - DVec3::splat(self.hitbox_radius),
            max: pos + DVec3::splat(self.hitbox_radius),
        }
    }
}
