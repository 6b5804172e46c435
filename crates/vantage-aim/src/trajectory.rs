//! Launch angle solvers.
//!
//! Every solver answers the same question: which rotation makes a projectile
//! with the given [`TrajectoryInfo`], launched from `source`, meet a target
//! whose position over time is given by a [`PositionExtrapolation`]. `None`
//! means no launch angle reaches the target; it is never an error.

use glam::{DVec2, DVec3};
use hecs::World;

use vantage_core::components::Hitbox;
use vantage_core::constants::*;
use vantage_core::types::{wrap_degrees, Rotation, TrajectoryInfo};

use crate::extrapolation::{best_for_entity, ConstantPositionExtrapolation, PositionExtrapolation};
use crate::simulation::tick_velocity;

pub trait ProjectileAngleCalculator {
    fn calculate_angle_for(
        &self,
        info: &TrajectoryInfo,
        source: DVec3,
        target: &dyn PositionExtrapolation,
        shape: Hitbox,
    ) -> Option<Rotation>;

    fn calculate_angle_for_static_target(
        &self,
        info: &TrajectoryInfo,
        source: DVec3,
        target: DVec3,
        shape: Hitbox,
    ) -> Option<Rotation> {
        self.calculate_angle_for(info, source, &ConstantPositionExtrapolation(target), shape)
    }

    /// Aim at a live entity using its best available extrapolation.
    fn calculate_angle_for_entity(
        &self,
        info: &TrajectoryInfo,
        source: DVec3,
        world: &World,
        entity: hecs::Entity,
    ) -> Option<Rotation> {
        let extrapolation = best_for_entity(world, entity)?;
        let shape = world
            .get::<&Hitbox>(entity)
            .map(|hitbox| *hitbox)
            .unwrap_or_default();
        self.calculate_angle_for(info, source, extrapolation.as_ref(), shape)
    }
}

/// Yaw towards `diff` and pitch from a launch elevation, both in the
/// host's degree conventions.
fn rotation_from(diff: DVec3, elevation_rad: f64) -> Rotation {
    let yaw = diff.z.atan2(diff.x).to_degrees() as f32 - 90.0;
    Rotation::new(
        wrap_degrees(yaw),
        wrap_degrees(-(elevation_rad.to_degrees() as f32)),
    )
}

/// Straight up or straight down, whichever `dy` asks for. A target at the
/// source itself gets a level rotation.
fn vertical_rotation(dy: f64) -> Rotation {
    if dy.abs() < SOLVER_VERTICAL_EPSILON {
        return Rotation::new(0.0, 0.0);
    }
    Rotation::new(0.0, if dy > 0.0 { -90.0 } else { 90.0 })
}

/// Closed-form solution treating the flight path as a parabola.
///
/// Ignores drag, so it is only accurate for short flights.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolynomialAngleCalculator;

impl ProjectileAngleCalculator for PolynomialAngleCalculator {
    fn calculate_angle_for(
        &self,
        info: &TrajectoryInfo,
        source: DVec3,
        target: &dyn PositionExtrapolation,
        _shape: Hitbox,
    ) -> Option<Rotation> {
        let base = target.position_in_ticks(0.0);
        let ticks_until_impact = base.distance(source) / info.initial_velocity;
        let diff = target.position_in_ticks(ticks_until_impact) - source;

        let horizontal = diff.x.hypot(diff.z);
        let velocity = info.initial_velocity;
        let gravity = info.gravity;

        if gravity <= 0.0 {
            return Some(Rotation::looking_at(source, source + diff));
        }

        let velocity2 = velocity * velocity;
        let velocity4 = velocity2 * velocity2;
        let discriminant =
            velocity4 - gravity * (gravity * horizontal * horizontal + 2.0 * diff.y * velocity2);
        if discriminant < 0.0 {
            return None;
        }

        if horizontal < SOLVER_VERTICAL_EPSILON {
            return Some(vertical_rotation(diff.y));
        }

        let elevation = ((velocity2 - discriminant.sqrt()) / (gravity * horizontal)).atan();
        Some(rotation_from(diff, elevation))
    }
}

/// Drag-aware numeric solver for longer shots.
///
/// Flies candidate shots in the vertical plane through the same physics
/// step as the simulator, scans the launch elevation from low to high for
/// the first bracket where the shot stops falling short, bisects it, and
/// repeats with the target re-sampled at the resulting flight time.
#[derive(Debug, Clone, Copy)]
pub struct IterativeAngleCalculator {
    pub max_flight_ticks: u32,
    pub elevation_step_deg: f64,
    pub bisection_steps: u32,
    pub refinement_rounds: u32,
}

impl Default for IterativeAngleCalculator {
    fn default() -> Self {
        Self {
            max_flight_ticks: SOLVER_MAX_FLIGHT_TICKS,
            elevation_step_deg: SOLVER_ELEVATION_STEP_DEG,
            bisection_steps: SOLVER_BISECTION_STEPS,
            refinement_rounds: SOLVER_REFINEMENT_ROUNDS,
        }
    }
}

/// Where a candidate shot crosses the target's horizontal distance.
#[derive(Debug, Clone, Copy)]
struct Crossing {
    height: f64,
    ticks: f64,
}

impl IterativeAngleCalculator {
    /// Height of the shot when it has covered `horizontal` blocks.
    ///
    /// `None` if it never gets that far within the flight time limit.
    fn crossing(&self, info: &TrajectoryInfo, elevation: f64, horizontal: f64) -> Option<Crossing> {
        let launch = DVec3::new(
            elevation.cos() * info.initial_velocity,
            elevation.sin() * info.initial_velocity,
            0.0,
        );
        let mut velocity = tick_velocity(launch, info, false);
        let mut pos = DVec2::ZERO;

        for tick in 0..self.max_flight_ticks {
            let next = pos + DVec2::new(velocity.x, velocity.y);
            if next.x >= horizontal {
                let t = (horizontal - pos.x) / (next.x - pos.x);
                return Some(Crossing {
                    height: pos.y + (next.y - pos.y) * t,
                    ticks: tick as f64 + t,
                });
            }
            if velocity.x <= f64::EPSILON {
                return None;
            }
            pos = next;
            velocity = tick_velocity(velocity, info, false);
        }
        None
    }

    /// Lowest elevation whose shot reaches `(horizontal, dy)`, with its
    /// flight time in ticks.
    fn solve_elevation(&self, info: &TrajectoryInfo, horizontal: f64, dy: f64) -> Option<(f64, f64)> {
        let error = |elevation: f64| {
            self.crossing(info, elevation, horizontal)
                .map(|crossing| (crossing.height - dy, crossing.ticks))
        };
        let step = self.elevation_step_deg.to_radians();
        let max = SOLVER_MAX_ELEVATION_DEG.to_radians();

        let mut short = SOLVER_MIN_ELEVATION_DEG.to_radians();
        if let Some((height_error, ticks)) = error(short) {
            if height_error >= 0.0 {
                return Some((short, ticks));
            }
        }

        let mut elevation = short + step;
        while elevation <= max + 1.0e-9 {
            if let Some((height_error, ticks)) = error(elevation) {
                if height_error >= 0.0 {
                    return Some(self.bisect(&error, short, elevation, (elevation, ticks)));
                }
            }
            short = elevation;
            elevation += step;
        }
        None
    }

    /// Narrow a bracket whose lower end falls short and upper end does not.
    fn bisect(
        &self,
        error: &dyn Fn(f64) -> Option<(f64, f64)>,
        mut short: f64,
        mut over: f64,
        mut best: (f64, f64),
    ) -> (f64, f64) {
        for _ in 0..self.bisection_steps {
            let mid = (short + over) * 0.5;
            match error(mid) {
                Some((height_error, ticks)) if height_error >= 0.0 => {
                    over = mid;
                    best = (mid, ticks);
                }
                _ => short = mid,
            }
        }
        best
    }

    /// Reachability of a target straight above or below.
    fn vertical(&self, info: &TrajectoryInfo, dy: f64) -> Option<Rotation> {
        if dy <= 0.0 {
            return Some(vertical_rotation(dy));
        }
        let mut velocity = tick_velocity(DVec3::Y * info.initial_velocity, info, false);
        let mut height = 0.0;
        for _ in 0..self.max_flight_ticks {
            if velocity.y <= 0.0 {
                break;
            }
            height += velocity.y;
            if height >= dy {
                return Some(vertical_rotation(dy));
            }
            velocity = tick_velocity(velocity, info, false);
        }
        None
    }
}

impl ProjectileAngleCalculator for IterativeAngleCalculator {
    fn calculate_angle_for(
        &self,
        info: &TrajectoryInfo,
        source: DVec3,
        target: &dyn PositionExtrapolation,
        shape: Hitbox,
    ) -> Option<Rotation> {
        let aim_offset = DVec3::new(0.0, shape.height * 0.5, 0.0);
        let base = target.position_in_ticks(0.0) + aim_offset;
        let mut ticks = base.distance(source) / info.initial_velocity;
        let mut solution = None;

        for _ in 0..self.refinement_rounds.max(1) {
            let diff = target.position_in_ticks(ticks) + aim_offset - source;
            let horizontal = diff.x.hypot(diff.z);
            if horizontal < SOLVER_VERTICAL_EPSILON {
                return self.vertical(info, diff.y);
            }

            let (elevation, flight_ticks) = self.solve_elevation(info, horizontal, diff.y)?;
            solution = Some(rotation_from(diff, elevation));

            if (flight_ticks - ticks).abs() < SOLVER_TIME_TOLERANCE {
                break;
            }
            ticks = flight_ticks;
        }
        solution
    }
}

/// Which solver [`SituationalAngleCalculator`] delegates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStrategy {
    Polynomial,
    Iterative,
}

/// Closed form up close, where the numeric solver is unstable; numeric
/// beyond [`CLOSE_RANGE_THRESHOLD`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SituationalAngleCalculator {
    pub polynomial: PolynomialAngleCalculator,
    pub iterative: IterativeAngleCalculator,
}

impl SituationalAngleCalculator {
    pub fn strategy_for(&self, source: DVec3, target: &dyn PositionExtrapolation) -> SolverStrategy {
        if target.position_in_ticks(0.0).distance(source) < CLOSE_RANGE_THRESHOLD {
            SolverStrategy::Polynomial
        } else {
            SolverStrategy::Iterative
        }
    }
}

impl ProjectileAngleCalculator for SituationalAngleCalculator {
    fn calculate_angle_for(
        &self,
        info: &TrajectoryInfo,
        source: DVec3,
        target: &dyn PositionExtrapolation,
        shape: Hitbox,
    ) -> Option<Rotation> {
        match self.strategy_for(source, target) {
            SolverStrategy::Polynomial => {
                self.polynomial.calculate_angle_for(info, source, target, shape)
            }
            SolverStrategy::Iterative => {
                self.iterative.calculate_angle_for(info, source, target, shape)
            }
        }
    }
}
