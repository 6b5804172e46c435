//! Simulation constants and tuning parameters.

/// Host tick rate (Hz).
pub const TICKS_PER_SECOND: u32 = 20;

// --- Event priorities ---

/// Reserved for scheduler bookkeeping. Runs before every feature hook.
pub const PRIORITY_FIRST: i16 = 1000;

/// Features that protect the player and must see events before regular logic.
pub const PRIORITY_SAFETY_FEATURE: i16 = 50;

/// Default hook priority.
pub const PRIORITY_DEFAULT: i16 = 0;

/// Observers that want the final, fully processed state of an event.
pub const PRIORITY_READ_FINAL_STATE: i16 = -1000;

// --- Targeting ---

/// Default field-of-view half angle (degrees). 180 disables the check.
pub const TARGET_DEFAULT_FOV: f32 = 180.0;

/// Default and maximum hurt-time threshold (ticks).
pub const TARGET_MAX_HURT_TIME: u32 = 10;

/// Class tier for entities that match none of the known classes.
pub const TARGET_TIER_OTHER: u32 = u32::MAX;

// --- Entities ---

/// Default player eye height (blocks).
pub const PLAYER_EYE_HEIGHT: f64 = 1.62;

/// Default player hitbox width (blocks).
pub const PLAYER_WIDTH: f64 = 0.6;

/// Default player hitbox height (blocks).
pub const PLAYER_HEIGHT: f64 = 1.8;

/// Lowest y coordinate of the world. Simulated projectiles below it are discarded.
pub const WORLD_BOTTOM_Y: f64 = -64.0;

// --- Trajectory solving ---

/// Straight-line distance below which the closed-form solver is used.
pub const CLOSE_RANGE_THRESHOLD: f64 = 5.0;

/// Horizon of the player movement prediction (ticks).
pub const PLAYER_EXTRAPOLATION_HORIZON_TICKS: f64 = 30.0;

/// Upper bound of simulated flight time for the iterative solver (ticks).
pub const SOLVER_MAX_FLIGHT_TICKS: u32 = 200;

/// Lowest and highest launch elevation scanned by the iterative solver (degrees).
pub const SOLVER_MIN_ELEVATION_DEG: f64 = -89.0;
pub const SOLVER_MAX_ELEVATION_DEG: f64 = 89.0;

/// Elevation step of the bracketing scan (degrees).
pub const SOLVER_ELEVATION_STEP_DEG: f64 = 1.0;

/// Bisection steps inside a bracket.
pub const SOLVER_BISECTION_STEPS: u32 = 24;

/// Flight-time refinement rounds against a moving target.
pub const SOLVER_REFINEMENT_ROUNDS: u32 = 6;

/// Flight-time change (ticks) below which refinement stops.
pub const SOLVER_TIME_TOLERANCE: f64 = 0.25;

/// Horizontal distance below which a shot is treated as purely vertical.
pub const SOLVER_VERTICAL_EPSILON: f64 = 1.0e-3;

// --- Projectile simulation ---

/// Projectiles spawn this far below the shooter's eyes.
pub const PROJECTILE_SPAWN_EYE_OFFSET: f64 = 0.10000000149011612;

/// Default simulated ticks for trajectory previews.
pub const SIMULATION_DEFAULT_MAX_TICKS: u32 = 500;

// --- Rotations ---

/// Default per-tick turn speed bounds (degrees).
pub const ROTATION_DEFAULT_TURN_SPEED: (f32, f32) = (180.0, 180.0);
