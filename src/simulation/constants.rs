//! Physical constants and the fixed tuning values of the simulation.

/// Gravitational constant (m^3 kg^-1 s^-2)
pub const G: f64 = 6.6743e-11;

/// Speed of light (m/s)
pub const C: f64 = 299_792_458.0;

/// World units are kilometers for gravity and deformation
pub const METERS_PER_UNIT: f64 = 1000.0;

/// Divides the physical radius (m) into world units
pub const SIZE_RATIO: f64 = 30_000.0;

/// Radius divisor while a body is held at spawn, so it draws much smaller
pub const SCALE_DURING_INIT: f64 = 1_000_000.0;

/// `p += v / POSITION_DIVISOR` once per step, independent of frame time
pub const POSITION_DIVISOR: f64 = 94.0;

/// `v += a / VELOCITY_DIVISOR` once per accelerate call
pub const VELOCITY_DIVISOR: f64 = 96.0;

/// Velocity multiplier returned by a collision check on overlap
pub const COLLISION_DAMPING: f64 = -0.2;

pub const DEFAULT_DENSITY: f64 = 3344.0;

/// Mass of a freshly spawned body (kg)
pub const SPAWN_MASS: f64 = 1.0e22;

/// Discrete mass multiplier on a secondary-button press
pub const MASS_BUMP: f64 = 1.2;

/// Arrow-key nudge as a fraction of the current radius
pub const NUDGE_FRACTION: f64 = 0.2;

pub const SPHERE_STACKS: usize = 10;
pub const SPHERE_SECTORS: usize = 10;
