//! Tunnel Sprint - deterministic simulation core for an arcade driving game
//!
//! A vehicle races down a fixed-length corridor, steering through scoring
//! gates and around obstacles on a seeded, deterministic track. This crate
//! is the simulation layer only: track generation, per-frame physics,
//! gate/obstacle resolution, scoring, and the race state machine.
//! Rendering, audio, haptics, and input capture are external collaborators
//! that poll the session snapshot and react to emitted events.
//!
//! Core modules:
//! - `sim`: Deterministic simulation (track, vehicle physics, proximity
//!   resolution, scoring, race session)
//! - `run_record`: Serializable run results and bounded run history

pub mod run_record;
pub mod sim;

pub use run_record::{RunHistory, RunRecord};
pub use sim::{RaceSession, RaceState};

/// Game configuration constants
pub mod consts {
    /// Full race distance in course units (the tunnel is 1430 m)
    pub const TRACK_LENGTH: f32 = 1430.0;

    /// Top speed in units/sec (160 km/h)
    pub const MAX_SPEED: f32 = 44.44;
    /// Base acceleration, tapered toward zero at top speed
    pub const ACCELERATION: f32 = 5.5;
    /// Full-pedal braking deceleration (~0.8g)
    pub const BRAKE_DECEL: f32 = 12.0;
    /// Quadratic aerodynamic drag coefficient
    pub const DRAG_FACTOR: f32 = 0.0003;
    /// Coasting deceleration with no pedal input
    pub const ENGINE_BRAKING: f32 = 2.0;
    /// Pedal positions below this are treated as released
    pub const PEDAL_DEAD_ZONE: f32 = 0.05;
    /// Per-tick exponential smoothing factor for speed and tilt
    pub const SPEED_SMOOTHING: f32 = 0.15;

    /// Lateral steering speed in units/sec at full deflection
    pub const STEER_SPEED: f32 = 12.0;
    /// Lateral clamp, half the drivable corridor width
    pub const MAX_LATERAL_OFFSET: f32 = 10.0;
    /// Body roll per unit of steer input (radians, visual only)
    pub const TILT_FACTOR: f32 = 0.08;

    /// Maximum timestep fed to physics; longer frames (tab suspension,
    /// debugger pauses) are clamped to this to prevent speed spikes
    pub const MAX_TICK_DT: f32 = 0.1;

    /// Vehicle footprint used by gate and collision checks
    pub const CAR_WIDTH: f32 = 1.8;
    pub const CAR_LENGTH: f32 = 4.0;
    /// Ride height of the chassis origin, for render-facing position
    pub const CAR_RIDE_HEIGHT: f32 = 0.45;
}

/// Clamp a pedal position to `[0, 1]`
#[inline]
pub fn clamp_pedal(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Clamp a steering input to `[-1, 1]`
#[inline]
pub fn clamp_steer(value: f32) -> f32 {
    value.clamp(-1.0, 1.0)
}

/// Linear interpolation used for speed/tilt smoothing
#[inline]
pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}
