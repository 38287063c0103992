//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Seeded RNG only (track generation uses a fixed LCG)
//! - Variable timestep, clamped to a maximum
//! - Stable entity order (generation order)
//! - No rendering or platform dependencies

pub mod proximity;
pub mod scoring;
pub mod session;
pub mod track;
pub mod vehicle;

pub use proximity::{ProximityEvent, ProximityResolver};
pub use scoring::Scoreboard;
pub use session::{EventKind, GameEvent, RaceSession, RaceState};
pub use track::{Gate, Obstacle, ObstacleKind, Track, TrackError};
pub use vehicle::{ControlInputs, VehicleState};
