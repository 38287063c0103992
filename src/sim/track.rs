//! Seeded track generation
//!
//! `generate(seed)` is a pure function: the same seed always yields a
//! bit-identical gate/obstacle layout, on every platform. Randomness comes
//! from a fixed linear-congruential generator, not from the `rand` crate's
//! samplers, because the contract here is determinism rather than
//! statistical quality.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Course length the generator populates. Independent from (and shorter
/// than) the race's full [`crate::consts::TRACK_LENGTH`]; the tail of a
/// longer race course is intentionally left empty as a cooldown stretch.
pub const GEN_TRACK_LENGTH: f32 = 800.0;
/// Base spacing between consecutive gates
pub const GATE_SPACING: f32 = 25.0;
/// Gate opening width bounds
pub const MIN_GATE_WIDTH: f32 = 4.0;
pub const MAX_GATE_WIDTH: f32 = 6.0;
/// Course position of the first gate
const START_OFFSET: f32 = -30.0;
/// Obstacles are clamped to this half-width of the corridor
const OBSTACLE_LATERAL_CLAMP: f32 = 7.0;

/// LCG recurrence: `state = (state * A + C) & M`, value = `state / M`.
/// Constants are fixed; changing them changes every track ever generated.
const LCG_MULTIPLIER: u64 = 1_103_515_245;
const LCG_INCREMENT: u64 = 12_345;
const LCG_MASK: u64 = 0x7fff_ffff;

/// Errors from track generation. The only failure is a caller-side
/// precondition violation; generation itself cannot fail.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("track seed must be a non-negative integer, got {0}")]
    NegativeSeed(i64),
}

/// A scoring checkpoint with a lateral opening the vehicle must pass through
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    pub id: String,
    /// Lateral center of the opening
    pub lateral_center: f32,
    /// Longitudinal position along the course (negative, decreasing ahead)
    pub course_position: f32,
    /// Opening width, always within `[MIN_GATE_WIDTH, MAX_GATE_WIDTH]`
    pub width: f32,
}

impl Gate {
    /// Lateral extent of the opening as `(left, right)`
    pub fn opening(&self) -> (f32, f32) {
        (
            self.lateral_center - self.width / 2.0,
            self.lateral_center + self.width / 2.0,
        )
    }
}

/// Static hazard variants. The simulation only needs the tag and its
/// collision radius; visual detail is the renderer's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObstacleKind {
    Cone,
    Barrier,
    Bollard,
}

impl ObstacleKind {
    /// Collision radius; barriers are much wider than cones/bollards
    pub fn radius(self) -> f32 {
        match self {
            ObstacleKind::Barrier => 1.2,
            ObstacleKind::Cone | ObstacleKind::Bollard => 0.4,
        }
    }
}

/// A static hazard that penalizes on contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: String,
    pub kind: ObstacleKind,
    pub lateral_position: f32,
    pub course_position: f32,
    /// Small yaw applied to barriers only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f32>,
}

/// Immutable track layout for one seed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Gates in generation order (descending course position)
    pub gates: Vec<Gate>,
    /// Obstacles in generation order
    pub obstacles: Vec<Obstacle>,
    /// The generator's own populated length (not the race length)
    pub length: f32,
}

/// Fixed linear-congruential generator for track layout
struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: i64) -> Self {
        Self { state: seed as u64 }
    }

    /// Next value in `[0, 1)`
    fn next(&mut self) -> f32 {
        self.state = (self.state.wrapping_mul(LCG_MULTIPLIER) + LCG_INCREMENT) & LCG_MASK;
        (self.state as f64 / LCG_MASK as f64) as f32
    }
}

/// Generate the default-length track for `seed`
pub fn generate(seed: i64) -> Result<Track, TrackError> {
    generate_with_length(seed, GEN_TRACK_LENGTH)
}

/// Generate a track populated out to `length` course units.
///
/// Walks the course coordinate backward from the start offset in roughly
/// `GATE_SPACING` steps, shrinking spacing and gate width as the progress
/// ratio grows (difficulty ramp), placing 1-3 obstacles between each pair
/// of gates.
pub fn generate_with_length(seed: i64, length: f32) -> Result<Track, TrackError> {
    if seed < 0 {
        return Err(TrackError::NegativeSeed(seed));
    }

    let mut rng = Lcg::new(seed);
    let mut gates = Vec::new();
    let mut obstacles = Vec::new();

    let mut course = START_OFFSET;
    let mut gate_index = 0u32;

    while course > -length {
        let progress = course.abs() / length;

        // Gate width narrows with progress; the raw (unclamped) width also
        // drives the lateral-offset bound and obstacle placement below.
        let width_range = MAX_GATE_WIDTH - MIN_GATE_WIDTH;
        let base_width = MAX_GATE_WIDTH - width_range * progress * 0.5;
        let raw_width = base_width + (rng.next() - 0.5);

        // Keep the opening fully inside the corridor
        let max_offset = 5.0 - raw_width / 2.0;
        let lateral_center = (rng.next() - 0.5) * 2.0 * max_offset;

        gates.push(Gate {
            id: format!("gate-{gate_index}"),
            lateral_center,
            course_position: course,
            width: raw_width.clamp(MIN_GATE_WIDTH, MAX_GATE_WIDTH),
        });

        // 1-3 obstacles between this gate and the next
        let obstacle_count = (rng.next() * 3.0).floor() as u32 + 1;
        for i in 0..obstacle_count {
            let obstacle_course = course + GATE_SPACING * 0.3 + rng.next() * GATE_SPACING * 0.4;

            let side = if rng.next() > 0.5 { 1.0 } else { -1.0 };
            let lateral = if rng.next() > 0.3 {
                // Offset from the gate's opening edge, creating risk near it
                lateral_center + side * (raw_width / 2.0 + 1.0 + rng.next() * 3.0)
            } else {
                (rng.next() - 0.5) * 14.0
            };
            let lateral = lateral.clamp(-OBSTACLE_LATERAL_CLAMP, OBSTACLE_LATERAL_CLAMP);

            let kind_roll = rng.next();
            let kind = if kind_roll < 0.5 {
                ObstacleKind::Cone
            } else if kind_roll < 0.8 {
                ObstacleKind::Bollard
            } else {
                ObstacleKind::Barrier
            };

            let rotation = if kind == ObstacleKind::Barrier {
                Some(rng.next() * 0.3 - 0.15)
            } else {
                None
            };

            obstacles.push(Obstacle {
                id: format!("obstacle-{gate_index}-{i}"),
                kind,
                lateral_position: lateral,
                course_position: obstacle_course,
                rotation,
            });
        }

        // Spacing shrinks with progress, with a little jitter
        let spacing_reduction = progress * 5.0;
        course -= GATE_SPACING - spacing_reduction + (rng.next() - 0.5) * 5.0;
        gate_index += 1;
    }

    Ok(Track {
        gates,
        obstacles,
        length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_generation_is_deterministic() {
        let a = generate(12345).unwrap();
        let b = generate(12345).unwrap();
        assert_eq!(a, b);
        assert!(!a.gates.is_empty());
        assert!(!a.obstacles.is_empty());
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = generate(1).unwrap();
        let b = generate(2).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_negative_seed_rejected() {
        assert!(matches!(generate(-1), Err(TrackError::NegativeSeed(-1))));
    }

    #[test]
    fn test_gate_order_and_unique_ids() {
        let track = generate(777).unwrap();
        for pair in track.gates.windows(2) {
            assert!(pair[0].course_position > pair[1].course_position);
        }
        let mut ids: Vec<_> = track
            .gates
            .iter()
            .map(|g| g.id.as_str())
            .chain(track.obstacles.iter().map(|o| o.id.as_str()))
            .collect();
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), before);
    }

    #[test]
    fn test_barrier_rotation_only() {
        let track = generate(42).unwrap();
        for obstacle in &track.obstacles {
            match obstacle.kind {
                ObstacleKind::Barrier => {
                    let rot = obstacle.rotation.expect("barriers carry rotation");
                    assert!((-0.15..=0.15).contains(&rot));
                }
                _ => assert!(obstacle.rotation.is_none()),
            }
        }
    }

    #[test]
    fn test_generator_leaves_race_tail_unpopulated() {
        // The default generator stops at 800 units; a 1430-unit race has a
        // bare cooldown stretch past that point.
        let short = generate(555).unwrap();
        assert!(
            short
                .gates
                .iter()
                .all(|g| g.course_position > -GEN_TRACK_LENGTH)
        );

        let full = generate_with_length(555, crate::consts::TRACK_LENGTH).unwrap();
        assert!(
            full.gates
                .iter()
                .any(|g| g.course_position < -GEN_TRACK_LENGTH),
            "full-length generation should populate past the default length"
        );
    }

    proptest! {
        #[test]
        fn prop_gate_widths_within_bounds(seed in 0i64..1_000_000) {
            let track = generate(seed).unwrap();
            for gate in &track.gates {
                prop_assert!(gate.width >= MIN_GATE_WIDTH);
                prop_assert!(gate.width <= MAX_GATE_WIDTH);
            }
        }

        #[test]
        fn prop_obstacles_within_corridor(seed in 0i64..1_000_000) {
            let track = generate(seed).unwrap();
            for obstacle in &track.obstacles {
                prop_assert!(obstacle.lateral_position.abs() <= OBSTACLE_LATERAL_CLAMP);
            }
        }

        #[test]
        fn prop_generation_idempotent(seed in 0i64..1_000_000) {
            prop_assert_eq!(generate(seed).unwrap(), generate(seed).unwrap());
        }
    }
}
