//! Gate and obstacle proximity resolution
//!
//! Called once per tick with the vehicle's new position. Each gate resolves
//! exactly once (pass or miss, never both) at the tick where the vehicle
//! first crosses it; each obstacle collides at most once. Resolution marks
//! the entity immediately, so lingering inside the look-ahead window for
//! many ticks cannot re-trigger it.

use std::collections::HashSet;

use crate::consts::{CAR_LENGTH, CAR_WIDTH};

use super::track::Track;
use super::vehicle::VehicleState;

/// Gates are candidates from 5 units before the crossing to 30 units after.
/// The pre-crossing span must exceed the worst per-tick advance
/// (MAX_SPEED * MAX_TICK_DT = 4.44 units) so no gate can be skipped.
const GATE_WINDOW_AHEAD: f32 = 5.0;
const GATE_WINDOW_BEHIND: f32 = 30.0;
const OBSTACLE_WINDOW_AHEAD: f32 = 5.0;
const OBSTACLE_WINDOW_BEHIND: f32 = 20.0;

/// A gate resolves once the vehicle is this far past its course position,
/// so a grazing stop on the line does not resolve prematurely
const GATE_RESOLVE_MARGIN: f32 = 1.0;

/// Extra longitudinal slack in the obstacle proximity box
const COLLISION_LONGITUDINAL_MARGIN: f32 = 0.5;

/// Gate pole cylinder radius, for the cosmetic pole-contact flag
const GATE_POLE_RADIUS: f32 = 0.08;

/// One resolved gate or obstacle interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProximityEvent {
    GatePass {
        gate_id: String,
    },
    GateMiss {
        gate_id: String,
        /// Vehicle extent overlapped a pole. Presentation feedback only;
        /// scoring treats every miss identically.
        clipped_pole: bool,
    },
    Collision {
        obstacle_id: String,
    },
}

/// Tracks which entities have already been resolved for the current session
#[derive(Debug, Default)]
pub struct ProximityResolver {
    resolved_gates: HashSet<String>,
    resolved_obstacles: HashSet<String>,
}

impl ProximityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all resolutions (new session, new track)
    pub fn reset(&mut self) {
        self.resolved_gates.clear();
        self.resolved_obstacles.clear();
    }

    /// Resolve gates and obstacles near the vehicle, appending events to
    /// `out`. Gates are evaluated before obstacles so a miss-with-pole-clip
    /// precedes any coincident collision in the log.
    pub fn resolve(&mut self, track: &Track, vehicle: &VehicleState, out: &mut Vec<ProximityEvent>) {
        let car_course = vehicle.course_position;
        let car_lateral = vehicle.lateral_position;
        let car_half_width = CAR_WIDTH / 2.0;

        for gate in &track.gates {
            // Bounded window; course coordinates are negative and decrease ahead
            if gate.course_position <= car_course - GATE_WINDOW_AHEAD
                || gate.course_position >= car_course + GATE_WINDOW_BEHIND
            {
                continue;
            }
            if self.resolved_gates.contains(&gate.id) {
                continue;
            }

            // Resolve at the first tick the vehicle is past the gate
            if car_course < gate.course_position - GATE_RESOLVE_MARGIN {
                let (gate_left, gate_right) = gate.opening();
                let car_left = car_lateral - car_half_width;
                let car_right = car_lateral + car_half_width;

                if car_left > gate_left && car_right < gate_right {
                    out.push(ProximityEvent::GatePass {
                        gate_id: gate.id.clone(),
                    });
                } else {
                    let clipped_pole = [gate_left, gate_right].iter().any(|&pole| {
                        (car_lateral - pole).abs() < car_half_width + GATE_POLE_RADIUS
                    });
                    out.push(ProximityEvent::GateMiss {
                        gate_id: gate.id.clone(),
                        clipped_pole,
                    });
                }
                self.resolved_gates.insert(gate.id.clone());
            }
        }

        for obstacle in &track.obstacles {
            if obstacle.course_position <= car_course - OBSTACLE_WINDOW_AHEAD
                || obstacle.course_position >= car_course + OBSTACLE_WINDOW_BEHIND
            {
                continue;
            }
            if self.resolved_obstacles.contains(&obstacle.id) {
                continue;
            }

            // Box proximity test; a near miss stays live while in range
            let lateral_gap = (car_lateral - obstacle.lateral_position).abs();
            let longitudinal_gap = (car_course - obstacle.course_position).abs();

            if lateral_gap < car_half_width + obstacle.kind.radius()
                && longitudinal_gap < CAR_LENGTH / 2.0 + COLLISION_LONGITUDINAL_MARGIN
            {
                out.push(ProximityEvent::Collision {
                    obstacle_id: obstacle.id.clone(),
                });
                self.resolved_obstacles.insert(obstacle.id.clone());
            }
        }
    }
}
