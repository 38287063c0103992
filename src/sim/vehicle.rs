//! Vehicle physics
//!
//! Longitudinal speed and lateral position integration, advanced once per
//! tick from normalized pedal/steer inputs. The course coordinate decreases
//! as the vehicle advances; distance traveled is its absolute value.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::{clamp_pedal, clamp_steer, lerp};

/// Normalized control inputs, clamped on write. Last write wins; physics
/// reads the current values each tick, there is no queuing.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ControlInputs {
    throttle: f32,
    brake: f32,
    steer: f32,
}

impl ControlInputs {
    /// Set throttle pedal position, clamped to `[0, 1]`. Upstream input
    /// devices (touch deltas, tilt) are expected to overshoot occasionally.
    pub fn set_throttle(&mut self, position: f32) {
        self.throttle = clamp_pedal(position);
    }

    /// Set brake pedal position, clamped to `[0, 1]`
    pub fn set_brake(&mut self, position: f32) {
        self.brake = clamp_pedal(position);
    }

    /// Set steering deflection, clamped to `[-1, 1]`
    pub fn set_steer(&mut self, value: f32) {
        self.steer = clamp_steer(value);
    }

    pub fn throttle(&self) -> f32 {
        self.throttle
    }

    pub fn brake(&self) -> f32 {
        self.brake
    }

    pub fn steer(&self) -> f32 {
        self.steer
    }
}

/// Vehicle pose and speed. Owned exclusively by the physics step; the
/// resolver and the presentation layer read it, never mutate it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct VehicleState {
    /// Lateral offset from the corridor center line
    pub lateral_position: f32,
    /// Longitudinal course coordinate (0 at start, decreasing ahead)
    pub course_position: f32,
    /// Lateral velocity, exposed for the renderer
    pub lateral_velocity: f32,
    /// Speed straight out of the integrator
    raw_speed: f32,
    /// Exponentially smoothed speed; drives position and all reporting
    smoothed_speed: f32,
    /// Body roll from steering, visual feedback only
    pub tilt_angle: f32,
}

impl VehicleState {
    /// Reset to the initial pose at the start line
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Smoothed speed in units/sec; this is the externally visible speed
    pub fn speed(&self) -> f32 {
        self.smoothed_speed
    }

    /// Unsmoothed integrator speed
    pub fn raw_speed(&self) -> f32 {
        self.raw_speed
    }

    /// Distance traveled along the course
    pub fn distance(&self) -> f32 {
        self.course_position.abs()
    }

    /// World-space chassis position for the renderer
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.lateral_position, CAR_RIDE_HEIGHT, self.course_position)
    }

    /// World-space velocity for the renderer
    pub fn velocity(&self) -> Vec3 {
        Vec3::new(self.lateral_velocity, 0.0, -self.smoothed_speed)
    }

    /// Advance one tick. `dt` is clamped to [`MAX_TICK_DT`] so a stalled
    /// frame (tab suspension) cannot produce a speed spike.
    pub fn advance(&mut self, inputs: &ControlInputs, dt: f32) {
        let dt = dt.clamp(0.0, MAX_TICK_DT);

        let speed_ratio = self.raw_speed / MAX_SPEED;

        // Brake dominates throttle
        if inputs.brake() > PEDAL_DEAD_ZONE {
            let brake_force = BRAKE_DECEL * inputs.brake() * (1.0 + speed_ratio * 0.5);
            self.raw_speed = (self.raw_speed - brake_force * dt).max(0.0);
        } else if inputs.throttle() > PEDAL_DEAD_ZONE {
            // Power tapers toward top speed, drag grows with speed squared
            let effective_accel = ACCELERATION * inputs.throttle() * (1.0 - speed_ratio * speed_ratio);
            let drag_decel = self.raw_speed * self.raw_speed * DRAG_FACTOR;
            let net_accel = effective_accel - drag_decel;
            self.raw_speed = (self.raw_speed + net_accel * dt).clamp(0.0, MAX_SPEED);
        } else {
            // Coasting: gentle engine braking
            self.raw_speed = (self.raw_speed - ENGINE_BRAKING * dt).max(0.0);
        }

        // Smooth speed changes to avoid visible jitter
        self.smoothed_speed = lerp(self.smoothed_speed, self.raw_speed, SPEED_SMOOTHING);

        self.course_position -= self.smoothed_speed * dt;

        let steer = inputs.steer();
        self.lateral_position = (self.lateral_position + steer * STEER_SPEED * dt)
            .clamp(-MAX_LATERAL_OFFSET, MAX_LATERAL_OFFSET);
        self.lateral_velocity = steer * STEER_SPEED;

        self.tilt_angle = lerp(self.tilt_angle, -steer * TILT_FACTOR, SPEED_SMOOTHING);
    }
}
