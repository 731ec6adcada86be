//! Motion Controller - per-tick vehicle update
//!
//! [`MotionController::advance`] is a pure transform from the previous
//! [`VehicleState`] and the tick's [`InputSnapshot`] to the next state. The
//! steps run in a fixed order because later steps read what earlier steps
//! wrote within the same tick:
//!
//! ```text
//! steer ──► speed ──► gear shift ──► integrate ──► clamp
//! ```

use super::bounds::{VehicleExtent, WorldBounds};
use super::gear::{Gear, GearTable};
use super::vehicle::{Position, VehicleState};
use crate::controller::input_sampler::{InputSnapshot, DEFAULT_DEADZONE};
use tracing::debug;

/// Multiplier applied while the deadman is held with no pedal pressed.
const SOFT_COAST_DECAY: f32 = 0.9;
/// Below this magnitude a soft coast snaps speed to zero.
const SOFT_COAST_SNAP: f32 = 0.05;
/// Multiplier applied while the deadman is released.
const HARD_COAST_DECAY: f32 = 0.7;
/// Below this magnitude a hard coast snaps speed to zero.
const HARD_COAST_SNAP: f32 = 0.02;
/// Speeds at or below this magnitude do not move the vehicle.
const MOTION_THRESHOLD: f32 = 0.01;

/// Static tuning for the motion model, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionParams {
    pub gears: GearTable,
    /// Speed change per tick while accelerating or braking.
    pub acceleration: f32,
    /// Degrees of heading change per unit of steering axis per tick.
    pub rotation_sensitivity: f32,
    pub deadzone: f32,
    pub world: WorldBounds,
    pub extent: VehicleExtent,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            gears: GearTable::default(),
            acceleration: 0.1,
            rotation_sensitivity: 0.02,
            deadzone: DEFAULT_DEADZONE,
            world: WorldBounds::default(),
            extent: VehicleExtent::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MotionController {
    params: MotionParams,
}

impl MotionController {
    pub fn new(params: MotionParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &MotionParams {
        &self.params
    }

    /// Computes the vehicle state for the next tick.
    pub fn advance(&self, state: VehicleState, input: &InputSnapshot) -> VehicleState {
        let mut next = state;
        next.heading = self.steer(&state, input);
        next.speed = self.update_speed(&next, input);
        next.gear = self.shift(&next, input);
        next.position = self.integrate(&next);
        next.position = self.params.world.clamp(next.position, &self.params.extent);
        next
    }

    // Reverse flips the steering sign, like backing up a real car
    fn steer(&self, state: &VehicleState, input: &InputSnapshot) -> f32 {
        if input.steer_axis.abs() <= self.params.deadzone {
            return state.heading;
        }
        let direction = if state.is_reversing() { -1.0 } else { 1.0 };
        state.heading + input.steer_axis * self.params.rotation_sensitivity * direction
    }

    fn update_speed(&self, state: &VehicleState, input: &InputSnapshot) -> f32 {
        let gears = &self.params.gears;
        let speed = state.speed;

        if input.deadman_engaged && input.accelerate {
            (speed + self.params.acceleration).min(gears.cap(state.gear))
        } else if input.deadman_engaged && input.brake {
            // brake keeps pulling past zero into reverse
            (speed - self.params.acceleration).max(gears.reverse_cap)
        } else if input.deadman_engaged {
            decay(speed, SOFT_COAST_DECAY, SOFT_COAST_SNAP)
        } else {
            decay(speed, HARD_COAST_DECAY, HARD_COAST_SNAP)
        }
    }

    // Speed is left alone on a downshift; the lower cap only limits later
    // acceleration.
    fn shift(&self, state: &VehicleState, input: &InputSnapshot) -> Gear {
        let mut gear = state.gear;
        if input.gear_up_pressed {
            gear = gear.shifted_up();
        }
        if input.gear_down_pressed {
            gear = gear.shifted_down();
        }
        if gear != state.gear {
            debug!("Gear shift {} -> {} at speed {:.3}", state.gear, gear, state.speed);
        }
        gear
    }

    fn integrate(&self, state: &VehicleState) -> Position {
        if state.speed.abs() <= MOTION_THRESHOLD {
            return state.position;
        }
        let radians = state.heading.to_radians();
        Position {
            x: state.position.x + radians.cos() * state.speed,
            y: state.position.y + radians.sin() * state.speed,
        }
    }
}

fn decay(speed: f32, factor: f32, snap: f32) -> f32 {
    let speed = speed * factor;
    if speed.abs() < snap {
        0.0
    } else {
        speed
    }
}
