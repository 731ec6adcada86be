//! Input Sampler - converts raw device state into a per-tick [`InputSnapshot`]
//!
//! The sampler is a pure function of the device state and the previous
//! [`ButtonLatch`]. It owns no hidden state; the caller threads the latch from
//! one tick to the next.

use serde::{Deserialize, Serialize};

/// Full deflection of the steering axis on the raw scale.
pub const AXIS_RANGE: f32 = 100.0;

/// Default steering deadzone on the ±100 scale.
pub const DEFAULT_DEADZONE: f32 = 25.0;

/// Raw pressed state of every control role for the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawButtons {
    pub deadman: bool,
    pub accelerate: bool,
    pub brake: bool,
    pub gear_up: bool,
    pub gear_down: bool,
}

/// Device state as read from hardware (or a script) before any filtering.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawDeviceState {
    pub connected: bool,
    /// Horizontal stick position on the ±100 scale.
    pub steer_axis: f32,
    pub buttons: RawButtons,
}

impl RawDeviceState {
    pub fn disconnected() -> Self {
        Self::default()
    }
}

/// Filtered, edge-detected input consumed by the motion controller.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputSnapshot {
    pub deadman_engaged: bool,
    /// Zero unless the stick is outside the deadzone.
    pub steer_axis: f32,
    pub accelerate: bool,
    pub brake: bool,
    /// True only on the tick the gear-up button goes down.
    pub gear_up_pressed: bool,
    /// True only on the tick the gear-down button goes down.
    pub gear_down_pressed: bool,
}

impl InputSnapshot {
    /// Snapshot with every control released.
    pub fn neutral() -> Self {
        Self::default()
    }
}

/// Previous raw state of the two edge-triggered buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonLatch {
    pub gear_up_was_pressed: bool,
    pub gear_down_was_pressed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSampler {
    deadzone: f32,
}

impl Default for InputSampler {
    fn default() -> Self {
        Self::new(DEFAULT_DEADZONE)
    }
}

impl InputSampler {
    pub fn new(deadzone: f32) -> Self {
        Self { deadzone }
    }

    /// Produces this tick's snapshot and the latch to pass to the next call.
    ///
    /// A disconnected device yields a neutral snapshot and leaves the latch
    /// untouched, so a button held across a reconnect does not shift twice.
    pub fn sample(&self, device: &RawDeviceState, latch: ButtonLatch) -> (InputSnapshot, ButtonLatch) {
        if !device.connected {
            return (InputSnapshot::neutral(), latch);
        }

        let buttons = device.buttons;
        let snapshot = InputSnapshot {
            deadman_engaged: buttons.deadman,
            steer_axis: apply_deadzone(device.steer_axis, self.deadzone),
            accelerate: buttons.accelerate,
            brake: buttons.brake,
            gear_up_pressed: buttons.gear_up && !latch.gear_up_was_pressed,
            gear_down_pressed: buttons.gear_down && !latch.gear_down_was_pressed,
        };
        let next_latch = ButtonLatch {
            gear_up_was_pressed: buttons.gear_up,
            gear_down_was_pressed: buttons.gear_down,
        };

        (snapshot, next_latch)
    }
}

// Raw value passes through unscaled once it leaves the deadzone
fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    let value = value.clamp(-AXIS_RANGE, AXIS_RANGE);
    if value.abs() > deadzone {
        value
    } else {
        0.0
    }
}
