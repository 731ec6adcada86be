//! Controller subsystem for vehicle input handling
//!
//! Implements a two-stage pipeline, run once per tick:
//!
//! 1. An [`InputSource`] - [`gamepad`] hardware or a [`script`] - reports the
//!    raw device state
//! 2. [`input_sampler`] - deadzone filtering and gear button edge detection
//!
//! # Architecture
//!
//! ```text
//! Gamepad/Script ──► RawDeviceState ──► InputSampler ──► InputSnapshot
//!                                        (ButtonLatch)
//! ```

pub mod gamepad;
pub mod input_sampler;
pub mod script;

pub use gamepad::GamepadReader;
pub use input_sampler::{ButtonLatch, InputSampler, InputSnapshot, RawDeviceState};
pub use script::ScriptedInput;

use std::fmt::Debug;

/// Something that can report the controller state once per tick.
///
/// Implementations must not block; a missing device is reported as
/// [`RawDeviceState::disconnected`].
pub trait InputSource: Debug {
    fn poll(&mut self) -> RawDeviceState;

    /// True once the source will never report anything but neutral input
    /// again. Live hardware never runs out.
    fn is_exhausted(&self) -> bool {
        false
    }
}
