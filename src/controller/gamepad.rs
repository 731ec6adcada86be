//! Gamepad Reader - gilrs-backed [`InputSource`]
//!
//! Raw gilrs events are converted into [`RawControllerEvent`]s first and then
//! folded into a [`PadState`]. The fold knows nothing about gilrs, which keeps
//! the interesting part testable without hardware.
//!
//! ```text
//! gilrs ──► RawControllerEvent ──► PadState ──► RawDeviceState
//!                                  (bindings)
//! ```

use super::input_sampler::{RawButtons, RawDeviceState, AXIS_RANGE};
use super::InputSource;
use chrono::{DateTime, Local};
use gilrs::{Axis, Button, Event, EventType, GamepadId, Gilrs};
use serde::{Deserialize, Serialize};
use statum::{machine, state};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

// Raw controller event with chrono timestamps
#[derive(Debug, Clone)]
pub enum RawControllerEvent {
    SteerMove {
        value: f32,
        timestamp: DateTime<Local>,
    },
    ButtonEvent {
        button_type: ButtonType,
        button_state: ButtonState,
        timestamp: DateTime<Local>,
    },
    Connected,
    Disconnected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
}

/// Physical gamepad buttons, named by their position on the pad.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonType {
    South,
    East,
    West,
    North,
    Start,
    Select,
    LeftBumper,
    RightBumper,
    LeftTrigger,
    RightTrigger,
    LeftStick,
    RightStick,
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
    Guide,
}

/// Which physical button drives each control role.
///
/// Defaults follow a PlayStation layout: L1 deadman, R2 throttle, L2 brake,
/// triangle to shift up and cross to shift down.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlBindings {
    pub deadman: ButtonType,
    pub accelerate: ButtonType,
    pub brake: ButtonType,
    pub gear_up: ButtonType,
    pub gear_down: ButtonType,
}

impl Default for ControlBindings {
    fn default() -> Self {
        Self {
            deadman: ButtonType::LeftBumper,
            accelerate: ButtonType::RightTrigger,
            brake: ButtonType::LeftTrigger,
            gear_up: ButtonType::North,
            gear_down: ButtonType::South,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GamepadError {
    #[error("Failed to initialize gamepad backend: {0}")]
    InitializationError(String),
}

/// Last known state of the active pad.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PadState {
    connected: bool,
    /// Stick position in gilrs units (-1.0..=1.0)
    steer_x: f32,
    pressed: HashSet<ButtonType>,
}

impl PadState {
    pub fn connected() -> Self {
        Self {
            connected: true,
            ..Self::default()
        }
    }

    pub fn apply(&mut self, event: &RawControllerEvent) {
        match event {
            RawControllerEvent::SteerMove { value, timestamp } => {
                debug!("Steer {:.4} at {}", value, timestamp.format("%H:%M:%S.%3f"));
                self.steer_x = *value;
            }
            RawControllerEvent::ButtonEvent {
                button_type,
                button_state,
                timestamp,
            } => match button_state {
                ButtonState::Pressed => {
                    debug!(
                        "Button pressed: {:?} at {}",
                        button_type,
                        timestamp.format("%H:%M:%S.%3f")
                    );
                    self.pressed.insert(*button_type);
                }
                ButtonState::Released => {
                    debug!(
                        "Button released: {:?} at {}",
                        button_type,
                        timestamp.format("%H:%M:%S.%3f")
                    );
                    self.pressed.remove(button_type);
                }
            },
            RawControllerEvent::Connected => {
                self.connected = true;
            }
            RawControllerEvent::Disconnected => {
                // nothing stays held on a pad that is gone
                *self = Self::default();
            }
        }
    }

    pub fn to_device_state(&self, bindings: &ControlBindings) -> RawDeviceState {
        if !self.connected {
            return RawDeviceState::disconnected();
        }
        let held = |button: ButtonType| self.pressed.contains(&button);
        RawDeviceState {
            connected: true,
            steer_axis: self.steer_x * AXIS_RANGE,
            buttons: RawButtons {
                deadman: held(bindings.deadman),
                accelerate: held(bindings.accelerate),
                brake: held(bindings.brake),
                gear_up: held(bindings.gear_up),
                gear_down: held(bindings.gear_down),
            },
        }
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum ReaderState {
    Initializing,
    Polling,
}

#[machine]
#[derive(Debug)]
pub struct GamepadReader<S: ReaderState> {
    // Gilrs context
    gilrs: Gilrs,

    // Pad whose events are honored
    active_gamepad: Option<GamepadId>,

    bindings: ControlBindings,

    pad: PadState,
}

/// First connected pad in `pads`, ignoring `skip`.
fn first_connected<I: Copy + PartialEq>(
    pads: impl IntoIterator<Item = (I, bool)>,
    skip: Option<I>,
) -> Option<I> {
    pads.into_iter()
        .find(|(id, connected)| *connected && Some(*id) != skip)
        .map(|(id, _)| id)
}

impl<S: ReaderState> GamepadReader<S> {
    fn connected_pad(&self, skip: Option<GamepadId>) -> Option<(GamepadId, String)> {
        let id = first_connected(
            self.gilrs
                .gamepads()
                .map(|(id, gamepad)| (id, gamepad.is_connected())),
            skip,
        )?;
        Some((id, self.gilrs.gamepad(id).name().to_string()))
    }
}

impl GamepadReader<Initializing> {
    pub fn create(bindings: ControlBindings) -> Result<Self, GamepadError> {
        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(GamepadError::InitializationError(e.to_string()));
            }
        };

        debug!("Gamepad bindings: {:?}", bindings);
        Ok(Self::new(gilrs, None, bindings, PadState::default()))
    }

    /// Picks the first connected pad and starts polling.
    ///
    /// Having no pad is not an error; the reader reports a disconnected device
    /// until one shows up.
    pub fn initialize(mut self) -> GamepadReader<Polling> {
        match self.connected_pad(None) {
            Some((id, name)) => {
                info!("Selected gamepad: {} ({})", name, id);
                self.active_gamepad = Some(id);
                self.pad = PadState::connected();
            }
            None => warn!("No gamepad connected, continuing with neutral input"),
        }

        self.transition()
    }
}

impl GamepadReader<Polling> {
    fn drain_events(&mut self) {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            match self.active_gamepad {
                Some(active_id) if id != active_id => {
                    debug!("Skipping event from non-active gamepad: {:?}", id);
                    continue;
                }
                None if matches!(event, EventType::Connected) => {
                    info!("Gamepad {} connected, selecting it", id);
                    self.active_gamepad = Some(id);
                }
                None => continue,
                _ => {}
            }

            if let Some(raw_event) = convert_gilrs_event(event) {
                self.pad.apply(&raw_event);
                if matches!(raw_event, RawControllerEvent::Disconnected) {
                    warn!("Active gamepad {} disconnected", id);
                    self.active_gamepad = None;
                    self.adopt_remaining_pad(id);
                }
            }
        }
    }
}

impl GamepadReader<Polling> {
    // another pad may already be plugged in; it will not send Connected again
    fn adopt_remaining_pad(&mut self, gone: GamepadId) {
        match self.connected_pad(Some(gone)) {
            Some((id, name)) => {
                info!("Switching to gamepad: {} ({})", name, id);
                self.active_gamepad = Some(id);
                self.pad = PadState::connected();
            }
            None => warn!("No other gamepad connected, input is neutral"),
        }
    }
}

impl InputSource for GamepadReader<Polling> {
    fn poll(&mut self) -> RawDeviceState {
        self.drain_events();
        self.pad.to_device_state(&self.bindings)
    }
}

fn convert_gilrs_event(event: EventType) -> Option<RawControllerEvent> {
    let now = Local::now();

    match event {
        EventType::AxisChanged(Axis::LeftStickX, value, _) => Some(RawControllerEvent::SteerMove {
            value,
            timestamp: now,
        }),
        EventType::AxisChanged(axis, value, _) => {
            debug!("Ignoring axis {:?} = {:.4}", axis, value);
            None
        }
        EventType::ButtonPressed(button, _) => {
            map_button(button).map(|button_type| RawControllerEvent::ButtonEvent {
                button_type,
                button_state: ButtonState::Pressed,
                timestamp: now,
            })
        }
        EventType::ButtonReleased(button, _) => {
            map_button(button).map(|button_type| RawControllerEvent::ButtonEvent {
                button_type,
                button_state: ButtonState::Released,
                timestamp: now,
            })
        }
        EventType::Connected => Some(RawControllerEvent::Connected),
        EventType::Disconnected => Some(RawControllerEvent::Disconnected),
        _ => None,
    }
}

fn map_button(button: Button) -> Option<ButtonType> {
    match button {
        Button::South => Some(ButtonType::South),
        Button::East => Some(ButtonType::East),
        Button::West => Some(ButtonType::West),
        Button::North => Some(ButtonType::North),
        Button::Start => Some(ButtonType::Start),
        Button::Select => Some(ButtonType::Select),
        Button::LeftTrigger => Some(ButtonType::LeftBumper),
        Button::RightTrigger => Some(ButtonType::RightBumper),
        Button::LeftTrigger2 => Some(ButtonType::LeftTrigger),
        Button::RightTrigger2 => Some(ButtonType::RightTrigger),
        Button::LeftThumb => Some(ButtonType::LeftStick),
        Button::RightThumb => Some(ButtonType::RightStick),
        Button::DPadUp => Some(ButtonType::DPadUp),
        Button::DPadDown => Some(ButtonType::DPadDown),
        Button::DPadLeft => Some(ButtonType::DPadLeft),
        Button::DPadRight => Some(ButtonType::DPadRight),
        Button::Mode => Some(ButtonType::Guide),
        _ => None,
    }
}
