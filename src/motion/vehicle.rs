use super::gear::Gear;
use serde::{Deserialize, Serialize};

/// Below this speed the vehicle is considered to be reversing.
pub const REVERSE_THRESHOLD: f32 = -0.1;

// Position in world units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Driving mode derived from the signed speed.
///
/// Never stored; always recomputed from [`VehicleState::speed`] so it cannot
/// drift from the value it describes. Reverse starts at the same threshold the
/// steering inversion and the gear indicator use, so a slight negative creep
/// still counts as forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
    Forward,
    Reverse,
    Stopped,
}

/// Complete pose and drivetrain state of the single simulated vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub position: Position,
    /// Degrees, unbounded.
    pub heading: f32,
    /// World units per tick, negative when reversing.
    pub speed: f32,
    pub gear: Gear,
}

impl VehicleState {
    /// A stationary vehicle in first gear.
    pub fn parked_at(position: Position, heading: f32) -> Self {
        Self {
            position,
            heading,
            speed: 0.0,
            gear: Gear::FIRST,
        }
    }

    pub fn is_reversing(&self) -> bool {
        self.speed < REVERSE_THRESHOLD
    }

    pub fn drive_mode(&self) -> DriveMode {
        if self.is_reversing() {
            DriveMode::Reverse
        } else if self.speed == 0.0 {
            DriveMode::Stopped
        } else {
            DriveMode::Forward
        }
    }

    /// Label shown on the gear indicator: `R` while reversing, otherwise the
    /// gear number.
    pub fn gear_label(&self) -> String {
        if self.drive_mode() == DriveMode::Reverse {
            "R".to_string()
        } else {
            self.gear.to_string()
        }
    }
}

impl Default for VehicleState {
    fn default() -> Self {
        Self::parked_at(Position::new(960.0, 540.0), 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_speed(speed: f32) -> VehicleState {
        VehicleState {
            speed,
            ..VehicleState::default()
        }
    }

    #[test]
    fn gear_label_shows_r_only_below_threshold() {
        assert_eq!(with_speed(-0.5).gear_label(), "R");
        assert_eq!(with_speed(-0.1).gear_label(), "1");
        assert_eq!(with_speed(0.0).gear_label(), "1");

        let mut third = with_speed(3.0);
        third.gear = Gear::TOP;
        assert_eq!(third.gear_label(), "3");
    }

    #[test]
    fn drive_mode_uses_reverse_threshold() {
        assert_eq!(with_speed(1.0).drive_mode(), DriveMode::Forward);
        assert_eq!(with_speed(-1.0).drive_mode(), DriveMode::Reverse);
        assert_eq!(with_speed(0.0).drive_mode(), DriveMode::Stopped);

        // creep above the threshold agrees with the gear indicator
        let creep = with_speed(-0.05);
        assert_eq!(creep.drive_mode(), DriveMode::Forward);
        assert_eq!(creep.gear_label(), "1");
        assert!(!creep.is_reversing());
    }

    #[test]
    fn default_vehicle_is_parked_in_the_middle() {
        let state = VehicleState::default();
        assert_eq!(state.position, Position::new(960.0, 540.0));
        assert_eq!(state.speed, 0.0);
        assert_eq!(state.gear, Gear::FIRST);
    }
}
