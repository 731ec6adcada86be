//! # Simulator Configuration
//!
//! All tuning is static: it is read once from a TOML file at startup,
//! validated, and then handed to the motion model and the tick loop. A
//! default file is written on first start so there is always something to
//! edit.
//!
//! The file lives at `$ROBODRIVE_CONFIG` if set, otherwise at
//! `<config dir>/robodrive/config.toml`.

use crate::controller::gamepad::ControlBindings;
use crate::controller::input_sampler::{AXIS_RANGE, DEFAULT_DEADZONE};
use crate::motion::{GearTable, MotionParams, Position, VehicleExtent, VehicleState, WorldBounds};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn, Level};

const CONFIG_ENV: &str = "ROBODRIVE_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config value {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Vehicle size and where it starts.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct VehicleConfig {
    pub width: f32,
    pub height: f32,
    pub start_x: f32,
    pub start_y: f32,
    /// Degrees
    pub start_heading: f32,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        let extent = VehicleExtent::default();
        Self {
            width: extent.width,
            height: extent.height,
            start_x: 960.0,
            start_y: 540.0,
            start_heading: 0.0,
        }
    }
}

/// Motion constants. Speeds are world units per tick.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct TuningConfig {
    /// Forward cap for gears 1, 2 and 3
    pub gear_speed_caps: [f32; 3],
    pub reverse_speed_cap: f32,
    pub acceleration: f32,
    pub rotation_sensitivity: f32,
    /// Steering deadzone on the ±100 stick scale
    pub joystick_deadzone: f32,
}

impl Default for TuningConfig {
    fn default() -> Self {
        let gears = GearTable::default();
        let defaults = MotionParams::default();
        Self {
            gear_speed_caps: [
                gears.forward_caps[1],
                gears.forward_caps[2],
                gears.forward_caps[3],
            ],
            reverse_speed_cap: gears.reverse_cap,
            acceleration: defaults.acceleration,
            rotation_sensitivity: defaults.rotation_sensitivity,
            joystick_deadzone: DEFAULT_DEADZONE,
        }
    }
}

/// Where input comes from.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Default)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum InputConfig {
    #[default]
    Gamepad,
    Script {
        path: PathBuf,
    },
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    pub tick_hz: u32,
    pub stats_interval_secs: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_hz: 60,
            stats_interval_secs: 30,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub world: WorldBounds,
    pub vehicle: VehicleConfig,
    pub tuning: TuningConfig,
    pub controls: ControlBindings,
    pub input: InputConfig,
    pub simulation: SimulationConfig,
    pub logging: LoggingConfig,
}

impl SimConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Path of the config file, honoring `ROBODRIVE_CONFIG`.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("robodrive")
            .join("config.toml")
    }

    /// Loads and validates the config, writing the defaults first if the file
    /// does not exist yet.
    pub async fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if !tokio::fs::try_exists(path).await.map_err(io_error)? {
            info!("No config at {}, writing defaults", path.display());
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
            }
            let content = toml::to_string_pretty(&SimConfig::default())?;
            tokio::fs::write(path, content).await.map_err(io_error)?;
        }

        let content = tokio::fs::read_to_string(path).await.map_err(io_error)?;
        let config = Self::from_toml(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.world.width > 0.0 && self.world.height > 0.0) {
            return Err(invalid("world", "width and height must be positive"));
        }
        let vehicle = &self.vehicle;
        if !(vehicle.width > 0.0 && vehicle.height > 0.0) {
            return Err(invalid("vehicle", "width and height must be positive"));
        }
        if vehicle.width > self.world.width || vehicle.height > self.world.height {
            return Err(invalid("vehicle", "vehicle does not fit inside the world"));
        }

        let tuning = &self.tuning;
        let caps = tuning.gear_speed_caps;
        if !(caps[0] > 0.0 && caps[0] < caps[1] && caps[1] < caps[2]) {
            return Err(invalid(
                "tuning.gear_speed_caps",
                format!("caps must be positive and increasing, got {:?}", caps),
            ));
        }
        if !(tuning.reverse_speed_cap < 0.0) {
            return Err(invalid("tuning.reverse_speed_cap", "must be negative"));
        }
        if !(tuning.acceleration > 0.0) {
            return Err(invalid("tuning.acceleration", "must be positive"));
        }
        if !tuning.rotation_sensitivity.is_finite() {
            return Err(invalid("tuning.rotation_sensitivity", "must be finite"));
        }
        if !(0.0..AXIS_RANGE).contains(&tuning.joystick_deadzone) {
            return Err(invalid(
                "tuning.joystick_deadzone",
                format!("must be within [0, {})", AXIS_RANGE),
            ));
        }

        if self.simulation.tick_hz == 0 {
            return Err(invalid("simulation.tick_hz", "must be at least 1"));
        }
        if self.simulation.stats_interval_secs == 0 {
            return Err(invalid("simulation.stats_interval_secs", "must be at least 1"));
        }
        if Level::from_str(&self.logging.level).is_err() {
            return Err(invalid(
                "logging.level",
                format!("unknown level {:?}", self.logging.level),
            ));
        }
        Ok(())
    }

    pub fn motion_params(&self) -> MotionParams {
        let caps = self.tuning.gear_speed_caps;
        MotionParams {
            gears: GearTable {
                forward_caps: [0.0, caps[0], caps[1], caps[2]],
                reverse_cap: self.tuning.reverse_speed_cap,
            },
            acceleration: self.tuning.acceleration,
            rotation_sensitivity: self.tuning.rotation_sensitivity,
            deadzone: self.tuning.joystick_deadzone,
            world: self.world,
            extent: VehicleExtent {
                width: self.vehicle.width,
                height: self.vehicle.height,
            },
        }
    }

    /// Parked vehicle at the configured start, pulled inside the world.
    pub fn initial_vehicle(&self) -> VehicleState {
        let params = self.motion_params();
        let start = Position::new(self.vehicle.start_x, self.vehicle.start_y);
        if !params.world.contains(start, &params.extent) {
            warn!(
                "Start position ({:.1}, {:.1}) is outside the drivable area, moving it inside",
                start.x, start.y
            );
        }
        VehicleState::parked_at(
            params.world.clamp(start, &params.extent),
            self.vehicle.start_heading,
        )
    }

    pub fn log_level(&self) -> Level {
        Level::from_str(&self.logging.level).unwrap_or(Level::INFO)
    }
}
