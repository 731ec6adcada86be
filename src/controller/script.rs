//! Scripted input for headless and reproducible runs.
//!
//! A script is a TOML file of `[[step]]` tables, each holding the raw control
//! state for a number of ticks:
//!
//! ```toml
//! [[step]]
//! ticks = 60
//! deadman = true
//! accelerate = true
//!
//! [[step]]
//! ticks = 30
//! steer = 60.0
//! ```

use super::input_sampler::{RawButtons, RawDeviceState};
use super::InputSource;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("Failed to read input script {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse input script: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Input script has no steps")]
    Empty,
}

fn default_ticks() -> u32 {
    1
}

fn default_connected() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    #[serde(default = "default_ticks")]
    pub ticks: u32,
    #[serde(default = "default_connected")]
    pub connected: bool,
    #[serde(default)]
    pub steer: f32,
    #[serde(default)]
    pub deadman: bool,
    #[serde(default)]
    pub accelerate: bool,
    #[serde(default)]
    pub brake: bool,
    #[serde(default)]
    pub gear_up: bool,
    #[serde(default)]
    pub gear_down: bool,
}

impl ScriptStep {
    fn device_state(&self) -> RawDeviceState {
        RawDeviceState {
            connected: self.connected,
            steer_axis: self.steer,
            buttons: RawButtons {
                deadman: self.deadman,
                accelerate: self.accelerate,
                brake: self.brake,
                gear_up: self.gear_up,
                gear_down: self.gear_down,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ScriptFile {
    #[serde(default)]
    step: Vec<ScriptStep>,
}

/// Replays a fixed timeline of device states, one per tick.
#[derive(Debug, Clone)]
pub struct ScriptedInput {
    steps: Vec<ScriptStep>,
    index: usize,
    ticks_into_step: u32,
}

impl ScriptedInput {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            index: 0,
            ticks_into_step: 0,
        }
    }

    pub fn parse(content: &str) -> Result<Self, ScriptError> {
        let file: ScriptFile = toml::from_str(content)?;
        if file.step.is_empty() {
            return Err(ScriptError::Empty);
        }
        Ok(Self::new(file.step))
    }

    pub async fn load(path: &Path) -> Result<Self, ScriptError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ScriptError::Read {
                path: path.display().to_string(),
                source,
            })?;
        let script = Self::parse(&content)?;
        info!(
            "Loaded input script {} with {} steps ({} ticks)",
            path.display(),
            script.steps.len(),
            script.total_ticks()
        );
        Ok(script)
    }

    pub fn total_ticks(&self) -> u64 {
        self.steps.iter().map(|step| u64::from(step.ticks)).sum()
    }

    fn skip_finished_steps(&mut self) {
        while let Some(step) = self.steps.get(self.index) {
            if self.ticks_into_step < step.ticks {
                break;
            }
            self.index += 1;
            self.ticks_into_step = 0;
            debug!("Input script advanced to step {}", self.index);
        }
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> RawDeviceState {
        self.skip_finished_steps();
        match self.steps.get(self.index) {
            Some(step) => {
                self.ticks_into_step += 1;
                step.device_state()
            }
            None => RawDeviceState::disconnected(),
        }
    }

    fn is_exhausted(&self) -> bool {
        self.steps[self.index.min(self.steps.len())..]
            .iter()
            .enumerate()
            .all(|(offset, step)| {
                let used = if offset == 0 { self.ticks_into_step } else { 0 };
                used >= step.ticks
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"
        [[step]]
        ticks = 2
        deadman = true
        accelerate = true

        [[step]]
        steer = -40.0
        gear_up = true
    "#;

    #[test]
    fn steps_repeat_for_their_tick_count() {
        let mut script = ScriptedInput::parse(SCRIPT).unwrap();
        assert_eq!(script.total_ticks(), 3);

        let first = script.poll();
        let second = script.poll();
        assert!(first.buttons.accelerate && second.buttons.accelerate);
        assert!(!script.is_exhausted());

        let third = script.poll();
        assert!(third.connected);
        assert_eq!(third.steer_axis, -40.0);
        assert!(third.buttons.gear_up);
        assert!(!third.buttons.deadman);
        assert!(script.is_exhausted());

        assert_eq!(script.poll(), RawDeviceState::disconnected());
    }

    #[test]
    fn zero_tick_steps_are_skipped() {
        let mut script = ScriptedInput::new(vec![
            ScriptStep {
                ticks: 0,
                connected: true,
                steer: 90.0,
                deadman: false,
                accelerate: false,
                brake: false,
                gear_up: false,
                gear_down: false,
            },
            ScriptStep {
                ticks: 1,
                connected: false,
                steer: 0.0,
                deadman: false,
                accelerate: false,
                brake: false,
                gear_up: false,
                gear_down: false,
            },
        ]);
        let device = script.poll();
        assert!(!device.connected);
        assert!(script.is_exhausted());
    }

    #[test]
    fn empty_script_is_rejected() {
        assert!(matches!(ScriptedInput::parse(""), Err(ScriptError::Empty)));
        assert!(matches!(
            ScriptedInput::parse("[[step]]\nticks = \"many\""),
            Err(ScriptError::Parse(_))
        ));
    }
}
