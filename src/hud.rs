//! Speed and gear readout for the presentation layer.
//!
//! The readout is derived from a [`VehicleState`] on demand. The presenter task
//! here logs it; a graphical front end would draw the same two strings.

use crate::motion::{DriveMode, VehicleState};
use chrono::{DateTime, Local};
use std::fmt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HudReadout {
    pub speed: String,
    pub gear: String,
    pub mode: DriveMode,
}

impl HudReadout {
    pub fn from_state(state: &VehicleState) -> Self {
        Self {
            speed: format_speed(state.speed),
            gear: state.gear_label(),
            mode: state.drive_mode(),
        }
    }
}

impl fmt::Display for HudReadout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {:?}", self.speed, self.gear, self.mode)
    }
}

/// Speed printed with six decimals, cut to five characters, plus the unit.
pub fn format_speed(speed: f32) -> String {
    let digits = format!("{:.6}", speed);
    let shown: String = digits.chars().take(5).collect();
    format!("{} m/s", shown)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadoutEvent {
    GearChanged,
    ModeChanged,
    Periodic,
    Quiet,
}

/// Decides which readouts are worth an `info!` line.
#[derive(Debug)]
pub struct ReadoutTracker {
    last: HudReadout,
    last_report: DateTime<Local>,
    report_every: chrono::Duration,
}

impl ReadoutTracker {
    pub fn new(initial: HudReadout, report_every: chrono::Duration, now: DateTime<Local>) -> Self {
        Self {
            last: initial,
            last_report: now,
            report_every,
        }
    }

    pub fn observe(&mut self, readout: HudReadout, now: DateTime<Local>) -> ReadoutEvent {
        let event = if readout.gear != self.last.gear {
            ReadoutEvent::GearChanged
        } else if readout.mode != self.last.mode {
            ReadoutEvent::ModeChanged
        } else if now - self.last_report > self.report_every {
            ReadoutEvent::Periodic
        } else {
            ReadoutEvent::Quiet
        };
        if event != ReadoutEvent::Quiet {
            self.last_report = now;
        }
        self.last = readout;
        event
    }

    pub fn last(&self) -> &HudReadout {
        &self.last
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenterSummary {
    pub gear_changes: u32,
    pub last: HudReadout,
}

/// Logs the readout whenever the gear label or drive mode changes and
/// otherwise once per `report_every`.
pub async fn run_presenter(
    mut state_receiver: watch::Receiver<VehicleState>,
    report_every: chrono::Duration,
    shutdown: CancellationToken,
) -> PresenterSummary {
    let initial = HudReadout::from_state(&state_receiver.borrow_and_update());
    let mut tracker = ReadoutTracker::new(initial, report_every, Local::now());
    let mut gear_changes = 0;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = state_receiver.changed() => {
                if changed.is_err() {
                    debug!("Vehicle state channel closed, stopping presenter");
                    break;
                }
            }
        }

        let state = *state_receiver.borrow_and_update();
        let readout = HudReadout::from_state(&state);

        match tracker.observe(readout.clone(), Local::now()) {
            ReadoutEvent::GearChanged => {
                gear_changes += 1;
                info!("Gear {} | {}", readout.gear, readout.speed);
            }
            ReadoutEvent::ModeChanged => info!("Now {:?} at {}", readout.mode, readout.speed),
            ReadoutEvent::Periodic => info!(
                "{} at ({:.1}, {:.1}) heading {:.1}",
                readout, state.position.x, state.position.y, state.heading
            ),
            ReadoutEvent::Quiet => debug!("{}", readout),
        }
    }

    PresenterSummary {
        gear_changes,
        last: tracker.last().clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::Gear;

    fn state(speed: f32, gear: Gear) -> VehicleState {
        VehicleState {
            speed,
            gear,
            ..VehicleState::default()
        }
    }

    #[test]
    fn speed_is_truncated_to_five_characters() {
        assert_eq!(format_speed(2.07), "2.070 m/s");
        assert_eq!(format_speed(0.0), "0.000 m/s");
        assert_eq!(format_speed(-1.38), "-1.38 m/s");
        assert_eq!(format_speed(0.243), "0.243 m/s");
    }

    #[test]
    fn readout_uses_reverse_label() {
        let readout = HudReadout::from_state(&state(-1.0, Gear::TOP));
        assert_eq!(readout.gear, "R");
        assert_eq!(readout.mode, DriveMode::Reverse);
        assert_eq!(readout.to_string(), "-1.00 m/s [R] Reverse");
    }

    #[test]
    fn tracker_reports_gear_then_mode_then_periodic() {
        let start = Local::now();
        let parked = HudReadout::from_state(&VehicleState::default());
        let mut tracker = ReadoutTracker::new(parked, chrono::Duration::seconds(30), start);

        let rolling = HudReadout::from_state(&state(1.0, Gear::FIRST));
        assert_eq!(tracker.observe(rolling.clone(), start), ReadoutEvent::ModeChanged);
        assert_eq!(tracker.observe(rolling.clone(), start), ReadoutEvent::Quiet);

        let second = HudReadout::from_state(&state(1.0, Gear::new(2).unwrap()));
        assert_eq!(tracker.observe(second.clone(), start), ReadoutEvent::GearChanged);

        let later = start + chrono::Duration::seconds(31);
        assert_eq!(tracker.observe(second.clone(), later), ReadoutEvent::Periodic);
        assert_eq!(tracker.observe(second, later), ReadoutEvent::Quiet);
    }

    #[tokio::test]
    async fn presenter_stops_when_cancelled() {
        let (_sender, receiver) = watch::channel(VehicleState::default());
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let summary = run_presenter(receiver, chrono::Duration::seconds(1), shutdown).await;
        assert_eq!(summary.gear_changes, 0);
        assert_eq!(summary.last.gear, "1");
    }

    #[tokio::test]
    async fn presenter_reports_gear_label_change_from_channel() {
        let (sender, receiver) = watch::channel(VehicleState::default());
        let presenter = tokio::spawn(run_presenter(
            receiver,
            chrono::Duration::seconds(30),
            CancellationToken::new(),
        ));

        sender.send_replace(state(-1.0, Gear::FIRST));
        drop(sender);

        let summary = presenter.await.unwrap();
        assert_eq!(summary.gear_changes, 1);
        assert_eq!(summary.last.gear, "R");
        assert_eq!(summary.last.mode, DriveMode::Reverse);
    }
}
