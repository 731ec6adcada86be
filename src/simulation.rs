//! Fixed-rate simulation loop
//!
//! Each tick walks a small state machine:
//!
//! ```text
//! Sampling ──► Advancing(InputSnapshot) ──► Publishing ──► Sampling
//! ```
//!
//! The loop owns the only [`VehicleState`] and the [`ButtonLatch`]; the
//! presentation side only ever sees copies sent through a watch channel.
//! Shutdown is checked once per tick.

use crate::controller::{ButtonLatch, InputSampler, InputSnapshot, InputSource};
use crate::motion::{MotionController, VehicleState};
use chrono::Local;
use statum::{machine, state};
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Invalid tick rate: {0} Hz")]
    InvalidTickRate(u32),
}

#[state]
#[derive(Debug, Clone)]
pub enum TickState {
    Sampling,
    Advancing(InputSnapshot),
    Publishing,
}

#[machine]
#[derive(Debug)]
pub struct TickLoop<S: TickState> {
    source: Box<dyn InputSource>,
    sampler: InputSampler,
    latch: ButtonLatch,
    controller: MotionController,
    vehicle: VehicleState,
    state_sender: watch::Sender<VehicleState>,
}

impl<S: TickState> TickLoop<S> {
    pub fn vehicle(&self) -> &VehicleState {
        &self.vehicle
    }

    pub fn subscribe(&self) -> watch::Receiver<VehicleState> {
        self.state_sender.subscribe()
    }
}

impl TickLoop<Sampling> {
    pub fn create(
        source: Box<dyn InputSource>,
        controller: MotionController,
        vehicle: VehicleState,
    ) -> Self {
        let sampler = InputSampler::new(controller.params().deadzone);
        let (state_sender, _) = watch::channel(vehicle);
        debug!("Created tick loop starting from {:?}", vehicle);
        Self::new(
            source,
            sampler,
            ButtonLatch::default(),
            controller,
            vehicle,
            state_sender,
        )
    }

    pub fn is_source_exhausted(&self) -> bool {
        self.source.is_exhausted()
    }

    pub fn sample(mut self) -> TickLoop<Advancing> {
        let device = self.source.poll();
        let (snapshot, latch) = self.sampler.sample(&device, self.latch);
        self.latch = latch;
        self.transition_with(snapshot)
    }
}

impl TickLoop<Advancing> {
    pub fn advance(mut self) -> TickLoop<Publishing> {
        let snapshot = self.get_state_data().copied().unwrap_or_default();
        self.vehicle = self.controller.advance(self.vehicle, &snapshot);
        self.transition()
    }
}

impl TickLoop<Publishing> {
    pub fn publish(self) -> TickLoop<Sampling> {
        // no receivers just means nobody is drawing right now
        self.state_sender.send_replace(self.vehicle);
        self.transition()
    }
}

impl TickLoop<Sampling> {
    /// Runs exactly one tick and returns the loop ready for the next one.
    pub fn tick(self) -> Self {
        self.sample().advance().publish()
    }
}

/// Drives the loop at `tick_hz` until `shutdown` fires or the input source is
/// exhausted, then returns the final vehicle state.
pub async fn run_tick_loop(
    mut tick_loop: TickLoop<Sampling>,
    tick_hz: u32,
    stats_interval: chrono::Duration,
    shutdown: CancellationToken,
) -> Result<VehicleState, SimulationError> {
    if tick_hz == 0 {
        return Err(SimulationError::InvalidTickRate(tick_hz));
    }
    let period = Duration::from_secs_f64(1.0 / f64::from(tick_hz));
    info!("Starting simulation loop at {} Hz ({:?} per tick)", tick_hz, period);

    let mut interval_timer = interval(period);
    interval_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let budget = chrono::Duration::from_std(period).unwrap_or_else(|_| chrono::Duration::zero());
    let mut ticks: u64 = 0;
    let mut slow_ticks: u64 = 0;
    let mut busy = chrono::Duration::zero();
    let mut last_stats_time = Local::now();

    loop {
        interval_timer.tick().await;

        if shutdown.is_cancelled() {
            info!("Shutdown requested, leaving simulation loop");
            break;
        }
        if tick_loop.is_source_exhausted() {
            info!("Input source exhausted, leaving simulation loop");
            break;
        }

        let tick_start = Local::now();
        tick_loop = tick_loop.tick();
        let tick_duration = Local::now() - tick_start;

        ticks += 1;
        busy = busy + tick_duration;
        if tick_duration > budget {
            slow_ticks += 1;
            warn!(
                "Tick took {} us, over the {} us budget",
                tick_duration.num_microseconds().unwrap_or(i64::MAX),
                budget.num_microseconds().unwrap_or(0)
            );
        }

        let now = Local::now();
        if now - last_stats_time > stats_interval {
            let elapsed_seconds = (now - last_stats_time).num_seconds().max(1);
            info!(
                "Simulation stats: {} ticks in {} seconds ({:.1} ticks/sec), avg {:.1} us/tick, {} over budget",
                ticks,
                elapsed_seconds,
                ticks as f64 / elapsed_seconds as f64,
                busy.num_microseconds().unwrap_or(0) as f64 / ticks as f64,
                slow_ticks
            );
            ticks = 0;
            slow_ticks = 0;
            busy = chrono::Duration::zero();
            last_stats_time = now;
        }
    }

    let final_state = *tick_loop.vehicle();
    info!(
        "Simulation stopped at ({:.1}, {:.1}), speed {:.3}, gear {}",
        final_state.position.x, final_state.position.y, final_state.speed, final_state.gear
    );
    Ok(final_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::script::ScriptedInput;
    use crate::motion::{Gear, MotionParams, Position};

    fn scripted(script: &str) -> TickLoop<Sampling> {
        let source = ScriptedInput::parse(script).unwrap();
        TickLoop::create(
            Box::new(source),
            MotionController::new(MotionParams::default()),
            VehicleState::parked_at(Position::new(960.0, 540.0), 0.0),
        )
    }

    #[test]
    fn held_gear_button_shifts_once() {
        let mut tick_loop = scripted(
            r#"
            [[step]]
            ticks = 5
            gear_up = true
            "#,
        );
        for _ in 0..5 {
            tick_loop = tick_loop.tick();
        }
        assert_eq!(tick_loop.vehicle().gear.number(), 2);
    }

    #[test]
    fn repeated_presses_shift_each_time() {
        let mut tick_loop = scripted(
            r#"
            [[step]]
            gear_up = true
            [[step]]
            [[step]]
            gear_up = true
            [[step]]
            [[step]]
            gear_up = true
            "#,
        );
        for _ in 0..6 {
            tick_loop = tick_loop.tick();
        }
        assert_eq!(tick_loop.vehicle().gear, Gear::TOP);
    }

    #[test]
    fn published_state_follows_ticks() {
        let tick_loop = scripted(
            r#"
            [[step]]
            ticks = 3
            deadman = true
            accelerate = true
            "#,
        );
        let receiver = tick_loop.subscribe();
        let tick_loop = tick_loop.tick().tick();

        assert_eq!(*receiver.borrow(), *tick_loop.vehicle());
        assert!((receiver.borrow().speed - 0.2).abs() < 1e-4);
    }

    #[test]
    fn steering_in_deadzone_is_dropped_by_sampler() {
        let mut tick_loop = scripted(
            r#"
            [[step]]
            ticks = 10
            steer = 20.0
            "#,
        );
        for _ in 0..10 {
            tick_loop = tick_loop.tick();
        }
        assert_eq!(tick_loop.vehicle().heading, 0.0);
    }

    #[tokio::test]
    async fn loop_stops_when_script_runs_out() {
        let tick_loop = scripted(
            r#"
            [[step]]
            ticks = 3
            deadman = true
            accelerate = true

            [[step]]
            ticks = 2
            deadman = true
            "#,
        );

        let final_state = run_tick_loop(
            tick_loop,
            1000,
            chrono::Duration::seconds(30),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!((final_state.speed - 0.243).abs() < 1e-4);
        assert!(final_state.position.x > 960.0);
    }

    #[tokio::test]
    async fn cancelled_loop_returns_start_state() {
        let tick_loop = scripted("[[step]]\nticks = 100\ndeadman = true\naccelerate = true");
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let final_state = run_tick_loop(tick_loop, 60, chrono::Duration::seconds(30), shutdown)
            .await
            .unwrap();
        assert_eq!(final_state.speed, 0.0);
    }

    #[tokio::test]
    async fn zero_tick_rate_is_an_error() {
        let tick_loop = scripted("[[step]]");
        let result = run_tick_loop(
            tick_loop,
            0,
            chrono::Duration::seconds(30),
            CancellationToken::new(),
        )
        .await;
        assert!(matches!(result, Err(SimulationError::InvalidTickRate(0))));
    }
}
