pub mod config;
pub mod controller;
pub mod hud;
pub mod logging;
pub mod motion;
pub mod simulation;

use crate::config::{InputConfig, SimConfig};
use crate::logging::LogLevelHandle;
use crate::controller::{GamepadReader, InputSource, ScriptedInput};
use crate::motion::MotionController;
use crate::simulation::TickLoop;
use color_eyre::{eyre::eyre, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    let log_level = setup()?;

    let config_path = SimConfig::default_path();
    let config = SimConfig::load_or_create(&config_path)
        .await
        .map_err(|e| eyre!("Failed to load config {}: {}", config_path.display(), e))?;
    log_level.set_level(config.log_level())?;

    info!(
        "Robot delivery simulator starting with config {}",
        config_path.display()
    );
    let source = open_input_source(&config).await?;
    let controller = MotionController::new(config.motion_params());
    let tick_loop = TickLoop::create(source, controller, config.initial_vehicle());

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, stopping"),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
        signal_token.cancel();
    });

    let stats_interval = chrono::Duration::seconds(config.simulation.stats_interval_secs as i64);
    let presenter = tokio::spawn(hud::run_presenter(
        tick_loop.subscribe(),
        stats_interval,
        shutdown.clone(),
    ));

    let final_state = simulation::run_tick_loop(
        tick_loop,
        config.simulation.tick_hz,
        stats_interval,
        shutdown.clone(),
    )
    .await?;

    shutdown.cancel();
    match presenter.await {
        Ok(summary) => info!(
            "Final readout: {} after {} gear changes",
            summary.last, summary.gear_changes
        ),
        Err(e) => error!("Presenter task failed: {}", e),
    }
    info!("Final state: {}", hud::HudReadout::from_state(&final_state));
    Ok(())
}

async fn open_input_source(config: &SimConfig) -> Result<Box<dyn InputSource>> {
    match &config.input {
        InputConfig::Gamepad => {
            let reader = GamepadReader::create(config.controls.clone())?;
            Ok(Box::new(reader.initialize()))
        }
        InputConfig::Script { path } => {
            let script = ScriptedInput::load(path).await?;
            Ok(Box::new(script))
        }
    }
}

fn setup() -> Result<LogLevelHandle> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }

    let (subscriber, log_level) = logging::build_subscriber(std::io::stdout);
    subscriber.try_init()?;
    Ok(log_level)
}
