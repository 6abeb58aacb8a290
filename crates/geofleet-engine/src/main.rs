//! Engine binary for the Geofleet simulator.
//!
//! This is the main entry point that wires together the entity store, the
//! position simulator, its scheduler, and the read-only observer API.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `geofleet-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Open the entity store (`PostgreSQL`, or memory)
//! 4. Seed the fleet into an empty store
//! 5. Spawn the observer API
//! 6. Start the scheduler
//! 7. Wait for `Ctrl-C` or the tick limit, then stop the scheduler
//!    (letting the in-flight tick finish) and close the store

mod bootstrap;
mod error;

use std::process::ExitCode;
use std::sync::Arc;

use geofleet_core::config::{GeofleetConfig, LogFormat, LoggingConfig};
use geofleet_core::{
    seed_if_empty, Clock, PositionSimulator, Scheduler, SimulatorSettings, SystemClock,
};
use geofleet_db::EntityStore;
use geofleet_observer::{spawn_observer, AppState, ServerConfig};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Application entry point.
///
/// Exits non-zero if configuration, store startup, or the observer bind
/// fails.
#[tokio::main]
async fn main() -> ExitCode {
    let config = GeofleetConfig::load();
    let logging = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    init_tracing(&logging);

    let result = match config {
        Ok(config) => run(config).await,
        Err(e) => Err(EngineError::from(e)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "geofleet-engine failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn run(config: GeofleetConfig) -> Result<(), EngineError> {
    let sim = &config.simulation;
    info!(
        tick_interval_secs = sim.tick_interval_secs,
        perturbation_deg = sim.perturbation_deg,
        dedup_window_secs = sim.dedup_window_secs,
        max_ticks = sim.max_ticks,
        "geofleet-engine starting"
    );

    // Store
    let store = Arc::new(bootstrap::open_store(&config.store).await?);
    info!(backend = store.kind(), "Entity store ready");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Seed
    let seeded = seed_if_empty(
        store.as_ref(),
        &config.fleet,
        sim.default_geofence_radius_m,
        clock.now(),
    )
    .await?;
    if seeded.seeded {
        info!(
            vehicles = seeded.vehicles_inserted,
            geofences = seeded.geofences_inserted,
            rejected = seeded.rejected,
            "Fleet seeded"
        );
    }

    // Observer
    let observer = if config.observer.enabled {
        let state = Arc::new(AppState::new(
            Arc::clone(&store),
            store.kind(),
            config.observer.recent_alerts_limit,
        ));
        let server = ServerConfig {
            host: config.observer.host.clone(),
            port: config.observer.port,
        };
        Some(spawn_observer(&server, state).await?)
    } else {
        info!("Observer API disabled");
        None
    };

    // Simulator + scheduler
    let simulator = Arc::new(PositionSimulator::new(
        Arc::clone(&store),
        Arc::clone(&clock),
        SimulatorSettings {
            perturbation_deg: sim.perturbation_deg,
            dedup_window: sim.dedup_window(),
            seed: sim.seed,
        },
    ));
    let handle = Scheduler::new(sim.tick_interval(), sim.max_ticks).start(simulator);

    let stopper = handle.stopper();
    let signal_task = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received, finishing in-flight tick");
                stopper.stop();
            }
            Err(e) => warn!(error = %e, "Cannot listen for Ctrl-C"),
        }
    });

    let report = handle.wait().await?;
    signal_task.abort();

    info!(
        reason = ?report.stop_reason,
        ticks_completed = report.ticks_completed,
        ticks_skipped = report.ticks_skipped,
        "Simulation stopped"
    );

    if let Some(observer) = observer {
        observer.abort();
    }
    store.close().await;

    info!("geofleet-engine shutdown complete");
    Ok(())
}
