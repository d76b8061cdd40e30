//! Simulator server entry point.
//!
//! Startup sequence: initialize logging, load configuration, load the
//! joint-limit table, render the model document, construct the physics
//! engine and simulation handle, assemble the coordinator, and serve.
//! Any configuration failure -- missing limits file, no usable model
//! source, engine rejection -- aborts startup; nothing is retried.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use dexhand_core::{
    load_limits, render_model, Coordinator, MotionLibrary, SimConfig, SimulationHandle,
};
use dexhand_physics::ServoEngine;
use dexhand_server::{start_server, AppState, ServerConfig};

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any startup step or the server itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first so its log level can seed the filter.
    let config_path = std::env::var("DEXHAND_CONFIG")
        .map_or_else(|_| PathBuf::from("dexhand.yaml"), PathBuf::from);
    let config = if config_path.is_file() {
        SimConfig::from_file(&config_path)?
    } else {
        SimConfig::default()
    };

    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .with_target(true)
        .init();

    info!("dexhand-server starting");
    info!(
        config = %config_path.display(),
        model_source = ?config.model.source,
        broadcast_interval_ms = config.simulation.broadcast_interval_ms,
        "configuration loaded"
    );

    // Joint limits are required; a missing or broken file is fatal.
    let limits = load_limits(&config.paths.limits_file)?;
    info!(joints = limits.len(), "joint limits loaded");

    // Render the model document for the configured source.
    let model_paths = config.model.paths();
    let document = render_model(config.model.source, &model_paths, &limits)?;

    // Build the physics collaborator and the shared handle.
    let engine = ServoEngine::new(config.simulation.timestep);
    let handle = SimulationHandle::new(Box::new(engine), &document)?;

    let coordinator = Arc::new(Coordinator::new(
        handle,
        limits,
        MotionLibrary::new(config.paths.motions_dir.clone()),
        config.simulation.broadcast_interval(),
    ));

    let state = Arc::new(AppState::new(coordinator, model_paths));

    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    start_server(&server_config, state).await?;

    Ok(())
}
