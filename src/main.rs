//! Voxel Player Server - headless world host
//!
//! Runs the authoritative world loop, persisting players under the world
//! directory. Transport is attached through the world handle.

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voxel_player_server::app::AppState;
use voxel_player_server::config::Config;
use voxel_player_server::util::time::{init_server_time, uptime_secs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    // Initialize server time tracking
    init_server_time();

    info!("Starting Voxel Player Server");
    info!("World directory: {}", config.world_dir.display());
    info!(
        simulation_tps = config.simulation_tps,
        snapshot_tps = config.snapshot_tps,
        "Tick rates"
    );

    // Create application state
    let state = AppState::new(config)?;
    let known = state.player_store.list_names()?.len();
    info!(known_players = known, "Player store opened");

    let (world, handle) = state.build_world();

    // Log outgoing updates until a transport consumes them
    let mut updates = handle.subscribe();
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(msg) => match msg.to_json() {
                    Ok(json) => debug!(%json, "Outgoing"),
                    Err(e) => warn!(error = %e, "Failed to encode outgoing message"),
                },
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Update logger lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    world.run(shutdown_signal()).await;

    info!(uptime_secs = uptime_secs(), "Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
