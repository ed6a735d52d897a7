//! Batch Timer - A state-managed HTTP server for working-hours countdowns
//!
//! This is the main entry point for the batch-timer application.

use std::sync::Arc;
use tokio::{net::TcpListener, sync::watch};
use tracing::info;

use batch_timer::{
    api::create_router,
    config::Config,
    services::ScopeFile,
    state::{AppState, ScopeStore},
    tasks::countdown_display_task,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("batch_timer={},tower_http=info", config.log_level()))
        .init();

    let schedule = config.schedule();
    info!("Starting batch-timer server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, schedule={}, poll={}s",
          config.host, config.port, schedule.describe(), config.poll_interval);

    // Load persisted scopes, if a data file is configured
    let state = match &config.data_file {
        Some(path) => {
            let file = ScopeFile::new(path);
            let scopes = file.load().await?;
            info!("Persisting scopes to {}", path.display());
            AppState::with_scopes(config.port, config.host.clone(), schedule, ScopeStore::from_scopes(scopes))
                .with_data_file(file)
        }
        None => {
            info!("No data file configured, scopes are kept in memory only");
            AppState::new(config.port, config.host.clone(), schedule)
        }
    };
    let state = Arc::new(state);

    // Start the live countdown background task
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let display_state = Arc::clone(&state);
    let poll_interval = config.poll_interval();
    let display_task = tokio::spawn(async move {
        countdown_display_task(display_state, poll_interval, shutdown_rx).await;
    });

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET    /scopes                     - List scopes with live remaining time");
    info!("  POST   /scopes                     - Create a scope");
    info!("  GET    /scopes/:id                 - Scope snapshot with serverTime");
    info!("  DELETE /scopes/:id                 - Delete a scope");
    info!("  POST   /scopes/:id/timer/start     - Start the countdown");
    info!("  POST   /scopes/:id/timer/pause     - Pause the countdown");
    info!("  POST   /scopes/:id/timer/reset     - Reset to full duration");
    info!("  PUT    /scopes/:id/timer/duration  - Set total hours");
    info!("  GET    /countdowns                 - Live countdown board");
    info!("  GET    /status                     - Server status");
    info!("  GET    /health                     - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    // Stop the display task before exiting
    if shutdown_tx.send(true).is_err() {
        tracing::debug!("Countdown display task already stopped");
    }
    if let Err(e) = display_task.await {
        tracing::error!("Countdown display task failed: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}
