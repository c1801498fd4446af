//! `fahrplan run`: the announcer in the foreground.
//!
//! Wires the components together:
//! - signal handler (SIGTERM/SIGINT for shutdown, SIGHUP for refresh)
//! - schedule source and notification sink from config
//! - refresh coordinator driven by the periodic refresh loop

use std::sync::Arc;
use std::time::Duration;

use fahrplan_core::Clock;
use fahrplan_server::{
    Dispatcher, MemorySubscriptions, RefreshCoordinator, RefreshLoop, SignalHandler,
    StaticPresence,
};
use tracing::{info, warn};

use crate::config::CliConfig;
use crate::error::ClientResult;

/// Runs until SIGTERM or SIGINT.
pub async fn run(config: &CliConfig, clock: Arc<dyn Clock>) -> ClientResult<()> {
    let server_config = config.server_config()?;
    let source = config.source(Arc::clone(&clock))?;
    let sink = config.sink();

    info!(
        source = source.name(),
        location = %source.location(),
        sink = sink.name(),
        broadcast = %server_config.broadcast,
        "Starting announcer"
    );

    let signal_handler = SignalHandler::new();
    signal_handler.spawn_listener();

    // Standalone: nobody subscribes, everything goes to the broadcast.
    let dispatcher = Arc::new(Dispatcher::new(
        sink,
        Arc::new(MemorySubscriptions::new()),
        Arc::new(StaticPresence::new()),
        server_config.broadcast.clone(),
    ));
    let coordinator = Arc::new(RefreshCoordinator::new(
        source,
        dispatcher,
        clock,
        server_config.announce,
        server_config.session_url_template.clone(),
    ));

    let refresh_loop = RefreshLoop::new(server_config.refresh.clone());
    let loop_handle = refresh_loop.handle();

    let loop_coordinator = Arc::clone(&coordinator);
    let loop_task = tokio::spawn(async move {
        refresh_loop
            .run(move || {
                let coordinator = Arc::clone(&loop_coordinator);
                async move { coordinator.refresh().await }
            })
            .await;
    });

    let mut refresh_signal = signal_handler.refresh();
    let sighup_handle = loop_handle.clone();
    let sighup_task = tokio::spawn(async move {
        while refresh_signal.next().await {
            if sighup_handle.refresh_now().await.is_err() {
                break;
            }
        }
    });

    signal_handler.shutdown().wait().await;

    info!("Shutting down...");
    if let Err(e) = loop_handle.stop().await {
        warn!(error = %e, "Refresh loop already stopped");
    }
    let _ = tokio::time::timeout(Duration::from_secs(5), loop_task).await;
    sighup_task.abort();
    coordinator.shutdown().await;

    info!("Announcer stopped");
    Ok(())
}
