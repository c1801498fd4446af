//! Unix signal handling for the announcer daemon.
//!
//! - SIGTERM/SIGINT: graceful shutdown
//! - SIGHUP: refresh the schedule now

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

pub struct SignalHandler {
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
    /// Bumped once per refresh request so none is lost between waits.
    refresh_tx: Arc<watch::Sender<u64>>,
    refresh_rx: watch::Receiver<u64>,
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHandler {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (refresh_tx, refresh_rx) = watch::channel(0);

        Self {
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
            refresh_tx: Arc::new(refresh_tx),
            refresh_rx,
        }
    }

    /// Spawns the signal listener task. Call once at startup.
    #[cfg(unix)]
    pub fn spawn_listener(&self) {
        let shutdown_tx = self.shutdown_tx.clone();
        let refresh_tx = self.refresh_tx.clone();

        tokio::spawn(async move {
            use tokio::signal::unix::{SignalKind, signal};

            let mut sigterm =
                signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
            let mut sigint =
                signal(SignalKind::interrupt()).expect("Failed to install SIGINT handler");
            let mut sighup =
                signal(SignalKind::hangup()).expect("Failed to install SIGHUP handler");

            loop {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, initiating shutdown");
                        let _ = shutdown_tx.send(true);
                        break;
                    }
                    _ = sigint.recv() => {
                        info!("Received SIGINT, initiating shutdown");
                        let _ = shutdown_tx.send(true);
                        break;
                    }
                    _ = sighup.recv() => {
                        info!("Received SIGHUP, refreshing schedule");
                        refresh_tx.send_modify(|generation| *generation += 1);
                    }
                }
            }

            debug!("Signal listener stopped");
        });
    }

    #[cfg(not(unix))]
    pub fn spawn_listener(&self) {
        let shutdown_tx = self.shutdown_tx.clone();

        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Received Ctrl+C, initiating shutdown");
                let _ = shutdown_tx.send(true);
            }
        });
    }

    pub fn shutdown(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.shutdown_rx.clone(),
        }
    }

    /// A stream of refresh requests made after this call.
    pub fn refresh(&self) -> RefreshSignal {
        let mut rx = self.refresh_rx.clone();
        rx.mark_unchanged();
        RefreshSignal { rx }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Number of refresh requests so far.
    pub fn refresh_requests(&self) -> u64 {
        *self.refresh_rx.borrow()
    }

    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn trigger_refresh(&self) {
        self.refresh_tx.send_modify(|generation| *generation += 1);
    }

    /// A handle that can be passed to other components.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
            rx: self.shutdown_rx.clone(),
        }
    }
}

/// Completes when shutdown is signaled.
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub async fn wait(mut self) {
        // An error means the sender is gone, which only happens on teardown.
        let _ = self.rx.wait_for(|shutdown| *shutdown).await;
    }
}

/// Yields once per refresh request.
pub struct RefreshSignal {
    rx: watch::Receiver<u64>,
}

impl RefreshSignal {
    /// Waits for the next request. Returns false once the handler is gone.
    ///
    /// Requests that arrive while the caller is busy are coalesced into one.
    pub async fn next(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    pub fn wait(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.rx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn trigger_shutdown() {
        let handler = SignalHandler::new();
        assert!(!handler.is_shutdown());

        handler.trigger_shutdown();
        assert!(handler.is_shutdown());
    }

    #[tokio::test]
    async fn shutdown_signal_wait() {
        let handler = SignalHandler::new();
        let shutdown = handler.shutdown();

        let tx = handler.shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = tx.send(true);
        });

        let result = tokio::time::timeout(Duration::from_millis(100), shutdown.wait()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn shutdown_handle_wait() {
        let handler = SignalHandler::new();
        let handle = handler.shutdown_handle();
        assert!(!handle.is_shutdown());

        let wait_handle = handle.clone();
        let wait_task = tokio::spawn(async move {
            wait_handle.wait().wait().await;
            true
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.trigger();

        let result = tokio::time::timeout(Duration::from_millis(100), wait_task).await;
        assert!(result.unwrap().unwrap());
        assert!(handler.is_shutdown());
    }

    #[tokio::test]
    async fn refresh_requests_are_not_lost() {
        let handler = SignalHandler::new();
        handler.trigger_refresh();

        // Requests before subscribing are not replayed.
        let mut refresh = handler.refresh();
        let pending = tokio::time::timeout(Duration::from_millis(10), refresh.next()).await;
        assert!(pending.is_err());

        handler.trigger_refresh();
        handler.trigger_refresh();
        assert!(refresh.next().await);
        assert_eq!(handler.refresh_requests(), 3);

        let pending = tokio::time::timeout(Duration::from_millis(10), refresh.next()).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn refresh_signal_ends_with_handler() {
        let handler = SignalHandler::new();
        let mut refresh = handler.refresh();
        drop(handler);
        assert!(!refresh.next().await);
    }
}
