//! Periodic schedule refresh.
//!
//! The [`RefreshLoop`] runs one refresh immediately and then one per
//! interval. A [`RefreshHandle`] can trigger an immediate refresh, pause and
//! resume the periodic ones, or stop the loop. A failed refresh is simply
//! retried at the next tick.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use crate::error::{ServerError, ServerResult};
use crate::refresh::RefreshOutcome;

/// Default time between refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshLoopConfig {
    pub interval: Duration,
}

impl Default for RefreshLoopConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

impl RefreshLoopConfig {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

/// Commands accepted by a running loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshCommand {
    RefreshNow,
    /// Skip periodic refreshes until resumed. `RefreshNow` still works.
    Pause,
    Resume,
    Stop,
}

/// What the loop has done so far.
#[derive(Debug, Clone, Default)]
pub struct RefreshLoopState {
    pub paused: bool,
    pub consecutive_failures: u32,
    pub last_success: Option<DateTime<Utc>>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_outcome: Option<RefreshOutcome>,
}

impl RefreshLoopState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, outcome: RefreshOutcome) {
        self.consecutive_failures = 0;
        self.last_success = Some(Utc::now());
        self.last_attempt = self.last_success;
        self.last_error = None;
        self.last_outcome = Some(outcome);
    }

    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.consecutive_failures += 1;
        self.last_attempt = Some(Utc::now());
        self.last_error = Some(error.into());
    }

    /// Time since the last successful refresh.
    pub fn time_since_success(&self) -> Option<Duration> {
        self.last_success.map(|last| {
            let elapsed = Utc::now() - last;
            Duration::from_secs(elapsed.num_seconds().max(0) as u64)
        })
    }
}

pub type SharedRefreshLoopState = Arc<RwLock<RefreshLoopState>>;

pub struct RefreshLoop {
    config: RefreshLoopConfig,
    state: SharedRefreshLoopState,
    command_tx: mpsc::Sender<RefreshCommand>,
    command_rx: mpsc::Receiver<RefreshCommand>,
}

impl RefreshLoop {
    pub fn new(config: RefreshLoopConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        Self {
            config,
            state: Arc::new(RwLock::new(RefreshLoopState::new())),
            command_tx,
            command_rx,
        }
    }

    pub fn handle(&self) -> RefreshHandle {
        RefreshHandle {
            command_tx: self.command_tx.clone(),
            state: self.state.clone(),
        }
    }

    pub fn state(&self) -> SharedRefreshLoopState {
        self.state.clone()
    }

    /// Runs until [`RefreshCommand::Stop`] arrives or every handle is gone.
    pub async fn run<F, Fut>(self, refresh_fn: F)
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = ServerResult<RefreshOutcome>> + Send,
    {
        let Self {
            config,
            state,
            command_tx,
            mut command_rx,
        } = self;
        // Only handles keep the channel open from here on.
        drop(command_tx);

        info!(interval_secs = config.interval.as_secs(), "Refresh loop started");

        do_refresh(&state, &refresh_fn).await;

        loop {
            debug!(delay_secs = config.interval.as_secs(), "Scheduling next refresh");

            tokio::select! {
                _ = tokio::time::sleep(config.interval) => {
                    if state.read().await.paused {
                        debug!("Refresh loop paused, skipping refresh");
                        continue;
                    }
                    do_refresh(&state, &refresh_fn).await;
                }
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(RefreshCommand::RefreshNow) => {
                            debug!("Received RefreshNow command");
                            do_refresh(&state, &refresh_fn).await;
                        }
                        Some(RefreshCommand::Pause) => {
                            info!("Refresh loop paused");
                            state.write().await.paused = true;
                        }
                        Some(RefreshCommand::Resume) => {
                            info!("Refresh loop resumed");
                            state.write().await.paused = false;
                        }
                        Some(RefreshCommand::Stop) | None => {
                            info!("Refresh loop stopping");
                            break;
                        }
                    }
                }
            }
        }
    }
}

async fn do_refresh<F, Fut>(state: &SharedRefreshLoopState, refresh_fn: &F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = ServerResult<RefreshOutcome>>,
{
    match refresh_fn().await {
        Ok(RefreshOutcome::Skipped) => {
            debug!("Refresh skipped, another one is running");
        }
        Ok(outcome) => {
            debug!(?outcome, "Refresh completed");
            state.write().await.record_success(outcome);
        }
        Err(e) => {
            let mut state = state.write().await;
            state.record_failure(e.to_string());
            warn!(
                error = %e,
                failures = state.consecutive_failures,
                retryable = e.is_retryable(),
                "Refresh failed, retrying at next interval"
            );
        }
    }
}

/// Handle for a running [`RefreshLoop`].
#[derive(Clone, Debug)]
pub struct RefreshHandle {
    command_tx: mpsc::Sender<RefreshCommand>,
    state: SharedRefreshLoopState,
}

impl RefreshHandle {
    /// # Errors
    ///
    /// [`ServerError::Shutdown`] once the loop has stopped.
    pub async fn refresh_now(&self) -> ServerResult<()> {
        self.send(RefreshCommand::RefreshNow).await
    }

    pub async fn pause(&self) -> ServerResult<()> {
        self.send(RefreshCommand::Pause).await
    }

    pub async fn resume(&self) -> ServerResult<()> {
        self.send(RefreshCommand::Resume).await
    }

    pub async fn stop(&self) -> ServerResult<()> {
        self.send(RefreshCommand::Stop).await
    }

    async fn send(&self, command: RefreshCommand) -> ServerResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| ServerError::Shutdown)
    }

    pub async fn state(&self) -> RefreshLoopState {
        self.state.read().await.clone()
    }

    pub async fn is_paused(&self) -> bool {
        self.state.read().await.paused
    }
}
