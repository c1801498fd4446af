//! Refresh coordination.
//!
//! The [`RefreshCoordinator`] owns the current schedule together with the
//! announcer built from it. Both are replaced as one unit: readers calling
//! [`RefreshCoordinator::current`] always get a pair whose announcer was
//! populated from that very schedule.

use std::sync::Arc;

use fahrplan_core::{Clock, Message, Schedule, ScheduleDiff, diff_if_changed};
use fahrplan_providers::ScheduleSource;
use futures_util::future::join_all;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::announce::{AnnounceConfig, Announcer};
use crate::dispatch::Dispatcher;
use crate::error::ServerResult;

/// A schedule and the announcer scheduled from it.
pub struct Current {
    pub schedule: Arc<Schedule>,
    pub announcer: Announcer,
}

/// What a refresh did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// First schedule loaded.
    Initial { sessions: usize, scheduled: usize },
    /// Version and content hash matched; no diff was computed.
    Unchanged { scheduled: usize },
    /// The change signal moved and a diff was computed and announced.
    Updated {
        changed: usize,
        added: usize,
        missing: usize,
        scheduled: usize,
    },
    /// Another refresh was already running.
    Skipped,
}

impl RefreshOutcome {
    /// Sessions that got timers, if the refresh ran.
    pub fn scheduled(&self) -> Option<usize> {
        match *self {
            Self::Initial { scheduled, .. }
            | Self::Unchanged { scheduled }
            | Self::Updated { scheduled, .. } => Some(scheduled),
            Self::Skipped => None,
        }
    }
}

pub struct RefreshCoordinator {
    source: Arc<dyn ScheduleSource>,
    dispatcher: Arc<Dispatcher>,
    clock: Arc<dyn Clock>,
    announce: AnnounceConfig,
    session_url_template: String,
    current: RwLock<Option<Arc<Current>>>,
    in_progress: Mutex<()>,
}

impl RefreshCoordinator {
    pub fn new(
        source: Arc<dyn ScheduleSource>,
        dispatcher: Arc<Dispatcher>,
        clock: Arc<dyn Clock>,
        announce: AnnounceConfig,
        session_url_template: impl Into<String>,
    ) -> Self {
        Self {
            source,
            dispatcher,
            clock,
            announce,
            session_url_template: session_url_template.into(),
            current: RwLock::new(None),
            in_progress: Mutex::new(()),
        }
    }

    /// The current pair, if a refresh ever succeeded.
    pub async fn current(&self) -> Option<Arc<Current>> {
        self.current.read().await.clone()
    }

    /// The current schedule, if any.
    pub async fn schedule(&self) -> Option<Arc<Schedule>> {
        self.current().await.map(|c| Arc::clone(&c.schedule))
    }

    /// Fetches the schedule and, on success, swaps in a new pair.
    ///
    /// # Errors
    ///
    /// Returns the fetch error. The current pair is left untouched.
    pub async fn refresh(&self) -> ServerResult<RefreshOutcome> {
        let Ok(_guard) = self.in_progress.try_lock() else {
            debug!("Refresh already in progress, skipping");
            return Ok(RefreshOutcome::Skipped);
        };

        info!(source = self.source.name(), location = %self.source.location(), "Downloading schedule");
        let schedule = match self.source.fetch().await {
            Ok(schedule) => Arc::new(schedule),
            Err(e) => {
                warn!(error = %e, "Schedule refresh failed, keeping current schedule");
                return Err(e.into());
            }
        };

        // `in_progress` keeps the pair stable until the swap below.
        let previous = self.schedule().await;
        let diff = previous
            .as_deref()
            .and_then(|old| diff_if_changed(old, &schedule));
        let counts = diff
            .as_ref()
            .map(|d| (d.changed.len(), d.added.len(), d.missing.len()));

        // Notices go out before the old announcer is stopped and the lock
        // is not held while delivering.
        if let Some(diff) = diff {
            self.announce_changes(diff).await;
        }

        let mut slot = self.current.write().await;
        if let Some(old) = slot.as_ref() {
            old.announcer.stop();
        }
        let announcer = Announcer::new(
            self.announce,
            Arc::clone(&self.clock),
            Arc::clone(&self.dispatcher),
        );
        let scheduled = announcer.populate(&schedule);
        *slot = Some(Arc::new(Current {
            schedule: Arc::clone(&schedule),
            announcer,
        }));
        drop(slot);

        let outcome = match (previous, counts) {
            (None, _) => RefreshOutcome::Initial {
                sessions: schedule.len(),
                scheduled,
            },
            (Some(_), None) => RefreshOutcome::Unchanged { scheduled },
            (Some(_), Some((changed, added, missing))) => RefreshOutcome::Updated {
                changed,
                added,
                missing,
                scheduled,
            },
        };

        info!(version = schedule.version(), ?outcome, "Schedule refreshed");
        Ok(outcome)
    }

    async fn announce_changes(&self, diff: ScheduleDiff) {
        let messages = diff
            .changed
            .iter()
            .map(|s| (s.id, Message::changed(s, &self.session_url_template)))
            .chain(diff.missing.iter().map(|s| (s.id, Message::removed(s))))
            .chain(diff.added.iter().map(|s| (s.id, Message::added(s))))
            .collect::<Vec<_>>();

        let reports = join_all(
            messages
                .iter()
                .map(|(id, message)| self.dispatcher.deliver(*id, message)),
        )
        .await;

        let failed: usize = reports.iter().map(|r| r.failed).sum();
        debug!(notices = messages.len(), failed, "Schedule changes announced");
    }

    /// Stops the current announcer. Used on shutdown.
    pub async fn shutdown(&self) {
        if let Some(current) = self.current.read().await.as_ref() {
            current.announcer.stop();
        }
    }
}
