//! Per-session announcement timers.
//!
//! An [`Announcer`] owns up to two one-shot timers per session: a reminder
//! shortly before the start and the start announcement itself. Each timer is
//! a task racing a sleep against the session's cancellation token. Session
//! tokens are children of the announcer's root token, so [`Announcer::stop`]
//! reaches every timer, including ones whose task has not been polled yet.
//!
//! Announcers are never reused across snapshots. The refresh logic stops the
//! old one and builds a fresh one for every new schedule.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Duration;
use fahrplan_core::{Clock, Message, Schedule, Session, SessionId};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::dispatch::Dispatcher;

/// Timing of announcements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnounceConfig {
    /// How long before the start the reminder goes out.
    pub reminder_window: Duration,
    /// Sessions starting within this window of "now" are scheduled when a
    /// new announcer is populated.
    pub horizon: Duration,
}

impl Default for AnnounceConfig {
    fn default() -> Self {
        Self {
            reminder_window: Duration::minutes(15),
            horizon: Duration::hours(1),
        }
    }
}

impl AnnounceConfig {
    pub fn with_reminder_window(mut self, window: Duration) -> Self {
        self.reminder_window = window;
        self
    }

    pub fn with_horizon(mut self, horizon: Duration) -> Self {
        self.horizon = horizon;
        self
    }
}

/// What [`Announcer::add`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Timers were started. `reminder` is false when the session starts
    /// within the reminder window.
    Scheduled { reminder: bool },
    /// The session id already has timers.
    AlreadyTracked,
    /// The session already started.
    Past,
    /// The announcer was stopped.
    Stopped,
}

/// Lifecycle of a tracked session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncementState {
    /// The start announcement is still pending.
    Scheduled,
    /// The start announcement went out.
    Fired,
    /// The timers were cancelled before the start.
    Cancelled,
}

struct Tracked {
    token: CancellationToken,
    reminder: Option<JoinHandle<()>>,
    start: JoinHandle<()>,
}

impl Tracked {
    fn state(&self) -> AnnouncementState {
        if self.token.is_cancelled() {
            AnnouncementState::Cancelled
        } else if self.start.is_finished() {
            AnnouncementState::Fired
        } else {
            AnnouncementState::Scheduled
        }
    }

    fn pending_timers(&self) -> usize {
        if self.token.is_cancelled() {
            return 0;
        }
        let reminder = self.reminder.as_ref().is_some_and(|h| !h.is_finished());
        usize::from(reminder) + usize::from(!self.start.is_finished())
    }
}

/// Schedules reminder and start announcements for one snapshot.
pub struct Announcer {
    config: AnnounceConfig,
    clock: Arc<dyn Clock>,
    dispatcher: Arc<Dispatcher>,
    root: CancellationToken,
    tracked: Mutex<HashMap<SessionId, Tracked>>,
}

impl Announcer {
    pub fn new(config: AnnounceConfig, clock: Arc<dyn Clock>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            config,
            clock,
            dispatcher,
            root: CancellationToken::new(),
            tracked: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &AnnounceConfig {
        &self.config
    }

    /// Starts timers for `session`.
    ///
    /// Idempotent per session id. Must be called from within a tokio
    /// runtime.
    pub fn add(&self, session: Arc<Session>) -> AddOutcome {
        if self.root.is_cancelled() {
            return AddOutcome::Stopped;
        }

        let mut tracked = self.lock();
        if tracked.contains_key(&session.id) {
            return AddOutcome::AlreadyTracked;
        }

        let now = self.clock.now();
        if session.scheduled_at < now {
            trace!(id = session.id, "Session already started, not scheduling");
            return AddOutcome::Past;
        }

        let start_delay = session.scheduled_at - now;
        let reminder_delay = (start_delay - self.config.reminder_window).max(Duration::zero());
        let token = self.root.child_token();

        let reminder = (reminder_delay > Duration::zero()).then(|| {
            let session = Arc::clone(&session);
            self.spawn_timer(token.clone(), reminder_delay, session, TimerKind::Reminder)
        });
        let has_reminder = reminder.is_some();
        let start = self.spawn_timer(token.clone(), start_delay, Arc::clone(&session), TimerKind::Start);

        debug!(
            id = session.id,
            reminder_in_secs = reminder_delay.num_seconds(),
            start_in_secs = start_delay.num_seconds(),
            reminder = has_reminder,
            "Scheduled announcements"
        );

        tracked.insert(
            session.id,
            Tracked {
                token,
                reminder,
                start,
            },
        );
        AddOutcome::Scheduled {
            reminder: has_reminder,
        }
    }

    /// Adds every session of `schedule` that starts before now + horizon.
    ///
    /// Returns how many sessions got timers.
    pub fn populate(&self, schedule: &Schedule) -> usize {
        let cutoff = self.clock.now() + self.config.horizon;
        let mut scheduled = 0;
        for session in schedule.index().values().filter(|s| s.scheduled_at < cutoff) {
            if let AddOutcome::Scheduled { .. } = self.add(Arc::clone(session)) {
                scheduled += 1;
            }
        }

        info!(
            scheduled,
            horizon_mins = self.config.horizon.num_minutes(),
            "Populated announcer"
        );
        scheduled
    }

    /// Cancels the timers of one session.
    ///
    /// Returns false if the session is unknown or its start already fired.
    pub fn cancel(&self, id: SessionId) -> bool {
        let tracked = self.lock();
        match tracked.get(&id) {
            Some(t) if t.state() == AnnouncementState::Scheduled => {
                t.token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Cancels every pending timer and forgets all sessions.
    ///
    /// Never waits for a callback that is already delivering. Safe to call
    /// repeatedly and after timers fired.
    pub fn stop(&self) {
        self.root.cancel();
        let drained: Vec<_> = self.lock().drain().collect();
        for (_, tracked) in &drained {
            tracked.token.cancel();
        }
        if !drained.is_empty() {
            info!(sessions = drained.len(), "Stopped scheduled announcements");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.root.is_cancelled()
    }

    pub fn state(&self, id: SessionId) -> Option<AnnouncementState> {
        self.lock().get(&id).map(Tracked::state)
    }

    /// Tracked session ids, ascending.
    pub fn tracked(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of timers that have neither fired nor been cancelled.
    pub fn pending_timers(&self) -> usize {
        self.lock().values().map(Tracked::pending_timers).sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, Tracked>> {
        self.tracked.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn spawn_timer(
        &self,
        token: CancellationToken,
        delay: Duration,
        session: Arc<Session>,
        kind: TimerKind,
    ) -> JoinHandle<()> {
        let clock = Arc::clone(&self.clock);
        let dispatcher = Arc::clone(&self.dispatcher);
        let delay = delay.to_std().unwrap_or_default();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    trace!(id = session.id, kind = kind.as_str(), "Timer cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    let message = match kind {
                        TimerKind::Reminder => Message::reminder(&session, clock.now()),
                        TimerKind::Start => Message::start(&session),
                    };
                    dispatcher.deliver(session.id, &message).await;
                }
            }
        })
    }
}

impl Drop for Announcer {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

#[derive(Debug, Clone, Copy)]
enum TimerKind {
    Reminder,
    Start,
}

impl TimerKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Reminder => "reminder",
            Self::Start => "start",
        }
    }
}
