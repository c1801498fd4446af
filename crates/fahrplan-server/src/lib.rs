//! Announcer daemon: timers, delivery fan-out, refresh coordination.
//!
//! - [`Announcer`] schedules reminder and start announcements per session
//! - [`Dispatcher`] fans each message out to the broadcast destination and
//!   to the live targets of subscribed accounts
//! - [`RefreshCoordinator`] swaps the `(schedule, announcer)` pair on refresh
//!   and announces changes
//! - [`RefreshLoop`] drives refreshes periodically and on command
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use fahrplan_core::SystemClock;
//! use fahrplan_providers::FileSource;
//! use fahrplan_server::{
//!     AnnounceConfig, Dispatcher, LogSink, MemorySubscriptions, RefreshCoordinator,
//!     StaticPresence,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Arc::new(Dispatcher::new(
//!         Arc::new(LogSink),
//!         Arc::new(MemorySubscriptions::new()),
//!         Arc::new(StaticPresence::new()),
//!         "#33c3-schedule",
//!     ));
//!     let coordinator = RefreshCoordinator::new(
//!         Arc::new(FileSource::new("schedule.json")),
//!         dispatcher,
//!         Arc::new(SystemClock::default()),
//!         AnnounceConfig::default(),
//!         fahrplan_server::DEFAULT_SESSION_URL,
//!     );
//!     coordinator.refresh().await?;
//!     Ok(())
//! }
//! ```

mod announce;
mod config;
mod dispatch;
mod error;
mod refresh;
mod scheduler;
mod signals;
mod sink;
mod subscriptions;

pub use announce::{AddOutcome, AnnounceConfig, AnnouncementState, Announcer};
pub use config::{DEFAULT_BROADCAST, DEFAULT_SESSION_URL, ServerConfig};
pub use dispatch::{DeliveryReport, Dispatcher};
pub use error::{ServerError, ServerResult};
pub use refresh::{Current, RefreshCoordinator, RefreshOutcome};
pub use scheduler::{
    DEFAULT_REFRESH_INTERVAL, RefreshCommand, RefreshHandle, RefreshLoop, RefreshLoopConfig,
    RefreshLoopState, SharedRefreshLoopState,
};
pub use signals::{RefreshSignal, ShutdownHandle, ShutdownSignal, SignalHandler};
pub use sink::{
    Destination, DesktopSink, DesktopSinkConfig, LogSink, NotificationSink, SinkError,
};
pub use subscriptions::{
    MemorySubscriptions, Presence, StaticPresence, SubscriptionError, SubscriptionStore,
};
