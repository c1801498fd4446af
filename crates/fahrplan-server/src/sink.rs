//! Notification sinks.
//!
//! A sink delivers one rendered [`Message`] to one [`Destination`]. The
//! dispatcher fans a message out to many destinations; a sink only ever
//! sees one at a time and reports failure for that one alone.

use std::fmt;
use std::time::Duration;

use fahrplan_core::{Message, Urgency};
use fahrplan_providers::BoxFuture;
use notify_rust::Notification;
use thiserror::Error;
use tracing::{debug, info};

/// Where a message goes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Destination {
    /// The shared announcement channel.
    Broadcast(String),
    /// One live target of a subscribed account.
    Target(String),
}

impl Destination {
    pub fn name(&self) -> &str {
        match self {
            Self::Broadcast(name) | Self::Target(name) => name,
        }
    }

    pub fn is_broadcast(&self) -> bool {
        matches!(self, Self::Broadcast(_))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Broadcast(name) => write!(f, "broadcast:{name}"),
            Self::Target(name) => write!(f, "target:{name}"),
        }
    }
}

/// Delivery to one destination failed.
#[derive(Debug, Error)]
#[error("delivery to {destination} failed: {message}")]
pub struct SinkError {
    pub destination: Destination,
    pub message: String,
}

impl SinkError {
    pub fn new(destination: Destination, message: impl Into<String>) -> Self {
        Self {
            destination,
            message: message.into(),
        }
    }
}

/// Delivers rendered messages.
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;

    /// Delivers `message` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if this one delivery failed. Callers log it and
    /// carry on with other destinations.
    fn deliver<'a>(
        &'a self,
        destination: &'a Destination,
        message: &'a Message,
    ) -> BoxFuture<'a, Result<(), SinkError>>;
}

/// Writes every message to the log.
#[derive(Debug, Default, Clone)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn deliver<'a>(
        &'a self,
        destination: &'a Destination,
        message: &'a Message,
    ) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(async move {
            info!(
                destination = %destination,
                kind = message.kind.as_str(),
                urgency = message.urgency.as_str(),
                "{}",
                message.text
            );
            Ok(())
        })
    }
}

/// Configuration for [`DesktopSink`].
#[derive(Debug, Clone)]
pub struct DesktopSinkConfig {
    pub app_name: String,
    pub timeout: Duration,
    pub icon_path: Option<String>,
    /// Only show broadcast messages, skipping per-target copies.
    pub broadcast_only: bool,
}

impl Default for DesktopSinkConfig {
    fn default() -> Self {
        Self {
            app_name: "fahrplan".to_string(),
            timeout: Duration::from_secs(10),
            icon_path: None,
            broadcast_only: true,
        }
    }
}

impl DesktopSinkConfig {
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_icon_path(mut self, path: impl Into<String>) -> Self {
        self.icon_path = Some(path.into());
        self
    }

    pub fn with_broadcast_only(mut self, broadcast_only: bool) -> Self {
        self.broadcast_only = broadcast_only;
        self
    }
}

/// Shows messages as desktop notifications.
#[derive(Debug, Clone, Default)]
pub struct DesktopSink {
    config: DesktopSinkConfig,
}

impl DesktopSink {
    pub fn new(config: DesktopSinkConfig) -> Self {
        Self { config }
    }

    fn build(&self, message: &Message) -> Notification {
        let mut notification = Notification::new();
        notification
            .appname(&self.config.app_name)
            .summary(summary_for(message))
            .body(&message.text)
            .timeout(self.config.timeout);

        if let Some(ref icon) = self.config.icon_path {
            notification.icon(icon);
        }

        #[cfg(target_os = "linux")]
        notification.urgency(match message.urgency {
            Urgency::Low => notify_rust::Urgency::Low,
            Urgency::Normal => notify_rust::Urgency::Normal,
            Urgency::Critical => notify_rust::Urgency::Critical,
        });

        notification
    }
}

fn summary_for(message: &Message) -> &'static str {
    use fahrplan_core::MessageKind;
    match message.kind {
        MessageKind::Reminder => "Session starting soon",
        MessageKind::Start => "Session starting now",
        MessageKind::Changed => "Session changed",
        MessageKind::Removed => "Session removed",
        MessageKind::Added => "Session added",
    }
}

impl NotificationSink for DesktopSink {
    fn name(&self) -> &str {
        "desktop"
    }

    fn deliver<'a>(
        &'a self,
        destination: &'a Destination,
        message: &'a Message,
    ) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(async move {
            if self.config.broadcast_only && !destination.is_broadcast() {
                debug!(destination = %destination, "Desktop sink skips non-broadcast message");
                return Ok(());
            }

            let notification = self.build(message);
            // Showing a notification talks to the session bus synchronously.
            let shown = tokio::task::spawn_blocking(move || {
                notification.show().map(|_| ()).map_err(|e| e.to_string())
            })
            .await
            .map_err(|e| SinkError::new(destination.clone(), e.to_string()))?;

            shown.map_err(|e| SinkError::new(destination.clone(), e))?;
            debug!(destination = %destination, kind = message.kind.as_str(), "Notification shown");
            Ok(())
        })
    }
}

/// Sinks that record or fail deliveries, shared by the server tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Default)]
    pub struct RecordingSink {
        delivered: Mutex<Vec<(Destination, Message)>>,
        failing: HashSet<String>,
    }

    impl RecordingSink {
        /// Fails every delivery to a destination with one of these names.
        pub fn failing(names: &[&str]) -> Self {
            Self {
                delivered: Mutex::default(),
                failing: names.iter().map(|n| n.to_string()).collect(),
            }
        }

        pub fn delivered(&self) -> Vec<(Destination, Message)> {
            self.delivered.lock().unwrap().clone()
        }

        pub fn texts_for(&self, destination: &Destination) -> Vec<String> {
            self.delivered()
                .into_iter()
                .filter(|(d, _)| d == destination)
                .map(|(_, m)| m.text)
                .collect()
        }
    }

    impl NotificationSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        fn deliver<'a>(
            &'a self,
            destination: &'a Destination,
            message: &'a Message,
        ) -> BoxFuture<'a, Result<(), SinkError>> {
            Box::pin(async move {
                if self.failing.contains(destination.name()) {
                    return Err(SinkError::new(destination.clone(), "target gone"));
                }
                self.delivered
                    .lock()
                    .unwrap()
                    .push((destination.clone(), message.clone()));
                Ok(())
            })
        }
    }
}
