//! Server configuration.

use crate::announce::AnnounceConfig;
use crate::error::{ServerError, ServerResult};
use crate::scheduler::RefreshLoopConfig;

/// Default broadcast destination.
pub const DEFAULT_BROADCAST: &str = "#33c3-schedule";

/// Default session page template, `{year}` and `{id}` are substituted.
pub const DEFAULT_SESSION_URL: &str =
    "https://fahrplan.events.ccc.de/congress/{year}/Fahrplan/events/{id}.html";

/// Everything the announcer daemon needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Destination that receives every announcement.
    pub broadcast: String,
    /// Template for links in change notices.
    pub session_url_template: String,
    pub announce: AnnounceConfig,
    pub refresh: RefreshLoopConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            broadcast: DEFAULT_BROADCAST.to_string(),
            session_url_template: DEFAULT_SESSION_URL.to_string(),
            announce: AnnounceConfig::default(),
            refresh: RefreshLoopConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(broadcast: impl Into<String>) -> Self {
        Self {
            broadcast: broadcast.into(),
            ..Default::default()
        }
    }

    pub fn with_session_url_template(mut self, template: impl Into<String>) -> Self {
        self.session_url_template = template.into();
        self
    }

    pub fn with_announce(mut self, announce: AnnounceConfig) -> Self {
        self.announce = announce;
        self
    }

    pub fn with_refresh(mut self, refresh: RefreshLoopConfig) -> Self {
        self.refresh = refresh;
        self
    }

    /// Rejects settings the server cannot run with.
    pub fn validate(&self) -> ServerResult<()> {
        if self.broadcast.trim().is_empty() {
            return Err(ServerError::config("broadcast destination is empty"));
        }
        if self.announce.reminder_window < chrono::Duration::zero() {
            return Err(ServerError::config("reminder window must not be negative"));
        }
        if self.announce.horizon <= chrono::Duration::zero() {
            return Err(ServerError::config("look-ahead horizon must be positive"));
        }
        if self.refresh.interval.is_zero() {
            return Err(ServerError::config("refresh interval must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.broadcast, "#33c3-schedule");
        assert!(config.session_url_template.contains("{id}"));
        assert_eq!(config.announce.reminder_window, chrono::Duration::minutes(15));
        assert_eq!(config.announce.horizon, chrono::Duration::hours(1));
        assert_eq!(config.refresh.interval, Duration::from_secs(600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn custom_config() {
        let config = ServerConfig::new("#36c3")
            .with_session_url_template("https://example.org/{id}")
            .with_announce(AnnounceConfig::default().with_reminder_window(chrono::Duration::minutes(5)))
            .with_refresh(RefreshLoopConfig::new(Duration::from_secs(60)));

        assert_eq!(config.broadcast, "#36c3");
        assert_eq!(config.announce.reminder_window, chrono::Duration::minutes(5));
        assert_eq!(config.refresh.interval, Duration::from_secs(60));
    }

    #[test]
    fn validation() {
        assert!(ServerConfig::new("  ").validate().is_err());
        assert!(
            ServerConfig::default()
                .with_announce(AnnounceConfig::default().with_horizon(chrono::Duration::zero()))
                .validate()
                .is_err()
        );
        assert!(
            ServerConfig::default()
                .with_refresh(RefreshLoopConfig::new(Duration::ZERO))
                .validate()
                .is_err()
        );
    }
}
