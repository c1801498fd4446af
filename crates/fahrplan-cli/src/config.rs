//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/fahrplan/config.toml` by default. Every section and key is
//! optional:
//!
//! ```toml
//! [source]
//! url_template = "https://fahrplan.events.ccc.de/congress/{year}/Fahrplan/schedule.json"
//! # file = "/var/lib/fahrplan/schedule.json"
//!
//! [announce]
//! broadcast = "#33c3-schedule"
//! reminder_minutes = 15
//!
//! [clock]
//! utc_offset = "+01:00"
//! fake_date = "2016-12-27"
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use fahrplan_core::time::{parse_date, parse_offset};
use fahrplan_core::{Clock, SystemClock, TracingOutputFormat};
use fahrplan_providers::{FileSource, HttpSource, HttpSourceConfig, ScheduleSource};
use fahrplan_server::{
    AnnounceConfig, DEFAULT_BROADCAST, DEFAULT_SESSION_URL, DesktopSink, DesktopSinkConfig,
    LogSink, NotificationSink, RefreshLoopConfig, ServerConfig,
};
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub source: SourceSettings,
    pub announce: AnnounceSettings,
    pub clock: ClockSettings,
    pub notifications: NotificationSettings,
    pub logging: LoggingSettings,
}

/// Where the schedule document comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Document URL; `{year}` is replaced with the current year.
    pub url_template: String,
    /// Read the document from this file instead of downloading it.
    pub file: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            url_template: HttpSourceConfig::DEFAULT_URL_TEMPLATE.to_string(),
            file: None,
            timeout_secs: HttpSourceConfig::DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnounceSettings {
    pub broadcast: String,
    /// Session page template for change notices, `{year}` and `{id}`.
    pub session_url: String,
    pub reminder_minutes: i64,
    pub horizon_minutes: i64,
    pub refresh_interval_secs: u64,
}

impl Default for AnnounceSettings {
    fn default() -> Self {
        Self {
            broadcast: DEFAULT_BROADCAST.to_string(),
            session_url: DEFAULT_SESSION_URL.to_string(),
            reminder_minutes: 15,
            horizon_minutes: 60,
            refresh_interval_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockSettings {
    /// Fixed offset all times are rendered in, `+HH:MM` or `-HH:MM`.
    ///
    /// Daylight saving time is not followed. The default `+01:00` fits a
    /// winter congress; a summer event in Central Europe needs `+02:00`.
    pub utc_offset: String,
    /// Pretend today is this date (`YYYY-MM-DD`), keeping the time of day.
    pub fake_date: Option<String>,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            utc_offset: "+01:00".to_string(),
            fake_date: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Show announcements as desktop notifications instead of logging them.
    pub desktop: bool,
    /// Desktop only: skip the per-subscriber copies.
    pub broadcast_only: bool,
    pub timeout_secs: u64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            desktop: false,
            broadcast_only: true,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `pretty`, `compact` or `json`.
    pub format: Option<String>,
    /// Level for fahrplan targets, e.g. `debug`.
    pub level: Option<String>,
}

impl CliConfig {
    /// Loads the default file, or defaults if it does not exist.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            ClientError::config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fahrplan")
    }

    /// Checks every setting that can be invalid.
    pub fn validate(&self) -> ClientResult<()> {
        self.clock()?;
        self.server_config()?;
        self.log_format()?;
        self.log_level()?;
        if self.source.file.is_none() {
            HttpSourceConfig::new(&self.source.url_template)
                .url_for_year(2016)
                .map_err(|e| ClientError::config(e.to_string()))?;
        }
        Ok(())
    }

    pub fn clock(&self) -> ClientResult<SystemClock> {
        let offset = parse_offset(&self.clock.utc_offset)
            .map_err(|e| ClientError::config(format!("[clock] {e}")))?;
        let fake_date = self
            .clock
            .fake_date
            .as_deref()
            .map(parse_date)
            .transpose()
            .map_err(|e| ClientError::config(format!("[clock] {e}")))?;
        Ok(SystemClock::new(offset).with_fake_date(fake_date))
    }

    pub fn server_config(&self) -> ClientResult<ServerConfig> {
        let announce = AnnounceConfig::default()
            .with_reminder_window(chrono::Duration::minutes(self.announce.reminder_minutes))
            .with_horizon(chrono::Duration::minutes(self.announce.horizon_minutes));
        let config = ServerConfig::new(&self.announce.broadcast)
            .with_session_url_template(&self.announce.session_url)
            .with_announce(announce)
            .with_refresh(RefreshLoopConfig::new(Duration::from_secs(
                self.announce.refresh_interval_secs,
            )));
        config.validate()?;
        Ok(config)
    }

    /// The file source if one is configured, otherwise the HTTP source.
    pub fn source(&self, clock: Arc<dyn Clock>) -> ClientResult<Arc<dyn ScheduleSource>> {
        if let Some(ref path) = self.source.file {
            return Ok(Arc::new(FileSource::new(path)));
        }
        let config = HttpSourceConfig::new(&self.source.url_template)
            .with_timeout(Duration::from_secs(self.source.timeout_secs));
        Ok(Arc::new(HttpSource::new(config, clock)?))
    }

    pub fn sink(&self) -> Arc<dyn NotificationSink> {
        if self.notifications.desktop {
            let config = DesktopSinkConfig::default()
                .with_timeout(Duration::from_secs(self.notifications.timeout_secs))
                .with_broadcast_only(self.notifications.broadcast_only);
            Arc::new(DesktopSink::new(config))
        } else {
            Arc::new(LogSink)
        }
    }

    pub fn log_format(&self) -> ClientResult<Option<TracingOutputFormat>> {
        self.logging
            .format
            .as_deref()
            .map(|value| {
                TracingOutputFormat::parse(value).ok_or_else(|| {
                    ClientError::config(format!("[logging] unknown format {value:?}"))
                })
            })
            .transpose()
    }

    pub fn log_level(&self) -> ClientResult<Option<Level>> {
        self.logging
            .level
            .as_deref()
            .map(|value| {
                Level::from_str(value).map_err(|_| {
                    ClientError::config(format!("[logging] unknown level {value:?}"))
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults() {
        let config = CliConfig::default();
        assert!(config.validate().is_ok());

        let server = config.server_config().unwrap();
        assert_eq!(server.broadcast, "#33c3-schedule");
        assert_eq!(server.announce.reminder_window, chrono::Duration::minutes(15));
        assert_eq!(server.announce.horizon, chrono::Duration::hours(1));
        assert_eq!(server.refresh.interval, Duration::from_secs(600));
        assert_eq!(config.clock().unwrap().offset().local_minus_utc(), 3600);
    }

    #[test]
    fn summer_offset_is_taken_verbatim() {
        let file = write_config("[clock]\nutc_offset = \"+02:00\"\n");
        let config = CliConfig::load_from(file.path()).unwrap();
        assert!(config.validate().is_ok());

        let clock = config.clock().unwrap();
        assert_eq!(clock.offset().local_minus_utc(), 7200);
        assert_eq!(clock.now().offset().local_minus_utc(), 7200);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let file = write_config(
            r##"
            [announce]
            broadcast = "#36c3"
            reminder_minutes = 5

            [clock]
            fake_date = "2019-12-27"
            "##,
        );
        let config = CliConfig::load_from(file.path()).unwrap();

        let server = config.server_config().unwrap();
        assert_eq!(server.broadcast, "#36c3");
        assert_eq!(server.announce.reminder_window, chrono::Duration::minutes(5));
        assert_eq!(server.announce.horizon, chrono::Duration::hours(1));

        let clock = config.clock().unwrap();
        assert_eq!(clock.today().to_string(), "2019-12-27");
        assert_eq!(config.source.url_template, HttpSourceConfig::DEFAULT_URL_TEMPLATE);
    }

    #[test]
    fn unparsable_file_is_config_error() {
        let file = write_config("[announce\nbroadcast = ");
        let err = CliConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = CliConfig::load_from(Path::new("/nonexistent/fahrplan.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = CliConfig::default();
        config.clock.utc_offset = "CET".into();
        assert!(config.clock().is_err());

        let mut config = CliConfig::default();
        config.clock.fake_date = Some("27.12.2016".into());
        assert!(config.validate().is_err());

        let mut config = CliConfig::default();
        config.announce.horizon_minutes = 0;
        assert!(config.server_config().is_err());

        let mut config = CliConfig::default();
        config.logging.format = Some("xml".into());
        assert!(config.validate().is_err());

        let mut config = CliConfig::default();
        config.source.url_template = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn logging_settings() {
        let mut config = CliConfig::default();
        assert_eq!(config.log_format().unwrap(), None);

        config.logging.format = Some("json".into());
        config.logging.level = Some("debug".into());
        assert_eq!(config.log_format().unwrap(), Some(TracingOutputFormat::Json));
        assert_eq!(config.log_level().unwrap(), Some(Level::DEBUG));
    }

    #[test]
    fn file_source_wins_over_url() {
        let mut config = CliConfig::default();
        config.source.file = Some(PathBuf::from("/tmp/schedule.json"));
        let clock: Arc<dyn Clock> = Arc::new(config.clock().unwrap());

        let source = config.source(clock).unwrap();
        assert_eq!(source.name(), "file");
        assert_eq!(source.location(), "/tmp/schedule.json");
    }

    #[test]
    fn serializes_back_to_toml() {
        let text = toml::to_string_pretty(&CliConfig::default()).unwrap();
        assert!(text.contains("[announce]"));
        assert!(text.contains("broadcast = \"#33c3-schedule\""));
    }
}
