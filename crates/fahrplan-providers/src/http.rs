//! HTTP schedule source.
//!
//! The document URL is a template; `{year}` is replaced with the current
//! year from the clock on every fetch, so one configuration follows the
//! conference from year to year.

use std::sync::Arc;
use std::time::Duration;

use chrono::Datelike;
use fahrplan_core::{Clock, Schedule};
use reqwest::{Client, StatusCode};
use tracing::{trace, warn};
use url::Url;

use crate::error::{SourceError, SourceResult};
use crate::source::{BoxFuture, ScheduleSource, decode_bytes};

const SOURCE_NAME: &str = "http";

/// Configuration for [`HttpSource`].
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    /// Document URL, may contain `{year}`.
    pub url_template: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl HttpSourceConfig {
    pub const DEFAULT_URL_TEMPLATE: &'static str =
        "https://fahrplan.events.ccc.de/congress/{year}/Fahrplan/schedule.json";

    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("fahrplan/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Expands the template for `year` and validates the result.
    pub fn url_for_year(&self, year: i32) -> SourceResult<Url> {
        let expanded = self.url_template.replace("{year}", &year.to_string());
        Url::parse(&expanded).map_err(|e| {
            SourceError::configuration(format!("invalid schedule URL {expanded:?}"))
                .with_source_name(SOURCE_NAME)
                .with_source(e)
        })
    }
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_URL_TEMPLATE)
    }
}

/// Downloads the schedule document over HTTP(S).
pub struct HttpSource {
    client: Client,
    config: HttpSourceConfig,
    clock: Arc<dyn Clock>,
}

impl HttpSource {
    /// Builds the HTTP client. The template is validated once against the
    /// current year.
    pub fn new(config: HttpSourceConfig, clock: Arc<dyn Clock>) -> SourceResult<Self> {
        config.url_for_year(clock.today().year())?;

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                SourceError::network(format!("failed to create HTTP client: {e}"))
                    .with_source_name(SOURCE_NAME)
            })?;

        Ok(Self {
            client,
            config,
            clock,
        })
    }

    pub fn config(&self) -> &HttpSourceConfig {
        &self.config
    }

    /// The URL the next fetch will use.
    pub fn current_url(&self) -> SourceResult<Url> {
        self.config.url_for_year(self.clock.today().year())
    }

    async fn download(&self, url: Url) -> SourceResult<Vec<u8>> {
        trace!(url = %url, "Downloading schedule");

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            SourceError::network(format!("request to {url} failed: {e}"))
                .with_source_name(SOURCE_NAME)
        })?;

        let status = response.status();
        trace!(status = %status, "Received response");

        match status {
            StatusCode::OK => response
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| {
                    SourceError::network(format!("failed to read response: {e}"))
                        .with_source_name(SOURCE_NAME)
                }),
            s if s.is_success() => {
                warn!(status = %s, "Unexpected success status without a document");
                Err(SourceError::invalid_response(format!("unexpected status {s}"))
                    .with_source_name(SOURCE_NAME))
            }
            s => Err(SourceError::http_status(format!("{s} from {url}"))
                .with_source_name(SOURCE_NAME)),
        }
    }
}

impl ScheduleSource for HttpSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn location(&self) -> String {
        match self.current_url() {
            Ok(url) => url.to_string(),
            Err(_) => self.config.url_template.clone(),
        }
    }

    fn fetch(&self) -> BoxFuture<'_, SourceResult<Schedule>> {
        Box::pin(async move {
            let url = self.current_url()?;
            let bytes = self.download(url).await?;
            decode_bytes(SOURCE_NAME, &bytes)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceErrorCode;
    use crate::source::content_hash;
    use fahrplan_core::FixedClock;
    use fahrplan_core::time::parse_datetime;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const DOC: &str = r#"{"schedule": {"version": "1.0", "conference": {
        "acronym": "33c3", "title": "33C3", "start": "2016-12-27", "end": "2016-12-30",
        "daysCount": 4, "timeslot_duration": "00:15", "days": []}}}"#;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock::new(
            parse_datetime("2016-12-27T10:00:00+01:00").unwrap(),
        ))
    }

    /// Serves one canned HTTP response and returns the base URL.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn expands_year() {
        let config = HttpSourceConfig::default();
        assert_eq!(
            config.url_for_year(2016).unwrap().as_str(),
            "https://fahrplan.events.ccc.de/congress/2016/Fahrplan/schedule.json"
        );
    }

    #[test]
    fn rejects_invalid_template() {
        let err = HttpSource::new(HttpSourceConfig::new("not a url/{year}"), clock())
            .err()
            .unwrap();
        assert_eq!(err.code(), SourceErrorCode::ConfigurationError);
    }

    #[test]
    fn location_uses_clock_year() {
        let source = HttpSource::new(HttpSourceConfig::default(), clock()).unwrap();
        assert!(source.location().contains("/2016/"));
        assert_eq!(source.name(), "http");
    }

    #[tokio::test]
    async fn fetches_and_decodes() {
        let base = serve_once("200 OK", DOC).await;
        let config = HttpSourceConfig::new(format!("{base}/{{year}}/schedule.json"));
        let source = HttpSource::new(config, clock()).unwrap();

        let schedule = source.fetch().await.unwrap();
        assert_eq!(schedule.version(), "1.0");
        assert_eq!(schedule.content_hash(), content_hash(DOC.as_bytes()));
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let base = serve_once("502 Bad Gateway", "upstream down").await;
        let source = HttpSource::new(HttpSourceConfig::new(base), clock()).unwrap();

        let err = source.fetch().await.unwrap_err();
        assert_eq!(err.code(), SourceErrorCode::HttpStatus);
        assert!(err.message().contains("502"));
    }

    #[tokio::test]
    async fn html_error_page_is_decode_error() {
        let base = serve_once("200 OK", "<html>maintenance</html>").await;
        let source = HttpSource::new(HttpSourceConfig::new(base), clock()).unwrap();

        let err = source.fetch().await.unwrap_err();
        assert_eq!(err.code(), SourceErrorCode::DecodeError);
    }
}
