//! File-backed schedule source.

use std::path::{Path, PathBuf};

use fahrplan_core::Schedule;
use tracing::trace;

use crate::error::{SourceError, SourceResult};
use crate::source::{BoxFuture, ScheduleSource, decode_bytes};

/// Reads the schedule document from a local file on every fetch.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScheduleSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> BoxFuture<'_, SourceResult<Schedule>> {
        Box::pin(async move {
            trace!(path = %self.path.display(), "Reading schedule file");
            let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
                SourceError::io(format!("failed to read {}", self.path.display()))
                    .with_source_name(self.name())
                    .with_source(e)
            })?;
            decode_bytes(self.name(), &bytes)
        })
    }
}
