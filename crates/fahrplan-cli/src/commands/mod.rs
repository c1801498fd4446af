//! Subcommand implementations.

pub mod config;
pub mod diff;
pub mod query;
pub mod run;

use std::sync::Arc;

use fahrplan_core::{Clock, Schedule};
use tracing::debug;

use crate::config::CliConfig;
use crate::error::ClientResult;

/// Fetches the schedule once from the configured source.
pub(crate) async fn fetch_schedule(
    config: &CliConfig,
    clock: Arc<dyn Clock>,
) -> ClientResult<Schedule> {
    let source = config.source(clock)?;
    debug!(source = source.name(), location = %source.location(), "Fetching schedule");
    Ok(source.fetch().await?)
}
