//! Schedule sources.
//!
//! - [`ScheduleSource`] - the trait the refresh logic fetches through
//! - [`HttpSource`] - downloads the document from a `{year}` URL template
//! - [`FileSource`] - reads the document from disk
//! - [`SourceError`] - one error type for transport and decode failures
//!
//! ```ignore
//! use fahrplan_providers::{FileSource, ScheduleSource};
//!
//! let schedule = FileSource::new("schedule.json").fetch().await?;
//! println!("{} sessions", schedule.len());
//! ```

pub mod error;
pub mod file;
pub mod http;
pub mod source;

pub use error::{SourceError, SourceErrorCode, SourceResult};
pub use file::FileSource;
pub use http::{HttpSource, HttpSourceConfig};
pub use source::{BoxFuture, ScheduleSource, content_hash, decode_bytes};
