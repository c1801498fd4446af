//! The [`ScheduleSource`] trait.
//!
//! A source turns "go get the schedule" into a decoded [`Schedule`]. The
//! content hash of the raw bytes is computed here, before decoding, so two
//! byte-identical documents always carry the same hash.

use std::future::Future;
use std::pin::Pin;

use fahrplan_core::{Schedule, decode_document};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{SourceError, SourceResult};

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Somewhere a schedule document can be fetched from.
///
/// A fetch either yields a complete snapshot or an error; there is no
/// partial result.
pub trait ScheduleSource: Send + Sync {
    /// Short name used in logs and errors ("http", "file").
    fn name(&self) -> &str;

    /// Where the next fetch will read from, for display.
    fn location(&self) -> String;

    /// Fetches and decodes the current document.
    fn fetch(&self) -> BoxFuture<'_, SourceResult<Schedule>>;
}

/// Returns the lowercase hex SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Hashes and decodes raw document bytes.
pub fn decode_bytes(source_name: &str, bytes: &[u8]) -> SourceResult<Schedule> {
    let hash = content_hash(bytes);
    let schedule = decode_document(bytes, hash)
        .map_err(|e| SourceError::from(e).with_source_name(source_name))?;

    debug!(
        source = source_name,
        version = schedule.version(),
        sessions = schedule.len(),
        "Decoded schedule document"
    );
    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceErrorCode;

    #[test]
    fn hash_is_hex_sha256() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(content_hash(b"a"), content_hash(b"b"));
    }

    #[test]
    fn decode_failure_is_tagged_with_source() {
        let err = decode_bytes("http", b"not json").unwrap_err();
        assert_eq!(err.code(), SourceErrorCode::DecodeError);
        assert_eq!(err.source_name(), Some("http"));
    }
}
