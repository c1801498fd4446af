//! Structural diff between two schedule snapshots.
//!
//! Sessions are matched by id through each snapshot's index, so a session
//! that moved to another room or day shows up as changed, never as a
//! removal plus an addition.

use std::sync::Arc;

use tracing::debug;

use crate::model::{Schedule, Session};

/// The result of comparing two snapshots.
///
/// The three sets are disjoint and each is sorted by ascending session id.
/// `changed` and `added` hold the sessions from the new snapshot, `missing`
/// holds them from the old one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleDiff {
    pub changed: Vec<Arc<Session>>,
    pub added: Vec<Arc<Session>>,
    pub missing: Vec<Arc<Session>>,
}

impl ScheduleDiff {
    /// Returns true if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.added.is_empty() && self.missing.is_empty()
    }

    /// Total number of affected sessions.
    pub fn len(&self) -> usize {
        self.changed.len() + self.added.len() + self.missing.len()
    }

    /// Splits into `(changed, added, missing)`.
    pub fn into_parts(self) -> (Vec<Arc<Session>>, Vec<Arc<Session>>, Vec<Arc<Session>>) {
        (self.changed, self.added, self.missing)
    }
}

/// Compares two snapshots session by session.
pub fn diff_schedules(old: &Schedule, new: &Schedule) -> ScheduleDiff {
    let mut diff = ScheduleDiff::default();

    for (id, old_session) in old.index() {
        match new.session(*id) {
            None => diff.missing.push(Arc::clone(old_session)),
            Some(new_session) if new_session != old_session => {
                diff.changed.push(Arc::clone(new_session));
            }
            Some(_) => {}
        }
    }

    diff.added = new
        .index()
        .iter()
        .filter(|(id, _)| old.session(**id).is_none())
        .map(|(_, session)| Arc::clone(session))
        .collect();

    debug!(
        changed = diff.changed.len(),
        added = diff.added.len(),
        missing = diff.missing.len(),
        "Computed schedule diff"
    );

    diff
}

/// Diffs only when the version or the content hash moved.
///
/// Returns `None` when both change signals match, without looking at any
/// session.
pub fn diff_if_changed(old: &Schedule, new: &Schedule) -> Option<ScheduleDiff> {
    if !old.differs_from(new) {
        debug!(version = new.version(), "Schedule unchanged, skipping diff");
        return None;
    }
    Some(diff_schedules(old, new))
}
