//! `fahrplan diff OLD NEW`

use std::fmt::Write as _;
use std::path::Path;

use fahrplan_core::{Schedule, ScheduleDiff, Session, diff_if_changed, format_summary};
use fahrplan_providers::{FileSource, ScheduleSource};

use crate::error::ClientResult;

pub async fn run(old: &Path, new: &Path) -> ClientResult<()> {
    let old = FileSource::new(old).fetch().await?;
    let new = FileSource::new(new).fetch().await?;
    print!("{}", render(&old, &new));
    Ok(())
}

/// Human readable report of what changed from `old` to `new`.
pub fn render(old: &Schedule, new: &Schedule) -> String {
    let Some(diff) = diff_if_changed(old, new) else {
        return format!("Schedules are identical (version {}).\n", new.version());
    };

    let mut out = format!("{} -> {}\n", old.version(), new.version());
    if diff.is_empty() {
        out.push_str("No session changed.\n");
        return out;
    }

    let ScheduleDiff {
        changed,
        added,
        missing,
    } = diff;
    section(&mut out, "Changed", &changed);
    section(&mut out, "Added", &added);
    section(&mut out, "Removed", &missing);
    out
}

fn section(out: &mut String, label: &str, sessions: &[std::sync::Arc<Session>]) {
    if sessions.is_empty() {
        return;
    }
    let _ = writeln!(out, "{label} ({}):", sessions.len());
    for session in sessions {
        let _ = writeln!(out, "  {}", format_summary(session));
    }
}
