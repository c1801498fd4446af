//! Read-side lookups: `nextup`, `search`, `info`.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate};
use fahrplan_core::{Clock, Schedule, SessionId, format_short, format_summary, session_url};

use super::fetch_schedule;
use crate::config::CliConfig;
use crate::error::{ClientError, ClientResult};

pub async fn nextup(config: &CliConfig, clock: Arc<dyn Clock>, limit: usize) -> ClientResult<()> {
    let schedule = fetch_schedule(config, Arc::clone(&clock)).await?;
    print!("{}", render_nextup(&schedule, clock.now(), clock.today(), limit));
    Ok(())
}

pub async fn search(
    config: &CliConfig,
    clock: Arc<dyn Clock>,
    term: &str,
    limit: usize,
) -> ClientResult<()> {
    let schedule = fetch_schedule(config, clock).await?;
    print!("{}", render_search(&schedule, term, limit));
    Ok(())
}

pub async fn info(config: &CliConfig, clock: Arc<dyn Clock>, ids: &[SessionId]) -> ClientResult<()> {
    let schedule = fetch_schedule(config, clock).await?;
    print!("{}", render_info(&schedule, ids, &config.announce.session_url)?);
    Ok(())
}

fn day_line(schedule: &Schedule, today: NaiveDate) -> String {
    let conference = schedule.conference();
    if conference.is_running(today) {
        format!(
            "{} day {} of {}",
            conference.acronym,
            conference.day_number(today),
            conference.day_count
        )
    } else {
        let days = conference.day_number(today) - 1;
        if days < 0 {
            format!("{} starts in {} days", conference.acronym, -days)
        } else {
            format!("{} is over", conference.acronym)
        }
    }
}

pub fn render_nextup(
    schedule: &Schedule,
    now: DateTime<FixedOffset>,
    today: NaiveDate,
    limit: usize,
) -> String {
    let mut out = day_line(schedule, today);
    out.push('\n');

    let sessions = schedule.upcoming(now, limit);
    if sessions.is_empty() {
        out.push_str("No upcoming sessions.\n");
    }
    for session in sessions {
        let _ = writeln!(out, "{}", format_short(&session));
    }
    out
}

pub fn render_search(schedule: &Schedule, term: &str, limit: usize) -> String {
    let hits = schedule.search(term, limit);
    if hits.is_empty() {
        return format!("No session matches {term:?}.\n");
    }
    let mut out = String::new();
    for session in hits {
        let _ = writeln!(out, "{}", format_summary(&session));
    }
    out
}

/// Details of every known id, sorted by start.
///
/// # Errors
///
/// [`ClientError::NotFound`] if none of the ids is in the schedule.
pub fn render_info(schedule: &Schedule, ids: &[SessionId], url_template: &str) -> ClientResult<String> {
    let sessions = schedule.sessions_by_ids(ids.iter().copied());
    if sessions.is_empty() {
        let ids: Vec<_> = ids.iter().map(ToString::to_string).collect();
        return Err(ClientError::NotFound(format!("no session with id {}", ids.join(", "))));
    }

    let mut out = String::new();
    for (i, session) in sessions.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "{}", format_summary(session));
        if !session.subtitle.is_empty() {
            let _ = writeln!(out, "{}", session.subtitle);
        }
        if !session.abstract_text.is_empty() {
            let _ = writeln!(out, "{}", session.abstract_text.trim());
        }
        let _ = writeln!(out, "{}", session_url(url_template, session));
    }
    Ok(out)
}
