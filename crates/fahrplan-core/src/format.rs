//! Message rendering for announcements and change notices.
//!
//! Every notification the server sends is a [`Message`]: a kind, an urgency
//! used by sinks that can show one (desktop notifications), and the rendered
//! text. Text never carries markup so every sink can deliver it verbatim.

use chrono::{DateTime, Datelike, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::model::Session;
use crate::time::{format_hhmm, humanize_duration};

/// Track whose sessions have no page of their own; their links are used
/// instead of the session URL.
pub const SELF_ORGANIZED_TRACK: &str = "self organized sessions";

/// Remaining time at or above which a reminder is low urgency.
const LOW_URGENCY_SECS: i64 = 800;
/// Remaining time at or above which a reminder is normal urgency.
const NORMAL_URGENCY_SECS: i64 = 500;

/// What a message is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// A session starts soon.
    Reminder,
    /// A session starts now.
    Start,
    /// A session was modified in a new snapshot.
    Changed,
    /// A session disappeared from a new snapshot.
    Removed,
    /// A session appeared in a new snapshot.
    Added,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reminder => "reminder",
            Self::Start => "start",
            Self::Changed => "changed",
            Self::Removed => "removed",
            Self::Added => "added",
        }
    }
}

/// How pressing a message is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Normal,
    Critical,
}

impl Urgency {
    /// Picks the urgency of a reminder from the time left until the start.
    pub fn from_remaining(remaining: Duration) -> Self {
        let secs = remaining.num_seconds();
        if secs >= LOW_URGENCY_SECS {
            Self::Low
        } else if secs >= NORMAL_URGENCY_SECS {
            Self::Normal
        } else {
            Self::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::Critical => "critical",
        }
    }
}

/// A rendered notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub kind: MessageKind,
    pub urgency: Urgency,
    pub text: String,
}

impl Message {
    /// "`<short>` in `<time left>`", sent ahead of the start.
    pub fn reminder(session: &Session, now: DateTime<FixedOffset>) -> Self {
        let remaining = session.scheduled_at - now;
        Self {
            kind: MessageKind::Reminder,
            urgency: Urgency::from_remaining(remaining),
            text: format!(
                "{} in {}",
                format_short(session),
                humanize_duration(remaining)
            ),
        }
    }

    /// "NOW `<short>`", sent at the start.
    pub fn start(session: &Session) -> Self {
        Self {
            kind: MessageKind::Start,
            urgency: Urgency::Critical,
            text: format!("NOW {}", format_short(session)),
        }
    }

    /// Change notice pointing at the session page.
    pub fn changed(session: &Session, session_url_template: &str) -> Self {
        Self {
            kind: MessageKind::Changed,
            urgency: Urgency::Normal,
            text: format!(
                "The session '{}' ({}) has been changed. Please check the website for details: {}",
                session.title,
                session.id,
                session_url(session_url_template, session)
            ),
        }
    }

    pub fn removed(session: &Session) -> Self {
        Self {
            kind: MessageKind::Removed,
            urgency: Urgency::Normal,
            text: format!(
                "The session '{}' ({}) has been removed. In case it re-appears you'll be subscribed again.",
                session.title, session.id
            ),
        }
    }

    pub fn added(session: &Session) -> Self {
        Self {
            kind: MessageKind::Added,
            urgency: Urgency::Low,
            text: format!(
                "The session '{}' ({}) has been added. You receive this notification since you might have subscribed to this session in the past.",
                session.title, session.id
            ),
        }
    }
}

/// One-line form with the start time of day:
/// `[room] HH:MM (duration) - [language/type/track] title / persons (id)`.
pub fn format_short(session: &Session) -> String {
    render_line(session, &session.scheduled_at.format("%H:%M").to_string())
}

/// Like [`format_short`], with the full start timestamp instead of the time
/// of day. Used for listings spanning several days.
pub fn format_summary(session: &Session) -> String {
    render_line(
        session,
        &session.scheduled_at.format("%Y-%m-%d %H:%M%:z").to_string(),
    )
}

fn render_line(session: &Session, when: &str) -> String {
    format!(
        "[{room}] {when} ({duration}) - [{language}/{kind}/{track}] {title} / {persons} ({id})",
        room = session.room,
        duration = format_hhmm(session.duration),
        language = session.language,
        kind = session.session_type,
        track = session.track,
        title = session.title,
        persons = session.person_names(),
        id = session.id,
    )
}

/// Builds the public URL of a session from a template with `{year}` and
/// `{id}` placeholders.
///
/// Self-organized sessions have no page, so their links are returned
/// (space separated) or `N/A` when there are none.
pub fn session_url(template: &str, session: &Session) -> String {
    if session.track == SELF_ORGANIZED_TRACK {
        if session.links.is_empty() {
            return "N/A".to_string();
        }
        return session.links.join(" ");
    }

    template
        .replace("{year}", &session.scheduled_at.year().to_string())
        .replace("{id}", &session.id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Person;
    use crate::model::fixtures::session;
    use crate::time::parse_datetime;

    const TEMPLATE: &str = "https://fahrplan.events.ccc.de/congress/{year}/Fahrplan/events/{id}.html";

    fn talk() -> Session {
        let mut s = session(123, "Saal 1", "2016-12-27T11:00:00+01:00");
        s.title = "Hacking the Planet".to_string();
        s.persons = vec![Person::new(1, "Ada"), Person::new(2, "Grace")];
        s
    }

    #[test]
    fn short_line() {
        insta::assert_snapshot!(
            format_short(&talk()),
            @"[Saal 1] 11:00 (00:30) - [en/lecture/CCC] Hacking the Planet / Ada, Grace (123)"
        );
    }

    #[test]
    fn summary_line() {
        insta::assert_snapshot!(
            format_summary(&talk()),
            @"[Saal 1] 2016-12-27 11:00+01:00 (00:30) - [en/lecture/CCC] Hacking the Planet / Ada, Grace (123)"
        );
    }

    #[test]
    fn empty_track_and_persons() {
        let mut s = talk();
        s.track = String::new();
        s.persons.clear();
        insta::assert_snapshot!(
            format_short(&s),
            @"[Saal 1] 11:00 (00:30) - [en/lecture/] Hacking the Planet /  (123)"
        );
    }

    #[test]
    fn reminder_message() {
        let now = parse_datetime("2016-12-27T10:45:00+01:00").unwrap();
        let msg = Message::reminder(&talk(), now);
        assert_eq!(msg.kind, MessageKind::Reminder);
        assert_eq!(msg.urgency, Urgency::Low);
        insta::assert_snapshot!(
            msg.text,
            @"[Saal 1] 11:00 (00:30) - [en/lecture/CCC] Hacking the Planet / Ada, Grace (123) in 15 minutes"
        );
    }

    #[test]
    fn reminder_close_to_start_is_critical() {
        let now = parse_datetime("2016-12-27T10:55:30+01:00").unwrap();
        let msg = Message::reminder(&talk(), now);
        assert_eq!(msg.urgency, Urgency::Critical);
        assert!(msg.text.ends_with(" in 4 minutes 30 seconds"));
    }

    #[test]
    fn start_message() {
        let msg = Message::start(&talk());
        assert_eq!(msg.kind, MessageKind::Start);
        insta::assert_snapshot!(
            msg.text,
            @"NOW [Saal 1] 11:00 (00:30) - [en/lecture/CCC] Hacking the Planet / Ada, Grace (123)"
        );
    }

    #[test]
    fn change_messages() {
        let s = talk();
        insta::assert_snapshot!(
            Message::changed(&s, TEMPLATE).text,
            @"The session 'Hacking the Planet' (123) has been changed. Please check the website for details: https://fahrplan.events.ccc.de/congress/2016/Fahrplan/events/123.html"
        );
        insta::assert_snapshot!(
            Message::removed(&s).text,
            @"The session 'Hacking the Planet' (123) has been removed. In case it re-appears you'll be subscribed again."
        );
        insta::assert_snapshot!(
            Message::added(&s).text,
            @"The session 'Hacking the Planet' (123) has been added. You receive this notification since you might have subscribed to this session in the past."
        );
    }

    #[test]
    fn urgency_thresholds() {
        assert_eq!(Urgency::from_remaining(Duration::seconds(900)), Urgency::Low);
        assert_eq!(Urgency::from_remaining(Duration::seconds(800)), Urgency::Low);
        assert_eq!(Urgency::from_remaining(Duration::seconds(799)), Urgency::Normal);
        assert_eq!(Urgency::from_remaining(Duration::seconds(500)), Urgency::Normal);
        assert_eq!(Urgency::from_remaining(Duration::seconds(499)), Urgency::Critical);
        assert_eq!(Urgency::from_remaining(Duration::seconds(-5)), Urgency::Critical);
    }

    #[test]
    fn self_organized_sessions_use_links() {
        let mut s = talk();
        s.track = SELF_ORGANIZED_TRACK.to_string();
        assert_eq!(session_url(TEMPLATE, &s), "N/A");

        s.links = vec!["https://a.example".to_string(), "https://b.example".to_string()];
        assert_eq!(session_url(TEMPLATE, &s), "https://a.example https://b.example");
    }

    #[test]
    fn kinds_serialize_as_snake_case() {
        assert_eq!(serde_json::to_string(&MessageKind::Reminder).unwrap(), "\"reminder\"");
        assert_eq!(Urgency::Critical.as_str(), "critical");
        assert_eq!(MessageKind::Removed.as_str(), "removed");
    }
}
