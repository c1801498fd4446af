//! Schedule snapshot model.
//!
//! A [`Schedule`] is one decoded schedule document: a [`Conference`] made of
//! [`Day`]s, each holding [`Room`]s, each holding [`Session`]s. Snapshots are
//! never edited in place; every refresh builds a new one.
//!
//! On construction a schedule walks every day, room and session once and
//! builds a flat session index keyed by [`SessionId`]. The index is what
//! lookups and diffing use, so a session's location in the nested structure
//! never affects its identity.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use tracing::trace;

use crate::decode::{DecodeError, DecodeResult};

/// Identifier of a session, unique within a snapshot.
pub type SessionId = i64;

/// A speaker or host of a session.
///
/// Two persons are equal when their display names match; ids are allowed to
/// shift between snapshots.
#[derive(Debug, Clone)]
pub struct Person {
    pub id: i64,
    pub display_name: String,
}

impl Person {
    pub fn new(id: i64, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

impl PartialEq for Person {
    fn eq(&self, other: &Self) -> bool {
        self.display_name == other.display_name
    }
}

impl Eq for Person {}

/// One talk, workshop or other scheduled event.
#[derive(Debug, Clone)]
pub struct Session {
    /// Identity of the session; the diff key.
    pub id: SessionId,
    /// Stable external identifier. Not part of equality.
    pub guid: String,
    pub logo: Option<String>,
    /// Absolute start time.
    pub scheduled_at: DateTime<FixedOffset>,
    /// Start as a time-of-day length (`start` in the document).
    pub start_offset: Duration,
    pub duration: Duration,
    pub room: String,
    pub slug: String,
    pub title: String,
    pub subtitle: String,
    /// May be empty.
    pub track: String,
    pub session_type: String,
    pub language: String,
    pub abstract_text: String,
    pub description: String,
    pub recording_license: String,
    pub do_not_record: bool,
    pub persons: Vec<Person>,
    pub links: Vec<String>,
    pub attachments: Vec<String>,
}

impl Session {
    /// Returns when the session ends.
    pub fn ends_at(&self) -> DateTime<FixedOffset> {
        self.scheduled_at + self.duration
    }

    /// Returns the display names of all persons, comma separated.
    pub fn person_names(&self) -> String {
        self.persons
            .iter()
            .map(|p| p.display_name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Returns true if any searchable text contains `needle`.
    ///
    /// `needle` must already be lowercase.
    fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.abstract_text.to_lowercase().contains(needle)
            || self
                .persons
                .iter()
                .any(|p| p.display_name.to_lowercase().contains(needle))
    }
}

// Every field is listed so that a new field cannot be silently left out of
// change detection.
impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        let Session {
            id,
            guid: _,
            logo,
            scheduled_at,
            start_offset,
            duration,
            room,
            slug,
            title,
            subtitle,
            track,
            session_type,
            language,
            abstract_text,
            description,
            recording_license,
            do_not_record,
            persons,
            links,
            attachments,
        } = self;

        *id == other.id
            && *logo == other.logo
            && *scheduled_at == other.scheduled_at
            && *start_offset == other.start_offset
            && *duration == other.duration
            && *room == other.room
            && *slug == other.slug
            && *title == other.title
            && *subtitle == other.subtitle
            && *track == other.track
            && *session_type == other.session_type
            && *language == other.language
            && *abstract_text == other.abstract_text
            && *description == other.description
            && *recording_license == other.recording_license
            && *do_not_record == other.do_not_record
            && *persons == other.persons
            && *links == other.links
            && *attachments == other.attachments
    }
}

impl Eq for Session {}

/// A room and the sessions held in it on one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub name: String,
    pub sessions: BTreeMap<SessionId, Arc<Session>>,
}

impl Room {
    /// Builds a room; a repeated id replaces the earlier session.
    pub fn new(name: impl Into<String>, sessions: impl IntoIterator<Item = Session>) -> Self {
        let name = name.into();
        let mut by_id = BTreeMap::new();
        for session in sessions {
            if let Some(previous) = by_id.insert(session.id, Arc::new(session)) {
                trace!(room = %name, id = previous.id, "Repeated session id in room, keeping last");
            }
        }
        Self {
            name,
            sessions: by_id,
        }
    }
}

/// One conference day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Day {
    pub index: i64,
    pub date: NaiveDate,
    pub day_start: DateTime<FixedOffset>,
    pub day_end: DateTime<FixedOffset>,
    pub rooms: BTreeMap<String, Room>,
}

/// Conference metadata and its days, ordered by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conference {
    pub acronym: String,
    pub title: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub day_count: i64,
    pub timeslot_duration: Duration,
    pub days: Vec<Day>,
}

impl Conference {
    /// Returns the 1-based conference day for `today`.
    ///
    /// The first day is 1, the day before the conference is 0 and earlier
    /// days count down into negative numbers.
    pub fn day_number(&self, today: NaiveDate) -> i64 {
        (today - self.start).num_days() + 1
    }

    /// Returns true if `today` lies within the conference dates.
    pub fn is_running(&self, today: NaiveDate) -> bool {
        self.start <= today && today <= self.end
    }
}

/// One immutable schedule snapshot.
#[derive(Debug, Clone)]
pub struct Schedule {
    version: String,
    content_hash: String,
    conference: Conference,
    index: BTreeMap<SessionId, Arc<Session>>,
}

impl Schedule {
    /// Builds a snapshot and its session index.
    ///
    /// Days are sorted by index. A session id that appears in more than one
    /// room or day is rejected.
    pub fn new(
        version: impl Into<String>,
        content_hash: impl Into<String>,
        mut conference: Conference,
    ) -> DecodeResult<Self> {
        conference.days.sort_by_key(|day| day.index);
        let index = build_index(&conference)?;

        Ok(Self {
            version: version.into(),
            content_hash: content_hash.into(),
            conference,
            index,
        })
    }

    /// Version string supplied by the document. Not always bumped upstream.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Hash of the raw document bytes.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn conference(&self) -> &Conference {
        &self.conference
    }

    /// The flat session index.
    pub fn index(&self) -> &BTreeMap<SessionId, Arc<Session>> {
        &self.index
    }

    /// Number of sessions in the snapshot.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Looks up a session by id.
    pub fn session(&self, id: SessionId) -> Option<&Arc<Session>> {
        self.index.get(&id)
    }

    /// Walks every session in day, room, id order.
    pub fn sessions(&self) -> impl Iterator<Item = &Arc<Session>> {
        self.conference
            .days
            .iter()
            .flat_map(|day| day.rooms.values())
            .flat_map(|room| room.sessions.values())
    }

    /// Resolves several ids, skipping unknown ones, sorted by start time.
    pub fn sessions_by_ids(&self, ids: impl IntoIterator<Item = SessionId>) -> Vec<Arc<Session>> {
        let mut sessions: Vec<_> = ids
            .into_iter()
            .filter_map(|id| self.session(id).cloned())
            .collect();
        sessions.sort_by_key(|s| (s.scheduled_at, s.id));
        sessions
    }

    /// Case-insensitive search over title, description, abstract and person
    /// names. Stops after `max_results` hits.
    pub fn search(&self, term: &str, max_results: usize) -> Vec<Arc<Session>> {
        let needle = term.to_lowercase();
        self.sessions()
            .filter(|s| s.matches(&needle))
            .take(max_results)
            .cloned()
            .collect()
    }

    /// Returns up to `limit` sessions starting at or after `now`, earliest
    /// first.
    pub fn upcoming(&self, now: DateTime<FixedOffset>, limit: usize) -> Vec<Arc<Session>> {
        let mut sessions: Vec<_> = self
            .index
            .values()
            .filter(|s| s.scheduled_at >= now)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| (s.scheduled_at, s.id));
        sessions.truncate(limit);
        sessions
    }

    /// Returns true if either change signal differs from `other`.
    ///
    /// The content hash is checked as well as the version because the
    /// upstream version field is not always bumped when content changes.
    pub fn differs_from(&self, other: &Schedule) -> bool {
        self.version != other.version || self.content_hash != other.content_hash
    }
}

fn build_index(conference: &Conference) -> DecodeResult<BTreeMap<SessionId, Arc<Session>>> {
    let mut index = BTreeMap::new();
    for day in &conference.days {
        for room in day.rooms.values() {
            for (id, session) in &room.sessions {
                if index.insert(*id, Arc::clone(session)).is_some() {
                    return Err(DecodeError::DuplicateSession { id: *id });
                }
            }
        }
    }
    Ok(index)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::time::parse_datetime;

    pub fn session(id: SessionId, room: &str, at: &str) -> Session {
        Session {
            id,
            guid: format!("guid-{id}"),
            logo: None,
            scheduled_at: parse_datetime(at).unwrap(),
            start_offset: Duration::hours(11),
            duration: Duration::minutes(30),
            room: room.to_string(),
            slug: format!("session-{id}"),
            title: format!("Session {id}"),
            subtitle: String::new(),
            track: "CCC".to_string(),
            session_type: "lecture".to_string(),
            language: "en".to_string(),
            abstract_text: String::new(),
            description: String::new(),
            recording_license: String::new(),
            do_not_record: false,
            persons: vec![],
            links: vec![],
            attachments: vec![],
        }
    }

    pub fn day(index: i64, date: &str, rooms: Vec<Room>) -> Day {
        Day {
            index,
            date: crate::time::parse_date(date).unwrap(),
            day_start: parse_datetime(&format!("{date}T10:00:00+01:00")).unwrap(),
            day_end: parse_datetime(&format!("{date}T23:59:00+01:00")).unwrap(),
            rooms: rooms.into_iter().map(|r| (r.name.clone(), r)).collect(),
        }
    }

    pub fn conference(days: Vec<Day>) -> Conference {
        Conference {
            acronym: "33c3".to_string(),
            title: "33. Chaos Communication Congress".to_string(),
            start: crate::time::parse_date("2016-12-27").unwrap(),
            end: crate::time::parse_date("2016-12-30").unwrap(),
            day_count: 4,
            timeslot_duration: Duration::minutes(15),
            days,
        }
    }
}
