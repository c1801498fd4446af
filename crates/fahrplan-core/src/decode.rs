//! Schedule document decoding.
//!
//! The published document is JSON shaped as
//! `{"schedule": {"version": .., "conference": {.., "days": [..]}}}` where
//! every day maps room names to arrays of sessions. Decoding happens in two
//! steps: serde reads the raw shape into `Raw*` structs, then each raw value
//! is converted into the model with its dates and durations parsed.
//!
//! Decoding is all-or-nothing: one bad session fails the whole document.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::model::{Conference, Day, Person, Room, Schedule, Session, SessionId};
use crate::time::{TimeParseError, parse_date, parse_datetime, parse_duration};

/// Result type for decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Errors that make a schedule document unusable.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Not JSON, or JSON missing a required field / with a wrong type.
    #[error("malformed schedule document: {0}")]
    Json(#[from] serde_json::Error),

    /// A date, timestamp or duration could not be parsed.
    #[error("malformed schedule document: {0}")]
    Time(#[from] TimeParseError),

    /// The same session id appears in more than one room or day.
    #[error("malformed schedule document: session {id} appears more than once")]
    DuplicateSession { id: SessionId },
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    schedule: RawSchedule,
}

#[derive(Debug, Deserialize)]
struct RawSchedule {
    version: String,
    conference: RawConference,
}

#[derive(Debug, Deserialize)]
struct RawConference {
    acronym: String,
    title: String,
    start: String,
    end: String,
    #[serde(rename = "daysCount")]
    days_count: i64,
    timeslot_duration: String,
    days: Vec<RawDay>,
}

#[derive(Debug, Deserialize)]
struct RawDay {
    index: i64,
    date: String,
    day_start: String,
    day_end: String,
    rooms: BTreeMap<String, Vec<RawSession>>,
}

#[derive(Debug, Deserialize)]
struct RawSession {
    id: SessionId,
    guid: String,
    #[serde(default)]
    logo: Option<String>,
    date: String,
    start: String,
    duration: String,
    room: String,
    slug: String,
    title: String,
    #[serde(default)]
    subtitle: Option<String>,
    #[serde(default)]
    track: Option<String>,
    #[serde(rename = "type")]
    session_type: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(rename = "abstract", default)]
    abstract_text: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    recording_license: Option<String>,
    #[serde(default)]
    do_not_record: Option<bool>,
    persons: Vec<RawPerson>,
    #[serde(default)]
    links: Vec<Value>,
    #[serde(default)]
    attachments: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawPerson {
    id: i64,
    #[serde(default)]
    full_public_name: Option<String>,
    #[serde(default)]
    public_name: Option<String>,
}

/// Decodes a full document (with the outer `schedule` member).
pub fn decode_document(bytes: &[u8], content_hash: impl Into<String>) -> DecodeResult<Schedule> {
    let raw: RawDocument = serde_json::from_slice(bytes)?;
    raw.schedule.into_schedule(content_hash.into())
}

/// Decodes only the inner `schedule` object.
pub fn decode_schedule(bytes: &[u8], content_hash: impl Into<String>) -> DecodeResult<Schedule> {
    let raw: RawSchedule = serde_json::from_slice(bytes)?;
    raw.into_schedule(content_hash.into())
}

impl RawSchedule {
    fn into_schedule(self, content_hash: String) -> DecodeResult<Schedule> {
        let conference = self.conference.into_conference()?;
        Schedule::new(self.version, content_hash, conference)
    }
}

impl RawConference {
    fn into_conference(self) -> DecodeResult<Conference> {
        let days = self
            .days
            .into_iter()
            .map(RawDay::into_day)
            .collect::<DecodeResult<Vec<_>>>()?;

        Ok(Conference {
            acronym: self.acronym,
            title: self.title,
            start: parse_date(&self.start)?,
            end: parse_date(&self.end)?,
            day_count: self.days_count,
            timeslot_duration: parse_duration(&self.timeslot_duration)?,
            days,
        })
    }
}

impl RawDay {
    fn into_day(self) -> DecodeResult<Day> {
        let mut rooms = BTreeMap::new();
        for (name, sessions) in self.rooms {
            let sessions = sessions
                .into_iter()
                .map(RawSession::into_session)
                .collect::<DecodeResult<Vec<_>>>()?;
            rooms.insert(name.clone(), Room::new(name, sessions));
        }

        Ok(Day {
            index: self.index,
            date: parse_date(&self.date)?,
            day_start: parse_datetime(&self.day_start)?,
            day_end: parse_datetime(&self.day_end)?,
            rooms,
        })
    }
}

impl RawSession {
    fn into_session(self) -> DecodeResult<Session> {
        Ok(Session {
            id: self.id,
            guid: self.guid,
            logo: self.logo,
            scheduled_at: parse_datetime(&self.date)?,
            start_offset: parse_duration(&self.start)?,
            duration: parse_duration(&self.duration)?,
            room: self.room,
            slug: self.slug,
            title: self.title,
            subtitle: self.subtitle.unwrap_or_default(),
            track: self.track.unwrap_or_default(),
            session_type: self.session_type,
            language: self.language.unwrap_or_default(),
            abstract_text: self.abstract_text.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            recording_license: self.recording_license.unwrap_or_default(),
            do_not_record: self.do_not_record.unwrap_or(false),
            persons: self.persons.into_iter().map(RawPerson::into_person).collect(),
            links: self.links.into_iter().map(opaque_text).collect(),
            attachments: self.attachments.into_iter().map(opaque_text).collect(),
        })
    }
}

impl RawPerson {
    fn into_person(self) -> Person {
        let name = self
            .full_public_name
            .or(self.public_name)
            .unwrap_or_else(|| "N/A".to_string());
        Person::new(self.id, name)
    }
}

/// Keeps strings as-is and structured entries as compact JSON text.
fn opaque_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{Value, json};

    pub fn session_json(id: i64, date: &str) -> Value {
        json!({
            "id": id,
            "guid": format!("b8e0eb47-4832-4726-bc9b-{id:012}"),
            "logo": null,
            "date": date,
            "start": "11:00",
            "duration": "00:30",
            "room": "Saal 1",
            "slug": format!("session-{id}"),
            "title": "lol",
            "subtitle": "",
            "track": "CCC",
            "type": "lecture",
            "language": "en",
            "abstract": "",
            "description": "",
            "recording_license": "",
            "do_not_record": false,
            "persons": [],
            "links": [],
            "attachments": []
        })
    }

    /// The single-session 33c3 document used across the tests.
    pub fn document() -> Value {
        json!({
            "schedule": {
                "version": "CANT REPRODUCE",
                "conference": {
                    "acronym": "33c3",
                    "title": "33. Chaos Communication Congress",
                    "start": "2016-12-27",
                    "end": "2016-12-30",
                    "daysCount": 4,
                    "timeslot_duration": "00:15",
                    "days": [{
                        "index": 0,
                        "date": "2016-12-27",
                        "day_start": "2016-12-27T10:00:00+01:00",
                        "day_end": "2016-12-28T04:00:00+01:00",
                        "rooms": {
                            "Saal 1": [session_json(123, "2016-12-27T11:00:00+01:00")]
                        }
                    }]
                }
            }
        })
    }

    pub fn bytes(document: &Value) -> Vec<u8> {
        serde_json::to_vec(document).unwrap()
    }
}
