//! Time handling for schedule documents.
//!
//! The schedule document uses three textual time formats:
//! - calendar dates (`2016-12-27`)
//! - RFC 3339 timestamps with an offset (`2016-12-27T11:00:00+01:00`)
//! - `HH:MM` lengths for session start offsets and durations
//!
//! This module parses them, renders durations for humans, and provides the
//! [`Clock`] abstraction used to decide what "now" is.

use std::sync::RwLock;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use thiserror::Error;

/// Offset of the reference timezone the conference runs in (UTC+01:00).
///
/// This is Central European winter time. It is a fixed offset and does not
/// follow daylight saving time, so events held between late March and late
/// October must configure `+02:00` explicitly.
pub const REFERENCE_OFFSET_SECS: i32 = 3600;

/// Errors produced while parsing textual time values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    /// Not a `YYYY-MM-DD` date.
    #[error("invalid date {value:?}, expected YYYY-MM-DD")]
    Date { value: String },

    /// Not an RFC 3339 timestamp.
    #[error("invalid timestamp {value:?}, expected RFC 3339")]
    DateTime { value: String },

    /// Not an `HH:MM` length.
    #[error("invalid duration {value:?}, expected HH:MM")]
    Duration { value: String },

    /// Not a `+HH:MM` / `-HH:MM` offset.
    #[error("invalid UTC offset {value:?}, expected +HH:MM")]
    Offset { value: String },
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Result<NaiveDate, TimeParseError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| TimeParseError::Date {
        value: value.to_string(),
    })
}

/// Parses an RFC 3339 timestamp, keeping its offset.
pub fn parse_datetime(value: &str) -> Result<DateTime<FixedOffset>, TimeParseError> {
    DateTime::parse_from_rfc3339(value.trim()).map_err(|_| TimeParseError::DateTime {
        value: value.to_string(),
    })
}

/// Parses an `HH:MM` length into a [`Duration`].
///
/// Hours are unbounded (`25:00` is a valid length), minutes must be below 60.
pub fn parse_duration(value: &str) -> Result<Duration, TimeParseError> {
    let invalid = || TimeParseError::Duration {
        value: value.to_string(),
    };

    let (hours, minutes) = value.trim().split_once(':').ok_or_else(invalid)?;
    let hours: i64 = hours.parse().map_err(|_| invalid())?;
    let minutes: i64 = minutes.parse().map_err(|_| invalid())?;

    if hours < 0 || !(0..60).contains(&minutes) {
        return Err(invalid());
    }

    Ok(Duration::hours(hours) + Duration::minutes(minutes))
}

/// Parses a `+HH:MM` or `-HH:MM` UTC offset.
pub fn parse_offset(value: &str) -> Result<FixedOffset, TimeParseError> {
    let invalid = || TimeParseError::Offset {
        value: value.to_string(),
    };

    let trimmed = value.trim();
    let (sign, rest) = match trimmed.chars().next() {
        Some('+') => (1, &trimmed[1..]),
        Some('-') => (-1, &trimmed[1..]),
        _ => return Err(invalid()),
    };

    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Formats a length as `HH:MM`, the way the document writes it.
pub fn format_hhmm(duration: Duration) -> String {
    let minutes = duration.num_minutes().max(0);
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Renders a duration in words, e.g. `14 minutes 30 seconds`.
///
/// Negative durations render as `0 seconds`.
pub fn humanize_duration(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let units = [
        (total / 86_400, "day"),
        (total % 86_400 / 3600, "hour"),
        (total % 3600 / 60, "minute"),
        (total % 60, "second"),
    ];

    let parts: Vec<String> = units
        .iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, unit)| {
            if *count == 1 {
                format!("1 {unit}")
            } else {
                format!("{count} {unit}s")
            }
        })
        .collect();

    if parts.is_empty() {
        "0 seconds".to_string()
    } else {
        parts.join(" ")
    }
}

/// Returns the offset of the reference timezone.
pub fn reference_offset() -> FixedOffset {
    FixedOffset::east_opt(REFERENCE_OFFSET_SECS).expect("valid reference offset")
}

/// Source of the current time.
///
/// Timers always run on real elapsed time; the clock only decides which
/// instant counts as "now" when delays are computed and messages rendered.
pub trait Clock: Send + Sync {
    /// Returns the current instant in the clock's timezone.
    fn now(&self) -> DateTime<FixedOffset>;

    /// Returns the current calendar date.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time in a fixed reference offset.
///
/// The offset never changes at runtime. A daemon running across a daylight
/// saving switch keeps the offset it started with.
///
/// The calendar date can be pinned to a simulated day while the time of day
/// keeps following the real clock, which lets operators rehearse a
/// conference day before it happens.
#[derive(Debug, Clone)]
pub struct SystemClock {
    offset: FixedOffset,
    fake_date: Option<NaiveDate>,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(reference_offset())
    }
}

impl SystemClock {
    /// Creates a clock reading wall-clock time in the given offset.
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            offset,
            fake_date: None,
        }
    }

    /// Builder: pin the calendar date.
    pub fn with_fake_date(mut self, date: Option<NaiveDate>) -> Self {
        self.fake_date = date;
        self
    }

    /// Returns the pinned date, if any.
    pub fn fake_date(&self) -> Option<NaiveDate> {
        self.fake_date
    }

    /// Returns the clock's offset.
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        let now = Utc::now().with_timezone(&self.offset);
        match self.fake_date {
            Some(date) => pin_date(now, date),
            None => now,
        }
    }

    fn today(&self) -> NaiveDate {
        self.fake_date
            .unwrap_or_else(|| Utc::now().with_timezone(&self.offset).date_naive())
    }
}

/// Moves `now` onto `date`, keeping its time of day and offset.
fn pin_date(now: DateTime<FixedOffset>, date: NaiveDate) -> DateTime<FixedOffset> {
    let local = date.and_time(now.time());
    now.offset()
        .from_local_datetime(&local)
        .single()
        .unwrap_or(now)
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<FixedOffset>>,
}

impl FixedClock {
    /// Creates a clock frozen at `now`.
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Moves the clock to `now`.
    pub fn set(&self, now: DateTime<FixedOffset>) {
        *self.now.write().unwrap_or_else(|e| e.into_inner()) = now;
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn berlin(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        reference_offset()
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
    }

    #[test]
    fn parses_dates() {
        assert_eq!(
            parse_date("2016-12-27").unwrap(),
            NaiveDate::from_ymd_opt(2016, 12, 27).unwrap()
        );
        assert!(matches!(
            parse_date("27.12.2016"),
            Err(TimeParseError::Date { .. })
        ));
    }

    #[test]
    fn parses_timestamps_with_offset() {
        let dt = parse_datetime("2016-12-27T11:00:00+01:00").unwrap();
        assert_eq!(dt, berlin(2016, 12, 27, 11, 0));
        assert_eq!(dt.offset().local_minus_utc(), 3600);
        assert!(parse_datetime("2016-12-27 11:00").is_err());
    }

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration("00:30").unwrap(), Duration::minutes(30));
        assert_eq!(parse_duration("01:30").unwrap(), Duration::minutes(90));
        assert_eq!(parse_duration("25:00").unwrap(), Duration::hours(25));
    }

    #[test]
    fn rejects_bad_durations() {
        for value in ["", "30", "aa:bb", "01:60", "-1:00", "01:30:00"] {
            assert!(
                matches!(parse_duration(value), Err(TimeParseError::Duration { .. })),
                "{value:?} should be rejected"
            );
        }
    }

    #[test]
    fn parses_offsets() {
        assert_eq!(parse_offset("+01:00").unwrap().local_minus_utc(), 3600);
        assert_eq!(parse_offset("-05:30").unwrap().local_minus_utc(), -19_800);
        assert!(parse_offset("01:00").is_err());
        assert!(parse_offset("+25:00").is_err());
    }

    #[test]
    fn formats_hhmm() {
        assert_eq!(format_hhmm(Duration::minutes(30)), "00:30");
        assert_eq!(format_hhmm(Duration::minutes(135)), "02:15");
        assert_eq!(format_hhmm(Duration::minutes(-5)), "00:00");
    }

    #[test]
    fn humanizes_durations() {
        assert_eq!(humanize_duration(Duration::minutes(15)), "15 minutes");
        assert_eq!(
            humanize_duration(Duration::seconds(14 * 60 + 30)),
            "14 minutes 30 seconds"
        );
        assert_eq!(
            humanize_duration(Duration::seconds(3600 + 60 + 1)),
            "1 hour 1 minute 1 second"
        );
        assert_eq!(humanize_duration(Duration::days(2)), "2 days");
        assert_eq!(humanize_duration(Duration::zero()), "0 seconds");
        assert_eq!(humanize_duration(Duration::minutes(-3)), "0 seconds");
    }

    #[test]
    fn system_clock_pins_date_but_keeps_time_of_day() {
        let fake = NaiveDate::from_ymd_opt(2016, 12, 27).unwrap();
        let clock = SystemClock::default().with_fake_date(Some(fake));

        let now = clock.now();
        let real = Utc::now().with_timezone(&reference_offset());

        assert_eq!(now.date_naive(), fake);
        assert_eq!(clock.today(), fake);
        assert_eq!(now.offset().local_minus_utc(), REFERENCE_OFFSET_SECS);
        // Same wall-clock hour, give or take a rollover between the two reads.
        assert!(now.hour() == real.hour() || real.minute() == 0);
    }

    #[test]
    fn system_clock_without_fake_date_follows_real_date() {
        let clock = SystemClock::new(FixedOffset::east_opt(0).unwrap());
        assert!(clock.fake_date().is_none());
        assert_eq!(clock.offset().local_minus_utc(), 0);
        let delta = (clock.now().with_timezone(&Utc) - Utc::now()).num_seconds();
        assert!(delta.abs() <= 1);
    }

    #[test]
    fn fixed_clock_moves_only_when_told() {
        let start = berlin(2016, 12, 27, 10, 0);
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::minutes(5));
        assert_eq!(clock.now(), berlin(2016, 12, 27, 10, 5));

        clock.set(berlin(2016, 12, 28, 9, 0));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2016, 12, 28).unwrap());
    }
}
