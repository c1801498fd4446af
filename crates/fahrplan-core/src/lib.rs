//! Core types: schedule model, decoding, diffing, time, message rendering

pub mod decode;
pub mod diff;
pub mod format;
pub mod model;
pub mod time;
pub mod tracing;

pub use decode::{DecodeError, DecodeResult, decode_document, decode_schedule};
pub use diff::{ScheduleDiff, diff_if_changed, diff_schedules};
pub use format::{Message, MessageKind, Urgency, format_short, format_summary, session_url};
pub use model::{Conference, Day, Person, Room, Schedule, Session, SessionId};
pub use time::{Clock, FixedClock, SystemClock, TimeParseError, humanize_duration};
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
