//! Core types: events, text sanitizing, calendar encoding, tracing

pub mod event;
pub mod ics;
pub mod text;
pub mod tracing;

pub use event::{Event, EventLocation, event_guid};
pub use ics::{CalendarDocument, CalendarMeta, Fingerprint, Organizer, encode};
pub use text::{decode_entities, strip_html};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
