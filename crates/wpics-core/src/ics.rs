//! iCalendar (RFC 5545) rendering of the event feed.
//!
//! The encoder is deterministic: the same ordered events and metadata always
//! produce the same bytes, and therefore the same [`Fingerprint`].

use std::fmt;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use icalendar::{Calendar, Component, EventLike, Property, ValueType};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::event::Event;

/// SHA-256 digest of a rendered document.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Computes the fingerprint of the given bytes.
    pub fn of(bytes: &[u8]) -> Self {
        let mut digest = [0; 32];
        digest.copy_from_slice(&Sha256::digest(bytes));
        Self(digest)
    }

    /// The all-zero fingerprint used before anything was published.
    pub fn zero() -> Self {
        Self([0; 32])
    }

    /// Returns true for the all-zero fingerprint.
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 32]
    }

    /// Returns the raw digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the hex-encoded digest.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

/// A rendered calendar together with its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDocument {
    content: String,
    fingerprint: Fingerprint,
}

impl CalendarDocument {
    /// Wraps already rendered content, computing its fingerprint.
    pub fn from_content(content: impl Into<String>) -> Self {
        let content = content.into();
        let fingerprint = Fingerprint::of(content.as_bytes());
        Self {
            content,
            fingerprint,
        }
    }

    /// The empty document with the zero fingerprint.
    pub fn empty() -> Self {
        Self {
            content: String::new(),
            fingerprint: Fingerprint::zero(),
        }
    }

    /// Returns the rendered text.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the rendered bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.content.as_bytes()
    }

    /// Returns the fingerprint of the rendered bytes.
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Returns true if nothing was rendered.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// The organizer written into every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organizer {
    /// Common name.
    pub name: String,
    /// Mail address, without the `mailto:` prefix.
    pub email: String,
}

/// Fixed, deployment-level values of the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarMeta {
    /// `PRODID` of the calendar.
    pub product_id: String,
    /// Calendar display name.
    pub name: String,
    /// Calendar description.
    pub description: String,
    /// Stable calendar relation id (`X-WR-RELCALID`).
    pub relation_id: String,
    /// Suggested polling interval for subscribers (`X-WR-PUBLISHED-TTL`).
    pub published_ttl: String,
    /// IANA timezone name advertised in `X-WR-TIMEZONE`.
    pub timezone: String,
    /// Event color.
    pub color: String,
    /// Per-event `REFRESH-INTERVAL` duration.
    pub refresh_interval: String,
    /// Optional organizer.
    pub organizer: Option<Organizer>,
}

impl Default for CalendarMeta {
    fn default() -> Self {
        Self {
            product_id: "-//wp-ics-gen//events//EN".to_string(),
            name: "Events".to_string(),
            description: "Upcoming events".to_string(),
            relation_id: "f4bd341e-d8ea-11ef-b96e-3b8bd9e2b02f".to_string(),
            published_ttl: "PT1H".to_string(),
            timezone: "Europe/Berlin".to_string(),
            color: "GREEN".to_string(),
            refresh_interval: "P4D".to_string(),
            organizer: None,
        }
    }
}

impl CalendarMeta {
    /// Builder: set the advertised timezone.
    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.timezone = tz.name().to_string();
        self
    }

    /// Builder: set the organizer.
    pub fn with_organizer(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.organizer = Some(Organizer {
            name: name.into(),
            email: email.into(),
        });
        self
    }
}

/// Renders events, in the given order, into one calendar document.
///
/// Timed boundaries are written in UTC, so the document never references a
/// `TZID` it does not define. All-day boundaries stay floating dates.
pub fn encode(events: &[Event], meta: &CalendarMeta) -> CalendarDocument {
    let mut calendar = Calendar::empty();
    calendar
        .append_property(("VERSION", "2.0"))
        .append_property(Property::new("PRODID", single_line(&meta.product_id)))
        .append_property(("CALSCALE", "GREGORIAN"))
        .append_property(Property::new("NAME", single_line(&meta.name)))
        .append_property(Property::new("X-WR-CALNAME", single_line(&meta.name)))
        .append_property(Property::new("X-WR-RELCALID", single_line(&meta.relation_id)))
        .append_property(Property::new("X-WR-PUBLISHED-TTL", single_line(&meta.published_ttl)))
        .append_property(Property::new("X-WR-TIMEZONE", single_line(&meta.timezone)))
        .append_property(Property::new("X-WR-CALDESC", single_line(&meta.description)));

    for event in events {
        calendar.push(build_event(event, meta));
    }

    let content = calendar.done().to_string();
    debug_assert!(
        content.split("\r\n").all(|line| !line.contains(['\r', '\n'])),
        "line break inside a content line"
    );
    CalendarDocument::from_content(content)
}

// Properties of a VEVENT are serialized sorted by name.
fn build_event(event: &Event, meta: &CalendarMeta) -> icalendar::Event {
    let mut ics_event = icalendar::Event::new();
    ics_event
        .uid(&event.guid)
        .add_property("METHOD", "PUBLISH")
        .add_property("STATUS", "CONFIRMED")
        .add_property("COLOR", single_line(&meta.color))
        .add_property("DTSTAMP", utc_stamp(&event.created));

    if event.all_day {
        ics_event.append_property(date_property("DTSTART", &event.from_date));
        if let Some(end) = event.end_boundary() {
            ics_event.append_property(date_property("DTEND", end));
        }
    } else {
        ics_event.add_property("DTSTART", utc_stamp(&event.from_date));
        if let Some(end) = event.end_boundary() {
            ics_event.add_property("DTEND", utc_stamp(end));
        }
    }

    if event.location.is_present() {
        let location = format!("{}, {}", event.location.name, event.location.description);
        ics_event.location(&unix_newlines(&location));
    }

    ics_event
        .summary(&unix_newlines(&event.title))
        .description(&unix_newlines(&event.excerpt))
        .add_property("URL", single_line(&event.url))
        .add_property("LAST-MODIFIED", utc_stamp(&event.modified))
        .add_property("X-MICROSOFT-CDO-ALLDAYEVENT", if event.all_day { "TRUE" } else { "FALSE" })
        .add_property("X-MICROSOFT-CDO-INTENDEDSTATUS", "FREE")
        .append_property(
            Property::new("REFRESH-INTERVAL", single_line(&meta.refresh_interval))
                .append_parameter(("VALUE", "DURATION"))
                .done(),
        );

    if let Some(organizer) = &meta.organizer {
        // The writer quotes values holding ':' or ';' itself.
        let name = single_line(&organizer.name).replace('"', "");
        let cn = if name.contains(',') && !name.contains([':', ';']) {
            format!("\"{name}\"")
        } else {
            name
        };
        let mut prop = Property::new(
            "ORGANIZER",
            format!("mailto:{}", single_line(&organizer.email)),
        );
        prop.add_parameter("CN", &cn);
        ics_event.append_property(prop);
    }

    ics_event.done()
}

fn date_property(name: &str, dt: &DateTime<Tz>) -> Property {
    let mut prop = Property::new(name, dt.format("%Y%m%d").to_string());
    prop.append_parameter(ValueType::Date);
    prop
}

// TEXT values are escaped by the writer, which only knows `\n`.
fn unix_newlines(value: &str) -> String {
    value.replace("\r\n", "\n").replace('\r', "\n")
}

// Values the writer emits verbatim must not break the content line.
fn single_line(value: &str) -> String {
    value.chars().filter(|c| !matches!(c, '\r' | '\n')).collect()
}

fn utc_stamp(dt: &DateTime<Tz>) -> String {
    dt.with_timezone(&Utc).format("%Y%m%dT%H%M%SZ").to_string()
}
