//! Event types for the calendar feed.
//!
//! This module provides the normalized representation of a source record:
//! - [`Event`]: a single calendar entry, built once per pipeline run
//! - [`EventLocation`]: a resolved venue, shared between events

use std::sync::Arc;

use chrono::{DateTime, Timelike};
use chrono_tz::Tz;
use sha2::{Digest, Sha256};

/// A resolved event venue.
///
/// An id of `0` is the absent location; events carrying it emit no
/// `LOCATION` line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLocation {
    /// Source identifier of the location term.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Free-form description (usually the street address).
    pub description: String,
}

impl EventLocation {
    /// Creates a new location.
    pub fn new(id: i64, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
        }
    }

    /// Returns the absent location.
    pub fn absent() -> Self {
        Self::default()
    }

    /// Returns true if this location refers to a real venue.
    pub fn is_present(&self) -> bool {
        self.id != 0
    }
}

/// A normalized calendar event.
///
/// Events are immutable once built. `all_day` is derived from the event window
/// and recomputed whenever the window changes through the builder methods.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Numeric identifier of the source record.
    pub source_id: i64,
    /// Stable calendar UID derived from `source_id`.
    pub guid: String,
    /// Event title.
    pub title: String,
    /// Full body, markup stripped.
    pub content: String,
    /// Short body, markup stripped.
    pub excerpt: String,
    /// Canonical link to the event page.
    pub url: String,
    /// When the source record was created.
    pub created: DateTime<Tz>,
    /// When the source record was last modified.
    pub modified: DateTime<Tz>,
    /// Start of the event window.
    pub from_date: DateTime<Tz>,
    /// End of the event window. `None` when the source had no usable end.
    pub to_date: Option<DateTime<Tz>>,
    /// Whether both window boundaries fall on midnight.
    pub all_day: bool,
    /// Resolved venue, possibly absent.
    pub location: Arc<EventLocation>,
}

impl Event {
    /// Creates a new event with the required fields.
    ///
    /// `modified` starts out equal to `created` and the location is absent.
    pub fn new(
        source_id: i64,
        created: DateTime<Tz>,
        from_date: DateTime<Tz>,
        to_date: Option<DateTime<Tz>>,
    ) -> Self {
        Self {
            source_id,
            guid: event_guid(source_id),
            title: String::new(),
            content: String::new(),
            excerpt: String::new(),
            url: String::new(),
            created,
            modified: created,
            all_day: is_all_day_window(&from_date, to_date.as_ref()),
            from_date,
            to_date,
            location: Arc::new(EventLocation::absent()),
        }
    }

    /// Builder: set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Builder: set the full body.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Builder: set the short body.
    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = excerpt.into();
        self
    }

    /// Builder: set the canonical link.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Builder: set the modification timestamp.
    pub fn with_modified(mut self, modified: DateTime<Tz>) -> Self {
        self.modified = modified;
        self
    }

    /// Builder: set the venue.
    pub fn with_location(mut self, location: Arc<EventLocation>) -> Self {
        self.location = location;
        self
    }

    /// Returns the end boundary to render, if any.
    ///
    /// All-day events keep an end that is not before the start; timed events
    /// need an end strictly after the start.
    pub fn end_boundary(&self) -> Option<&DateTime<Tz>> {
        let to = self.to_date.as_ref()?;
        let keep = if self.all_day {
            *to >= self.from_date
        } else {
            *to > self.from_date
        };
        keep.then_some(to)
    }
}

/// Derives the calendar UID for a source record id.
///
/// The UID is the hex-encoded SHA-256 of the decimal id, so it only depends on
/// the id and is stable across runs and processes.
pub fn event_guid(source_id: i64) -> String {
    let digest = Sha256::digest(source_id.to_string().as_bytes());
    hex::encode(digest)
}

// A missing end counts as midnight.
fn is_all_day_window(from: &DateTime<Tz>, to: Option<&DateTime<Tz>>) -> bool {
    let at_midnight = |dt: &DateTime<Tz>| dt.hour() == 0 && dt.minute() == 0;
    at_midnight(from) && to.is_none_or(at_midnight)
}
