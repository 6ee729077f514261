//! Typed view of the WordPress event records.
//!
//! [`RawRecord`] keeps every field optional: the content API omits fields,
//! sends `false` for unset custom fields and an empty array instead of an
//! object when a post has no custom fields at all. Presence checks happen in
//! the normalizer, not during deserialization.

use serde::Deserialize;
use serde_json::Value;
use wpics_core::EventLocation;

use crate::error::{ParseError, ParseResult};
use crate::fetch::Record;

/// Taxonomy name of the location terms.
pub const LOCATION_TAXONOMY: &str = "eventloc";

/// A `{ "rendered": "..." }` wrapper as used for title, content and excerpt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Rendered {
    /// The rendered HTML.
    #[serde(default)]
    pub rendered: String,
}

/// A taxonomy relation from `_links["wp:term"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawTerm {
    /// Taxonomy name, e.g. `eventloc`.
    #[serde(default)]
    pub taxonomy: Option<String>,
    /// URL listing the terms of this taxonomy for the post.
    #[serde(default)]
    pub href: Option<String>,
}

/// The `_links` block of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawLinks {
    /// Taxonomy relations.
    #[serde(rename = "wp:term", default)]
    pub terms: Vec<RawTerm>,
}

/// An event post as returned by the content API.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawRecord {
    /// Numeric post id.
    #[serde(default)]
    pub id: Option<i64>,
    /// Publication status, `publish` for live posts.
    #[serde(default)]
    pub status: Option<String>,
    /// Post type, `events` for event posts.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Creation time, `%Y-%m-%dT%H:%M:%S` local time.
    #[serde(default)]
    pub date: Option<String>,
    /// Modification time, same layout as `date`.
    #[serde(default)]
    pub modified: Option<String>,
    /// Canonical link to the post.
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub title: Option<Rendered>,
    #[serde(default)]
    pub content: Option<Rendered>,
    #[serde(default)]
    pub excerpt: Option<Rendered>,
    /// Custom fields block. An object, or `[]`/`false` when empty.
    #[serde(default)]
    pub acf: Option<Value>,
    #[serde(rename = "_links", default)]
    pub links: Option<RawLinks>,
}

impl RawRecord {
    /// Deserializes a loosely-typed record.
    pub fn from_record(record: &Record) -> ParseResult<Self> {
        serde_json::from_value(Value::Object(record.clone()))
            .map_err(|e| ParseError::Malformed(e.to_string()))
    }

    /// Returns a non-empty string custom field.
    ///
    /// Fields that are absent, empty, or not strings (WordPress writes `false`
    /// for unset date pickers) yield `None`.
    pub fn custom_field(&self, name: &str) -> Option<&str> {
        self.acf
            .as_ref()?
            .as_object()?
            .get(name)?
            .as_str()
            .filter(|value| !value.trim().is_empty())
    }

    /// Returns true if the record is a published event post.
    pub fn is_published_event(&self) -> bool {
        self.status.as_deref() == Some("publish") && self.kind.as_deref() == Some("events")
    }

    /// Returns the href of the first location relation, if any.
    pub fn location_href(&self) -> Option<&str> {
        self.links
            .as_ref()?
            .terms
            .iter()
            .find(|term| term.taxonomy.as_deref() == Some(LOCATION_TAXONOMY))?
            .href
            .as_deref()
    }

    /// Returns the rendered title, or an empty string.
    pub fn title_html(&self) -> &str {
        rendered_or_empty(self.title.as_ref())
    }

    /// Returns the rendered content, or an empty string.
    pub fn content_html(&self) -> &str {
        rendered_or_empty(self.content.as_ref())
    }

    /// Returns the rendered excerpt, or an empty string.
    pub fn excerpt_html(&self) -> &str {
        rendered_or_empty(self.excerpt.as_ref())
    }
}

fn rendered_or_empty(field: Option<&Rendered>) -> &str {
    field.map(|r| r.rendered.as_str()).unwrap_or_default()
}

/// A location term as returned by the taxonomy endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawLocationRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl RawLocationRecord {
    /// Deserializes a loosely-typed location record.
    pub fn from_record(record: &Record) -> ParseResult<Self> {
        serde_json::from_value(Value::Object(record.clone()))
            .map_err(|e| ParseError::Malformed(e.to_string()))
    }

    /// Converts into an [`EventLocation`].
    ///
    /// Entities in the name are decoded; a missing id yields the absent
    /// location.
    pub fn into_location(self) -> EventLocation {
        EventLocation::new(
            self.id.unwrap_or_default(),
            wpics_core::decode_entities(self.name.as_deref().unwrap_or_default()),
            wpics_core::decode_entities(self.description.as_deref().unwrap_or_default()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn deserializes_event_post() {
        let raw = RawRecord::from_record(&record(json!({
            "id": 4711,
            "date": "2025-05-01T09:30:00",
            "modified": "2025-05-02T10:00:00",
            "status": "publish",
            "type": "events",
            "link": "https://example.org/events/sommerfest/",
            "title": {"rendered": "Sommerfest &#8211; 2025"},
            "content": {"rendered": "<p>Body</p>", "protected": false},
            "excerpt": {"rendered": "<p>Short</p>"},
            "acf": {"from_date": "2025-06-01 00:00:00", "to_date": "2025-06-03 00:00:00"},
            "_links": {
                "self": [{"href": "https://example.org/wp-json/wp/v2/events/4711"}],
                "wp:term": [
                    {"taxonomy": "eventcat", "embeddable": true, "href": "https://example.org/cat"},
                    {"taxonomy": "eventloc", "embeddable": true, "href": "https://example.org/loc"}
                ]
            }
        })))
        .unwrap();

        assert_eq!(raw.id, Some(4711));
        assert!(raw.is_published_event());
        assert_eq!(raw.custom_field("from_date"), Some("2025-06-01 00:00:00"));
        assert_eq!(raw.custom_field("to_date"), Some("2025-06-03 00:00:00"));
        assert_eq!(raw.location_href(), Some("https://example.org/loc"));
        assert_eq!(raw.title_html(), "Sommerfest &#8211; 2025");
        assert_eq!(raw.content_html(), "<p>Body</p>");
    }

    #[test]
    fn empty_acf_forms() {
        let as_array = RawRecord::from_record(&record(json!({"acf": []}))).unwrap();
        assert!(as_array.custom_field("from_date").is_none());

        let unset = RawRecord::from_record(&record(json!({"acf": {"from_date": false}}))).unwrap();
        assert!(unset.custom_field("from_date").is_none());

        let blank = RawRecord::from_record(&record(json!({"acf": {"from_date": " "}}))).unwrap();
        assert!(blank.custom_field("from_date").is_none());

        let missing = RawRecord::from_record(&record(json!({}))).unwrap();
        assert!(missing.custom_field("from_date").is_none());
    }

    #[test]
    fn missing_text_fields_default_to_empty() {
        let raw = RawRecord::from_record(&record(json!({"id": 1}))).unwrap();
        assert_eq!(raw.title_html(), "");
        assert_eq!(raw.excerpt_html(), "");
        assert!(raw.link.is_none());
        assert!(raw.location_href().is_none());
    }

    #[test]
    fn status_and_type_must_match_exactly() {
        let draft = RawRecord::from_record(&record(json!({"status": "draft", "type": "events"})))
            .unwrap();
        assert!(!draft.is_published_event());

        let page = RawRecord::from_record(&record(json!({"status": "publish", "type": "page"})))
            .unwrap();
        assert!(!page.is_published_event());
    }

    #[test]
    fn wrong_field_type_is_malformed() {
        let err = RawRecord::from_record(&record(json!({"id": "seven"}))).unwrap_err();
        assert!(matches!(err, ParseError::Malformed(_)));
    }

    #[test]
    fn location_record_conversion() {
        let location = RawLocationRecord::from_record(&record(json!({
            "id": 12,
            "count": 4,
            "name": "Town hall &amp; square",
            "description": "Market 1, Springfield",
            "taxonomy": "eventloc"
        })))
        .unwrap()
        .into_location();

        assert_eq!(location.id, 12);
        assert_eq!(location.name, "Town hall & square");
        assert_eq!(location.description, "Market 1, Springfield");
        assert!(location.is_present());

        let nameless = RawLocationRecord::default().into_location();
        assert!(!nameless.is_present());
    }
}
