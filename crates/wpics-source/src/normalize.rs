//! Record to [`Event`] conversion.
//!
//! The normalization of one record:
//! 1. Drops anything that is not a published event post with a start date
//! 2. Parses the timestamps as wall-clock times in the configured timezone
//! 3. Resolves the venue through the [`LocationCache`]
//! 4. Strips markup from content and excerpt, decodes entities in the title
//!
//! A bad record is logged and skipped; it never fails the batch.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Offset, TimeDelta, TimeZone};
use chrono_tz::Tz;
use tracing::{debug, warn};
use wpics_core::{Event, EventLocation, decode_entities, strip_html};

use crate::error::{ParseError, ParseResult};
use crate::fetch::{Record, RemoteFetcher};
use crate::location::LocationCache;
use crate::raw_record::RawRecord;

/// Layout of the post timestamps (`date`, `modified`).
pub const ENTRY_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S";

/// Layout of the event window fields (`acf.from_date`, `acf.to_date`).
pub const EVENT_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// Timezone used when none is configured.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Berlin;

/// Converts fetched records into events.
pub struct Normalizer {
    timezone: Tz,
    locations: LocationCache,
}

impl Normalizer {
    /// Creates a normalizer that fetches locations through `fetcher`.
    pub fn new(fetcher: Arc<dyn RemoteFetcher>, timezone: Tz) -> Self {
        Self {
            timezone,
            locations: LocationCache::new(fetcher),
        }
    }

    /// Returns the timezone timestamps are interpreted in.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Returns the location cache.
    pub fn locations(&self) -> &LocationCache {
        &self.locations
    }

    /// Normalizes a batch, keeping the source order.
    pub async fn normalize(&self, records: &[Record]) -> Vec<Event> {
        let mut events = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            match self.normalize_record(record).await {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(e) => {
                    let id = record.get("id").map(ToString::to_string);
                    warn!(index, id = ?id, error = %e, "Dropping record");
                }
            }
        }
        debug!(
            records = records.len(),
            events = events.len(),
            "Normalized records"
        );
        events
    }

    /// Normalizes one record.
    ///
    /// Returns `Ok(None)` for records that are filtered out (drafts, other
    /// post types, no start date).
    pub async fn normalize_record(&self, record: &Record) -> ParseResult<Option<Event>> {
        let raw = RawRecord::from_record(record)?;

        if !raw.is_published_event() {
            debug!(
                id = ?raw.id,
                status = ?raw.status,
                kind = ?raw.kind,
                "Skipping record that is not a published event"
            );
            return Ok(None);
        }
        let Some(from_raw) = raw.custom_field("from_date") else {
            debug!(id = ?raw.id, "Skipping event without start date");
            return Ok(None);
        };

        let id = raw.id.ok_or(ParseError::MissingField("id"))?;
        let created_raw = raw
            .date
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or(ParseError::MissingField("date"))?;
        let created = parse_local("date", created_raw, ENTRY_LAYOUT, self.timezone)?;

        let modified = match raw.modified.as_deref() {
            Some(value) => parse_local("modified", value, ENTRY_LAYOUT, self.timezone)
                .unwrap_or_else(|e| {
                    debug!(id, error = %e, "Falling back to creation time");
                    created
                }),
            None => created,
        };

        let from_date = parse_local("acf.from_date", from_raw, EVENT_LAYOUT, self.timezone)?;
        let to_date = raw.custom_field("to_date").and_then(|value| {
            parse_local("acf.to_date", value, EVENT_LAYOUT, self.timezone)
                .inspect_err(|e| debug!(id, error = %e, "Ignoring end date"))
                .ok()
        });

        let location = match raw.location_href() {
            Some(href) => self.locations.resolve(href).await,
            None => Arc::new(EventLocation::absent()),
        };

        let event = Event::new(id, created, from_date, to_date)
            .with_modified(modified)
            .with_title(decode_entities(raw.title_html()))
            .with_content(strip_html(raw.content_html()))
            .with_excerpt(strip_html(raw.excerpt_html()))
            .with_url(raw.link.clone().unwrap_or_default())
            .with_location(location);

        Ok(Some(event))
    }
}

/// Parses a wall-clock timestamp in `timezone`.
///
/// Ambiguous times (DST fold) resolve to the earlier instant. Times inside a
/// DST gap keep the offset in effect before the gap, so `02:30` on the spring
/// forward day in Berlin becomes `03:30` CEST.
pub fn parse_local(
    field: &'static str,
    value: &str,
    layout: &'static str,
    timezone: Tz,
) -> ParseResult<DateTime<Tz>> {
    let naive = NaiveDateTime::parse_from_str(value, layout).map_err(|_| {
        ParseError::InvalidTimestamp {
            field,
            value: value.to_string(),
            layout,
        }
    })?;

    timezone
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            let before = timezone
                .from_local_datetime(&(naive - TimeDelta::days(1)))
                .earliest()?;
            let offset = i64::from(before.offset().fix().local_minus_utc());
            Some(timezone.from_utc_datetime(&(naive - TimeDelta::seconds(offset))))
        })
        .ok_or_else(|| ParseError::NonexistentLocalTime {
            field,
            value: value.to_string(),
            timezone: timezone.name().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;
    use chrono::{Timelike, Utc};
    use serde_json::{Value, json};

    const LOC_URL: &str = "mem://wp-json/wp/v2/eventloc?post=4711";

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn event_record(id: i64, from: &str, to: &str) -> Value {
        json!({
            "id": id,
            "date": "2025-05-01T09:30:00",
            "modified": "2025-05-02T10:15:00",
            "status": "publish",
            "type": "events",
            "link": format!("https://example.org/events/{id}/"),
            "title": {"rendered": "Sommerfest &#8211; 2025"},
            "content": {"rendered": "<p>Long</p><p>text</p>"},
            "excerpt": {"rendered": "<p>Hello</p><p>World</p>"},
            "acf": {"from_date": from, "to_date": to},
            "_links": {"wp:term": [{"taxonomy": "eventloc", "href": LOC_URL}]}
        })
    }

    fn normalizer(fetcher: Arc<StaticFetcher>) -> Normalizer {
        Normalizer::new(fetcher, DEFAULT_TIMEZONE)
    }

    fn with_location() -> Arc<StaticFetcher> {
        Arc::new(StaticFetcher::new().with_json(
            LOC_URL,
            json!([{"id": 3, "name": "Town hall", "description": "Market 1"}]),
        ))
    }

    #[tokio::test]
    async fn all_day_event_scenario() {
        let normalizer = normalizer(with_location());
        let events = normalizer
            .normalize(&[record(event_record(
                4711,
                "2025-06-01 00:00:00",
                "2025-06-03 00:00:00",
            ))])
            .await;

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert!(event.all_day);
        assert_eq!(event.from_date.format("%Y%m%d").to_string(), "20250601");
        assert_eq!(
            event.end_boundary().map(|d| d.format("%Y%m%d").to_string()),
            Some("20250603".to_string())
        );
        assert_eq!(event.guid, wpics_core::event_guid(4711));
        assert_eq!(event.title, "Sommerfest \u{2013} 2025");
        assert_eq!(event.excerpt, "Hello\nWorld");
        assert_eq!(event.content, "Long\ntext");
        assert_eq!(event.url, "https://example.org/events/4711/");
        assert_eq!(event.location.name, "Town hall");
        assert_eq!(event.modified.minute(), 15);
    }

    #[tokio::test]
    async fn filtered_records_yield_nothing() {
        let normalizer = normalizer(with_location());

        let mut draft = event_record(1, "2025-06-01 18:00:00", "");
        draft["status"] = json!("draft");
        let mut page = event_record(2, "2025-06-01 18:00:00", "");
        page["type"] = json!("page");
        let mut no_acf = event_record(3, "2025-06-01 18:00:00", "");
        no_acf["acf"] = json!([]);
        let mut no_from = event_record(4, "2025-06-01 18:00:00", "");
        no_from["acf"] = json!({"to_date": "2025-06-02 00:00:00"});

        let records: Vec<Record> = [draft, page, no_acf, no_from]
            .into_iter()
            .map(record)
            .collect();
        assert!(normalizer.normalize(&records).await.is_empty());
    }

    #[tokio::test]
    async fn draft_scenario_yields_no_event() {
        let normalizer = normalizer(with_location());
        let mut draft = event_record(1, "2025-06-01 00:00:00", "2025-06-03 00:00:00");
        draft["status"] = json!("draft");

        assert_eq!(normalizer.normalize_record(&record(draft)).await, Ok(None));
    }

    #[tokio::test]
    async fn invalid_records_are_dropped_not_fatal() {
        let normalizer = normalizer(with_location());

        let mut bad_created = event_record(1, "2025-06-01 18:00:00", "");
        bad_created["date"] = json!("01.05.2025");
        let bad_from = event_record(2, "tomorrow", "");
        let mut no_id = event_record(3, "2025-06-01 18:00:00", "");
        no_id.as_object_mut().unwrap().remove("id");
        let good = event_record(4, "2025-06-01 18:00:00", "2025-06-01 20:00:00");

        let records: Vec<Record> = [bad_created, bad_from, no_id, good]
            .into_iter()
            .map(record)
            .collect();
        let events = normalizer.normalize(&records).await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source_id, 4);
        assert!(!events[0].all_day);
    }

    #[tokio::test]
    async fn record_errors_are_typed() {
        let normalizer = normalizer(with_location());

        let mut no_id = event_record(3, "2025-06-01 18:00:00", "");
        no_id.as_object_mut().unwrap().remove("id");
        assert_eq!(
            normalizer.normalize_record(&record(no_id)).await,
            Err(ParseError::MissingField("id"))
        );

        let bad_from = event_record(2, "2025-06-01T18:00:00", "");
        assert!(matches!(
            normalizer.normalize_record(&record(bad_from)).await,
            Err(ParseError::InvalidTimestamp {
                field: "acf.from_date",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn bad_end_and_modified_fall_back() {
        let normalizer = normalizer(with_location());
        let mut value = event_record(5, "2025-06-01 00:00:00", "soon");
        value["modified"] = json!("never");

        let event = normalizer
            .normalize_record(&record(value))
            .await
            .unwrap()
            .unwrap();
        assert!(event.to_date.is_none());
        assert!(event.all_day);
        assert_eq!(event.modified, event.created);
    }

    #[tokio::test]
    async fn missing_optional_text_defaults_to_empty() {
        let normalizer = normalizer(with_location());
        let value = json!({
            "id": 9,
            "date": "2025-05-01T09:30:00",
            "status": "publish",
            "type": "events",
            "acf": {"from_date": "2025-06-01 18:00:00"}
        });

        let event = normalizer
            .normalize_record(&record(value))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.title, "");
        assert_eq!(event.excerpt, "");
        assert_eq!(event.url, "");
        assert!(!event.location.is_present());
    }

    #[tokio::test]
    async fn locations_are_fetched_once_per_reference() {
        let fetcher = with_location();
        let normalizer = normalizer(fetcher.clone());
        let records: Vec<Record> = (1..=3)
            .map(|id| record(event_record(id, "2025-06-01 18:00:00", "")))
            .collect();

        let events = normalizer.normalize(&records).await;
        assert_eq!(events.len(), 3);
        assert!(Arc::ptr_eq(&events[0].location, &events[2].location));
        assert_eq!(fetcher.call_count(LOC_URL), 1);
        assert_eq!(normalizer.locations().len().await, 1);

        normalizer.normalize(&records).await;
        assert_eq!(fetcher.call_count(LOC_URL), 1);
    }

    #[tokio::test]
    async fn location_failure_keeps_event() {
        let fetcher = Arc::new(StaticFetcher::new().with_status(LOC_URL, 500));
        let normalizer = normalizer(fetcher);

        let events = normalizer
            .normalize(&[record(event_record(1, "2025-06-01 18:00:00", ""))])
            .await;
        assert_eq!(events.len(), 1);
        assert!(!events[0].location.is_present());
    }

    #[tokio::test]
    async fn order_is_preserved() {
        let normalizer = normalizer(with_location());
        let records: Vec<Record> = [30, 10, 20]
            .into_iter()
            .map(|id| record(event_record(id, "2025-06-01 18:00:00", "")))
            .collect();

        let ids: Vec<i64> = normalizer
            .normalize(&records)
            .await
            .iter()
            .map(|e| e.source_id)
            .collect();
        assert_eq!(ids, vec![30, 10, 20]);
    }

    #[test]
    fn parse_local_uses_timezone() {
        let dt =
            parse_local("date", "2025-06-01T12:00:00", ENTRY_LAYOUT, DEFAULT_TIMEZONE).unwrap();
        // CEST is UTC+2.
        assert_eq!(dt.with_timezone(&Utc).hour(), 10);
    }

    #[test]
    fn parse_local_moves_dst_gap_forward() {
        // 2025-03-30 02:30 does not exist in Berlin; CET still applies.
        let dt = parse_local(
            "acf.from_date",
            "2025-03-30 02:30:00",
            EVENT_LAYOUT,
            DEFAULT_TIMEZONE,
        )
        .unwrap();
        assert_eq!(dt.with_timezone(&Utc).hour(), 1);
        assert_eq!(dt.with_timezone(&Utc).minute(), 30);
        assert_eq!(dt.format("%H:%M %Z").to_string(), "03:30 CEST");
    }

    #[tokio::test]
    async fn event_starting_in_dst_gap_is_kept() {
        let normalizer = normalizer(with_location());
        let events = normalizer
            .normalize(&[
                record(event_record(5, "2025-03-30 02:30:00", "2025-03-30 04:00:00")),
                record(event_record(6, "2025-03-30 01:00:00", "2025-03-30 02:15:00")),
            ])
            .await;

        assert_eq!(events.len(), 2);
        assert!(!events[0].all_day);
        assert_eq!(events[0].from_date.format("%H:%M").to_string(), "03:30");
        assert_eq!(
            events[1].end_boundary().map(|d| d.format("%H:%M").to_string()),
            Some("03:15".to_string())
        );
    }

    #[test]
    fn parse_local_resolves_fold_to_earliest() {
        // 2025-10-26 02:30 occurs twice in Berlin; the first is still CEST.
        let dt = parse_local(
            "acf.from_date",
            "2025-10-26 02:30:00",
            EVENT_LAYOUT,
            DEFAULT_TIMEZONE,
        )
        .unwrap();
        assert_eq!(dt.with_timezone(&Utc).hour(), 0);
    }
}
