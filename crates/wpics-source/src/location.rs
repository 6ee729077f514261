//! Location resolution with a process-lifetime cache.
//!
//! Events reference their venue through a taxonomy URL. Each distinct URL is
//! fetched once; the result, including the absent location for an empty
//! response, is kept until the process exits. Failed fetches are not cached
//! and are retried on the next run.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};
use wpics_core::EventLocation;

use crate::error::FetchResult;
use crate::fetch::RemoteFetcher;
use crate::raw_record::RawLocationRecord;

/// Append-only cache of resolved locations keyed by reference URL.
pub struct LocationCache {
    fetcher: Arc<dyn RemoteFetcher>,
    entries: Mutex<HashMap<String, Arc<EventLocation>>>,
}

impl LocationCache {
    /// Creates an empty cache that resolves misses through `fetcher`.
    pub fn new(fetcher: Arc<dyn RemoteFetcher>) -> Self {
        Self {
            fetcher,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the location behind `href`, fetching it on a cache miss.
    ///
    /// A failed fetch yields the absent location and leaves the cache as is.
    pub async fn resolve(&self, href: &str) -> Arc<EventLocation> {
        // Held across the fetch so concurrent misses for one URL fetch once.
        let mut entries = self.entries.lock().await;
        if let Some(location) = entries.get(href) {
            return Arc::clone(location);
        }

        match self.fetch_location(href).await {
            Ok(location) => {
                debug!(href = %href, location_id = location.id, "Cached location");
                let location = Arc::new(location);
                entries.insert(href.to_string(), Arc::clone(&location));
                location
            }
            Err(e) => {
                warn!(href = %href, error = %e, "Failed to fetch location");
                Arc::new(EventLocation::absent())
            }
        }
    }

    /// Returns the number of cached locations.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns true if nothing is cached yet.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    async fn fetch_location(&self, href: &str) -> FetchResult<EventLocation> {
        let records = self.fetcher.fetch(href).await?;
        let Some(first) = records.first() else {
            return Ok(EventLocation::absent());
        };

        match RawLocationRecord::from_record(first) {
            Ok(raw) => Ok(raw.into_location()),
            Err(e) => {
                warn!(href = %href, error = %e, "Ignoring malformed location record");
                Ok(EventLocation::absent())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;
    use serde_json::json;

    const LOC_URL: &str = "mem://wp-json/wp/v2/eventloc?post=1";

    #[tokio::test]
    async fn resolves_and_caches() {
        let fetcher = Arc::new(StaticFetcher::new().with_json(
            LOC_URL,
            json!([{"id": 5, "name": "Town hall", "description": "Market 1"}]),
        ));
        let cache = LocationCache::new(fetcher.clone());
        assert!(cache.is_empty().await);

        let first = cache.resolve(LOC_URL).await;
        let second = cache.resolve(LOC_URL).await;

        assert_eq!(first.id, 5);
        assert_eq!(first.name, "Town hall");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fetcher.call_count(LOC_URL), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn empty_response_caches_absent_location() {
        let fetcher = Arc::new(StaticFetcher::new().with_json(LOC_URL, json!([])));
        let cache = LocationCache::new(fetcher.clone());

        assert!(!cache.resolve(LOC_URL).await.is_present());
        assert!(!cache.resolve(LOC_URL).await.is_present());
        assert_eq!(fetcher.call_count(LOC_URL), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let fetcher = Arc::new(StaticFetcher::new().with_status(LOC_URL, 500));
        let cache = LocationCache::new(fetcher.clone());

        assert!(!cache.resolve(LOC_URL).await.is_present());
        assert!(cache.is_empty().await);

        fetcher.set_json(LOC_URL, json!([{"id": 9, "name": "Park", "description": ""}]));
        assert_eq!(cache.resolve(LOC_URL).await.id, 9);
        assert_eq!(fetcher.call_count(LOC_URL), 2);
    }
}
