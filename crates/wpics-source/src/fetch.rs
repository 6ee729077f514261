//! Remote record fetching.
//!
//! This module defines the [`RemoteFetcher`] trait, the seam between the
//! pipeline and the content API, together with two implementations:
//! - [`HttpFetcher`]: a single GET via `reqwest`, body parsed as a JSON array
//! - `StaticFetcher`: canned responses keyed by URL, built for tests or with
//!   the `test-util` feature

#[cfg(any(test, feature = "test-util"))]
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
#[cfg(any(test, feature = "test-util"))]
use std::sync::Mutex;

use reqwest::Client;
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::error::{FetchError, FetchResult};

/// A loosely-typed source record: one JSON object of the response array.
pub type Record = Map<String, Value>;

/// A boxed future for async trait methods.
///
/// Boxed futures keep the trait object-safe, so fetchers can be shared as
/// `Arc<dyn RemoteFetcher>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Default user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("wp-ics-gen/", env!("CARGO_PKG_VERSION"));

/// Retrieves the records behind a URL.
///
/// Implementations perform one request per call, without retry or pagination.
/// The whole response must be a JSON array of objects.
pub trait RemoteFetcher: Send + Sync {
    /// Fetches and decodes the records at `url`.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] on network failure, non-success status, or a
    /// body that is not a JSON array of objects.
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, FetchResult<Vec<Record>>>;
}

/// Decodes a JSON value into records.
///
/// # Errors
///
/// Fails unless the value is an array whose elements are all objects.
pub fn records_from_value(value: Value) -> FetchResult<Vec<Record>> {
    let Value::Array(items) = value else {
        return Err(FetchError::invalid_body("expected a JSON array"));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(record) => Ok(record),
            _ => Err(FetchError::invalid_body(format!(
                "element {} is not a JSON object",
                index
            ))),
        })
        .collect()
}

/// Fetches records over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher with the default user agent.
    pub fn new() -> FetchResult<Self> {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    /// Creates a fetcher with a custom user agent.
    pub fn with_user_agent(user_agent: &str) -> FetchResult<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                FetchError::client(format!("Failed to create HTTP client: {}", e)).with_source(e)
            })?;
        Ok(Self { client })
    }

    /// Performs the GET request and decodes the body.
    pub async fn get_records(&self, url: &str) -> FetchResult<Vec<Record>> {
        trace!(url = %url, "Sending request");

        let response = self.client.get(url).send().await.map_err(|e| {
            FetchError::network(format!("Request failed: {}", e))
                .with_url(url)
                .with_source(e)
        })?;

        let status = response.status();
        trace!(status = %status, "Received response");
        if !status.is_success() {
            warn!(url = %url, status = %status, "Unexpected response status");
            return Err(
                FetchError::http_status(status.as_u16(), format!("Unexpected status {}", status))
                    .with_url(url),
            );
        }

        let body = response.bytes().await.map_err(|e| {
            FetchError::network(format!("Failed to read response: {}", e))
                .with_url(url)
                .with_source(e)
        })?;

        let value: Value = serde_json::from_slice(&body).map_err(|e| {
            FetchError::invalid_body(format!("Response is not JSON: {}", e))
                .with_url(url)
                .with_source(e)
        })?;

        let records = records_from_value(value).map_err(|e| e.with_url(url))?;
        debug!(url = %url, records = records.len(), "Fetched records");
        Ok(records)
    }
}

impl RemoteFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, FetchResult<Vec<Record>>> {
        Box::pin(self.get_records(url))
    }
}

#[cfg(any(test, feature = "test-util"))]
enum Canned {
    Records(Vec<Record>),
    Failure(u16),
    Invalid(String),
}

/// A fetcher that serves canned responses keyed by URL.
///
/// Unknown URLs answer like a 404. Every call is recorded, so callers can
/// assert how often a URL was requested.
#[cfg(any(test, feature = "test-util"))]
#[derive(Default)]
pub struct StaticFetcher {
    responses: Mutex<HashMap<String, Canned>>,
    calls: Mutex<Vec<String>>,
}

#[cfg(any(test, feature = "test-util"))]
impl StaticFetcher {
    /// Creates a fetcher without any responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: serve `value` (a JSON array of objects) for `url`.
    ///
    /// Any other value is answered like an invalid body.
    pub fn with_json(self, url: impl Into<String>, value: Value) -> Self {
        self.set_json(url, value);
        self
    }

    /// Builder: answer `url` with the given HTTP status.
    pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
        self.set_status(url, status);
        self
    }

    /// Replaces the response for `url`.
    pub fn set_json(&self, url: impl Into<String>, value: Value) {
        let canned = match records_from_value(value) {
            Ok(records) => Canned::Records(records),
            Err(e) => Canned::Invalid(e.message().to_string()),
        };
        self.lock_responses().insert(url.into(), canned);
    }

    /// Replaces the response for `url` with an HTTP failure.
    pub fn set_status(&self, url: impl Into<String>, status: u16) {
        self.lock_responses()
            .insert(url.into(), Canned::Failure(status));
    }

    /// Returns how often `url` was fetched.
    pub fn call_count(&self, url: &str) -> usize {
        self.lock_calls().iter().filter(|u| *u == url).count()
    }

    /// Returns the total number of fetches.
    pub fn total_calls(&self) -> usize {
        self.lock_calls().len()
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, HashMap<String, Canned>> {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn respond(&self, url: &str) -> FetchResult<Vec<Record>> {
        self.lock_calls().push(url.to_string());
        match self.lock_responses().get(url) {
            Some(Canned::Records(records)) => Ok(records.clone()),
            Some(Canned::Failure(status)) => {
                Err(FetchError::http_status(*status, format!("Unexpected status {}", status))
                    .with_url(url))
            }
            Some(Canned::Invalid(message)) => {
                Err(FetchError::invalid_body(message.clone()).with_url(url))
            }
            None => Err(FetchError::http_status(404, "Unexpected status 404").with_url(url)),
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
impl RemoteFetcher for StaticFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, FetchResult<Vec<Record>>> {
        let result = self.respond(url);
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchErrorCode;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn records_from_value_accepts_array_of_objects() {
        let records = records_from_value(json!([{"id": 1}, {"id": 2}])).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["id"], json!(2));
    }

    #[test]
    fn records_from_value_rejects_other_shapes() {
        let err = records_from_value(json!({"id": 1})).unwrap_err();
        assert_eq!(err.code(), FetchErrorCode::InvalidBody);

        let err = records_from_value(json!([{"id": 1}, 3])).unwrap_err();
        assert_eq!(err.code(), FetchErrorCode::InvalidBody);
        assert!(err.message().contains("element 1"));
    }

    #[tokio::test]
    async fn http_fetcher_decodes_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/events"))
            .and(header("user-agent", DEFAULT_USER_AGENT))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"[{"id": 10, "status": "publish"}, {"id": 11}]"#),
            )
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let url = format!("{}/wp-json/wp/v2/events", server.uri());
        let records = fetcher.fetch(&url).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["status"], json!("publish"));
    }

    #[tokio::test]
    async fn http_fetcher_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let url = format!("{}/events", server.uri());
        let err = fetcher.fetch(&url).await.unwrap_err();

        assert_eq!(err.code(), FetchErrorCode::HttpStatus);
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.url(), Some(url.as_str()));
    }

    #[tokio::test]
    async fn http_fetcher_rejects_non_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher
            .fetch(&format!("{}/events", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), FetchErrorCode::InvalidBody);
    }

    #[tokio::test]
    async fn http_fetcher_rejects_object_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"code": "rest_no_route"}"#),
            )
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher
            .fetch(&format!("{}/events", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), FetchErrorCode::InvalidBody);
    }

    #[tokio::test]
    async fn http_fetcher_network_failure() {
        let fetcher = HttpFetcher::new().unwrap();
        // Port 9 (discard) on localhost is not expected to accept connections.
        let err = fetcher.fetch("http://127.0.0.1:9/events").await.unwrap_err();
        assert_eq!(err.code(), FetchErrorCode::Network);
    }

    #[tokio::test]
    async fn static_fetcher_serves_and_counts() {
        let fetcher = StaticFetcher::new()
            .with_json("mem://events", json!([{"id": 1}]))
            .with_status("mem://broken", 503);

        assert_eq!(fetcher.fetch("mem://events").await.unwrap().len(), 1);
        assert_eq!(
            fetcher.fetch("mem://broken").await.unwrap_err().status(),
            Some(503)
        );
        assert_eq!(
            fetcher.fetch("mem://missing").await.unwrap_err().status(),
            Some(404)
        );

        fetcher.set_json("mem://events", json!([]));
        assert!(fetcher.fetch("mem://events").await.unwrap().is_empty());

        assert_eq!(fetcher.call_count("mem://events"), 2);
        assert_eq!(fetcher.total_calls(), 4);
    }

    #[tokio::test]
    async fn static_fetcher_invalid_canned_body() {
        let fetcher = StaticFetcher::new().with_json("mem://events", json!({"id": 1}));

        let err = fetcher.fetch("mem://events").await.unwrap_err();
        assert_eq!(err.code(), FetchErrorCode::InvalidBody);
        assert_eq!(err.url(), Some("mem://events"));
    }
}
