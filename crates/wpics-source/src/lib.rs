//! Remote source: record fetching, typed raw records and normalization.
//!
//! - [`RemoteFetcher`] - The seam to the content API ([`HttpFetcher`] in production)
//! - [`RawRecord`] - Typed, all-optional view of one event post
//! - [`Normalizer`] - Turns records into [`wpics_core::Event`]s, resolving venues
//! - [`FetchError`] / [`ParseError`] - Run-level and record-level failures
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  WordPress API  │◀──────────────┐
//! └────────┬────────┘               │ location href
//!          │ JSON array             │
//!          ▼                        │
//! ┌─────────────────┐      ┌────────┴────────┐
//! │   RawRecord     │─────▶│  LocationCache  │
//! └────────┬────────┘      └─────────────────┘
//!          │ normalize()
//!          ▼
//!   ┌─────────────┐
//!   │    Event    │
//!   └─────────────┘
//! ```

pub mod error;
pub mod fetch;
pub mod location;
pub mod normalize;
pub mod raw_record;

pub use error::{FetchError, FetchErrorCode, FetchResult, ParseError, ParseResult};
#[cfg(any(test, feature = "test-util"))]
pub use fetch::StaticFetcher;
pub use fetch::{
    BoxFuture, DEFAULT_USER_AGENT, HttpFetcher, Record, RemoteFetcher, records_from_value,
};
pub use location::LocationCache;
pub use normalize::{DEFAULT_TIMEZONE, ENTRY_LAYOUT, EVENT_LAYOUT, Normalizer, parse_local};
pub use raw_record::{RawLocationRecord, RawRecord};
