//! Server configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use url::Url;
use wpics_core::CalendarMeta;

use crate::error::{ServerError, ServerResult};
use crate::routes::PageSettings;

/// Name of the snapshot file inside the working directory.
pub const SNAPSHOT_FILE_NAME: &str = "events.ics";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// URL of the events collection.
    pub events_url: String,

    /// Public base URL, used for the links on the landing page.
    pub base_url: Option<Url>,

    /// Interval between pipeline runs.
    pub check_interval: Duration,

    /// Directory holding the snapshot file.
    pub working_dir: PathBuf,

    /// Address the HTTP server listens on.
    pub address: SocketAddr,

    /// Timezone the source timestamps are written in.
    pub timezone: Tz,

    /// Fixed calendar values.
    pub calendar: CalendarMeta,

    /// Landing page texts.
    pub page: PageSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            events_url: String::new(),
            base_url: None,
            check_interval: Duration::from_secs(300), // 5 minutes
            working_dir: PathBuf::from("."),
            address: SocketAddr::from(([0, 0, 0, 0], 80)),
            timezone: chrono_tz::Europe::Berlin,
            calendar: CalendarMeta::default(),
            page: PageSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Creates a new configuration for the given events URL.
    pub fn new(events_url: impl Into<String>) -> Self {
        Self {
            events_url: events_url.into(),
            ..Default::default()
        }
    }

    /// Builder: set the public base URL.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Builder: set the check interval.
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Builder: set the working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Builder: set the listen address.
    pub fn with_address(mut self, address: SocketAddr) -> Self {
        self.address = address;
        self
    }

    /// Builder: set the source timezone.
    ///
    /// The advertised calendar timezone follows.
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self.calendar = self.calendar.with_timezone(timezone);
        self
    }

    /// Builder: set the calendar values.
    pub fn with_calendar(mut self, calendar: CalendarMeta) -> Self {
        self.calendar = calendar;
        self
    }

    /// Builder: set the landing page texts.
    pub fn with_page(mut self, page: PageSettings) -> Self {
        self.page = page;
        self
    }

    /// Returns the snapshot file path.
    pub fn snapshot_path(&self) -> PathBuf {
        snapshot_path(&self.working_dir)
    }

    /// Checks the values that cannot be defaulted.
    pub fn validate(&self) -> ServerResult<()> {
        if self.events_url.trim().is_empty() {
            return Err(ServerError::config("events URL is not set"));
        }
        if self.check_interval.is_zero() {
            return Err(ServerError::config("check interval must be greater than zero"));
        }
        Ok(())
    }
}

/// Returns the snapshot path inside `working_dir`.
pub fn snapshot_path(working_dir: &Path) -> PathBuf {
    working_dir.join(SNAPSHOT_FILE_NAME)
}
