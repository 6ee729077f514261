//! The fetch, normalize, encode, detect and publish pipeline.
//!
//! [`Pipeline`] owns all state that outlives a single run: the location
//! cache inside the normalizer, the last published fingerprint and the
//! snapshot store. Runs are serialized by a run lock.

use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use wpics_core::{CalendarDocument, CalendarMeta, Fingerprint, encode};
use wpics_source::{FetchResult, Normalizer, RemoteFetcher};

use crate::config::ServerConfig;
use crate::detector::ChangeDetector;
use crate::mailbox::MailboxSender;
use crate::snapshot::SnapshotStore;

/// What a pipeline run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A changed document was saved and handed to the feed.
    Published {
        events: usize,
        fingerprint: Fingerprint,
    },
    /// The document matched the last published one.
    Unchanged { events: usize },
    /// Another run was still in flight.
    Skipped,
}

impl RunOutcome {
    /// Returns true if a new document was published.
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }

    /// Returns the number of rendered events, if the run completed.
    pub fn events(&self) -> Option<usize> {
        match self {
            Self::Published { events, .. } | Self::Unchanged { events } => Some(*events),
            Self::Skipped => None,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Published { events, .. } => write!(f, "published ({} events)", events),
            Self::Unchanged { events } => write!(f, "unchanged ({} events)", events),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Pipeline coordinator.
pub struct Pipeline {
    events_url: String,
    fetcher: Arc<dyn RemoteFetcher>,
    normalizer: Normalizer,
    calendar: CalendarMeta,
    detector: ChangeDetector,
    snapshots: SnapshotStore,
    mailbox: MailboxSender,
    run_lock: Mutex<()>,
}

impl Pipeline {
    /// Creates a pipeline from the server configuration.
    pub fn new(
        config: &ServerConfig,
        fetcher: Arc<dyn RemoteFetcher>,
        mailbox: MailboxSender,
    ) -> Self {
        Self {
            events_url: config.events_url.clone(),
            normalizer: Normalizer::new(Arc::clone(&fetcher), config.timezone),
            fetcher,
            calendar: config.calendar.clone(),
            detector: ChangeDetector::new(),
            snapshots: SnapshotStore::new(config.snapshot_path()),
            mailbox,
            run_lock: Mutex::new(()),
        }
    }

    /// Returns the last published fingerprint.
    pub fn last_fingerprint(&self) -> Fingerprint {
        self.detector.last()
    }

    /// Publishes the snapshot left by a previous process, if any.
    ///
    /// The snapshot is not written back.
    pub async fn seed(&self) -> Fingerprint {
        let document = self.snapshots.load().await;
        if document.is_empty() {
            return Fingerprint::zero();
        }

        let fingerprint = document.fingerprint();
        if self.detector.should_publish(fingerprint) {
            info!(fingerprint = %fingerprint, "Publishing snapshot");
            self.mailbox.publish(document);
        }
        fingerprint
    }

    /// Fetches and renders the current feed without publishing it.
    pub async fn render(&self) -> FetchResult<CalendarDocument> {
        let records = self.fetcher.fetch(&self.events_url).await?;
        let events = self.normalizer.normalize(&records).await;
        Ok(encode(&events, &self.calendar))
    }

    /// Runs the pipeline once, waiting for a run in flight to finish.
    #[instrument(skip(self), fields(url = %self.events_url))]
    pub async fn run_once(&self) -> FetchResult<RunOutcome> {
        let _guard = self.run_lock.lock().await;
        self.run_locked().await
    }

    /// Runs the pipeline unless a run is already in flight.
    pub async fn try_run(&self) -> FetchResult<RunOutcome> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            warn!("Previous run still in flight, skipping");
            return Ok(RunOutcome::Skipped);
        };
        self.run_locked().await
    }

    async fn run_locked(&self) -> FetchResult<RunOutcome> {
        let records = self.fetcher.fetch(&self.events_url).await?;
        let events = self.normalizer.normalize(&records).await;
        let document = encode(&events, &self.calendar);
        let fingerprint = document.fingerprint();
        let count = events.len();

        if !self.detector.should_publish(fingerprint) {
            debug!(events = count, "Feed unchanged");
            return Ok(RunOutcome::Unchanged { events: count });
        }

        if let Err(e) = self.snapshots.save(&document).await {
            warn!(error = %e, "Failed to save snapshot, serving from memory");
        }
        self.mailbox.publish(document);
        info!(events = count, fingerprint = %fingerprint, "Published feed");

        Ok(RunOutcome::Published {
            events: count,
            fingerprint,
        })
    }
}
