//! Feed server: change detection, snapshot, scheduler, HTTP routes.
//!
//! This crate provides everything between the source and the subscriber:
//! - [`Pipeline`]: fetch, normalize, encode, detect and publish, one run at a time
//! - [`SnapshotStore`]: the last published document on disk
//! - [`Scheduler`]: periodic runs plus on-demand refreshes
//! - [`router`]: axum routes serving the document from the mailbox
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use wpics_server::{AppState, Pipeline, ServerConfig, mailbox, router};
//! use wpics_source::HttpFetcher;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::new("https://example.org/wp-json/wp/v2/events");
//!     let (tx, rx) = mailbox();
//!     let pipeline = Pipeline::new(&config, Arc::new(HttpFetcher::new()?), tx);
//!     pipeline.seed().await;
//!     pipeline.run_once().await?;
//!
//!     let app = router(AppState::new(rx, &config.page, config.base_url.as_ref()));
//!     let listener = wpics_server::bind(config.address).await?;
//!     wpics_server::serve(listener, app, std::future::pending()).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod detector;
mod error;
mod mailbox;
mod pipeline;
mod routes;
mod scheduler;
mod signals;
mod snapshot;

pub use config::{SNAPSHOT_FILE_NAME, ServerConfig, snapshot_path};
pub use detector::ChangeDetector;
pub use error::{PersistError, PersistResult, ServerError, ServerResult};
pub use mailbox::{MailboxClosed, MailboxReceiver, MailboxSender, mailbox};
pub use pipeline::{Pipeline, RunOutcome};
pub use routes::{AppState, FEED_PATH, PageSettings, bind, feed_links, router, serve};
pub use scheduler::{
    Scheduler, SchedulerCommand, SchedulerConfig, SchedulerHandle, SchedulerState,
    SharedSchedulerState, new_scheduler_state,
};
pub use signals::{RefreshSignal, ShutdownHandle, ShutdownSignal, SignalHandler};
pub use snapshot::SnapshotStore;
