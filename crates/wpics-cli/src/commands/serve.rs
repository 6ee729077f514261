//! Serve command: runs the feed server in the foreground.
//!
//! This module wires the server components together:
//! - Signal handler (SIGTERM/SIGINT for shutdown, SIGHUP for an extra run)
//! - Pipeline, seeded from the snapshot of a previous process
//! - Scheduler (periodic pipeline runs)
//! - HTTP server (feed and landing page)

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use wpics_server::{
    AppState, Pipeline, Scheduler, SchedulerConfig, ServerConfig, SignalHandler, mailbox, router,
};
use wpics_source::{HttpFetcher, RemoteFetcher};

use crate::error::CliResult;

/// How long shutdown waits for the scheduler loop to stop.
const SCHEDULER_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Starts the feed server.
///
/// Blocks until a shutdown signal is received (SIGTERM/SIGINT).
pub async fn run(config: &ServerConfig) -> CliResult<()> {
    config.validate()?;

    let fetcher: Arc<dyn RemoteFetcher> = Arc::new(HttpFetcher::new()?);

    let signals = SignalHandler::new();
    signals.spawn_listener()?;

    let listener = wpics_server::bind(config.address).await?;
    serve_until_shutdown(config, fetcher, listener, signals).await
}

/// Runs the pipeline schedule and the HTTP server on `listener` until
/// `signals` reports a shutdown.
pub async fn serve_until_shutdown(
    config: &ServerConfig,
    fetcher: Arc<dyn RemoteFetcher>,
    listener: TcpListener,
    signals: SignalHandler,
) -> CliResult<()> {
    info!(
        events_url = %config.events_url,
        working_dir = %config.working_dir.display(),
        interval_secs = config.check_interval.as_secs(),
        timezone = %config.timezone,
        "Starting feed server"
    );

    // 1. Pipeline and mailbox
    let (sender, feed) = mailbox();
    let pipeline = Arc::new(Pipeline::new(config, fetcher, sender));
    let seeded = pipeline.seed().await;
    if !seeded.is_zero() {
        info!(fingerprint = %seeded, "Serving snapshot until the first run");
    }

    // 2. Scheduler
    let scheduler = Scheduler::new(SchedulerConfig::new(config.check_interval));
    let scheduler_handle = scheduler.handle();

    let run_pipeline = Arc::clone(&pipeline);
    let scheduler_task = tokio::spawn(scheduler.run(move || {
        let pipeline = Arc::clone(&run_pipeline);
        async move {
            let outcome = pipeline.try_run().await.map_err(|e| e.to_string())?;
            debug!(outcome = %outcome, "Pipeline run finished");
            Ok(())
        }
    }));

    // 3. SIGHUP asks the scheduler for an extra run
    let mut refreshes = signals.refreshes();
    let refresh_handle = scheduler_handle.clone();
    let refresh_task = tokio::spawn(async move {
        while refreshes.next().await {
            if refresh_handle.sync_now().await.is_err() {
                break;
            }
        }
    });

    // 4. HTTP server, until shutdown
    let app = router(AppState::new(feed, &config.page, config.base_url.as_ref()));
    let shutdown = signals.shutdown();
    let served = wpics_server::serve(listener, app, shutdown.wait()).await;

    // Clean shutdown: stop the scheduler, then drop the pipeline and its sender
    info!("Shutting down...");
    refresh_task.abort();
    if let Err(e) = scheduler_handle.stop().await {
        warn!(error = %e, "Failed to send stop command to scheduler");
    }
    if tokio::time::timeout(SCHEDULER_STOP_TIMEOUT, scheduler_task)
        .await
        .is_err()
    {
        warn!("Scheduler did not stop in time");
    }
    drop(pipeline);

    served?;
    info!("Server stopped");
    Ok(())
}
