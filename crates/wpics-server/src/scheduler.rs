//! Background scheduler for pipeline runs.
//!
//! The scheduler runs the pipeline once right away and then on a fixed
//! interval. Every run is spawned as its own task, so a slow fetch never
//! delays the timer. Overlap is the pipeline's concern.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between runs.
    pub interval: Duration,
    /// Whether to run immediately on start.
    pub run_on_start: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300), // 5 minutes
            run_on_start: true,
        }
    }
}

impl SchedulerConfig {
    /// Creates a new scheduler config with the given interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Builder: set whether to run immediately on start.
    pub fn with_run_on_start(mut self, run_on_start: bool) -> Self {
        self.run_on_start = run_on_start;
        self
    }
}

/// Commands that can be sent to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    /// Trigger an extra run now.
    SyncNow,
    /// Stop the scheduler.
    Stop,
}

/// Scheduler state.
#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    /// Number of runs started.
    pub runs: u64,
    /// Number of successful runs.
    pub successes: u64,
    /// Number of failed runs.
    pub failures: u64,
    /// Number of failures since the last success.
    pub consecutive_failures: u32,
    /// Start time of the last run.
    pub last_run: Option<DateTime<Utc>>,
    /// End time of the last successful run.
    pub last_success: Option<DateTime<Utc>>,
    /// Last error message.
    pub last_error: Option<String>,
}

impl SchedulerState {
    /// Creates a new scheduler state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the start of a run.
    pub fn record_start(&mut self) {
        self.runs += 1;
        self.last_run = Some(Utc::now());
    }

    /// Records a successful run.
    pub fn record_success(&mut self) {
        self.successes += 1;
        self.consecutive_failures = 0;
        self.last_success = Some(Utc::now());
        self.last_error = None;
    }

    /// Records a failed run.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.failures += 1;
        self.consecutive_failures += 1;
        self.last_error = Some(error.into());
    }

    /// Returns the number of runs that have not finished yet.
    pub fn in_flight(&self) -> u64 {
        self.runs - self.successes - self.failures
    }
}

/// Shared scheduler state.
pub type SharedSchedulerState = Arc<RwLock<SchedulerState>>;

/// Creates a new shared scheduler state.
pub fn new_scheduler_state() -> SharedSchedulerState {
    Arc::new(RwLock::new(SchedulerState::new()))
}

/// The scheduler drives periodic pipeline runs.
pub struct Scheduler {
    config: SchedulerConfig,
    state: SharedSchedulerState,
    command_tx: mpsc::Sender<SchedulerCommand>,
    command_rx: mpsc::Receiver<SchedulerCommand>,
}

impl Scheduler {
    /// Creates a new scheduler with the given configuration.
    pub fn new(config: SchedulerConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        Self {
            config,
            state: new_scheduler_state(),
            command_tx,
            command_rx,
        }
    }

    /// Returns a handle for sending commands to the scheduler.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            command_tx: self.command_tx.clone(),
            state: self.state.clone(),
        }
    }

    /// Returns the shared state.
    pub fn state(&self) -> SharedSchedulerState {
        self.state.clone()
    }

    /// Runs the scheduler loop with the given run function.
    ///
    /// The loop ends on [`SchedulerCommand::Stop`] or when every handle is
    /// dropped. Runs already spawned are left to finish.
    pub async fn run<F, Fut>(self, run_fn: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        let Self {
            config,
            state,
            command_tx,
            mut command_rx,
        } = self;
        // Only external handles keep the loop alive.
        drop(command_tx);

        info!(
            interval_secs = config.interval.as_secs(),
            "Scheduler started"
        );

        let run_fn = Arc::new(run_fn);
        let start = if config.run_on_start {
            tokio::time::Instant::now()
        } else {
            tokio::time::Instant::now() + config.interval
        };
        let mut ticker = tokio::time::interval_at(start, config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    debug!("Timer fired");
                    spawn_run(&state, &run_fn);
                }
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(SchedulerCommand::SyncNow) => {
                            debug!("Received SyncNow command");
                            spawn_run(&state, &run_fn);
                        }
                        Some(SchedulerCommand::Stop) | None => {
                            info!("Scheduler stopping");
                            break;
                        }
                    }
                }
            }
        }
    }
}

fn spawn_run<F, Fut>(state: &SharedSchedulerState, run_fn: &Arc<F>)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), String>> + Send + 'static,
{
    let state = state.clone();
    let run_fn = Arc::clone(run_fn);
    tokio::spawn(async move {
        state.write().await.record_start();
        match run_fn().await {
            Ok(()) => {
                debug!("Run completed");
                state.write().await.record_success();
            }
            Err(e) => {
                warn!(error = %e, "Run failed");
                state.write().await.record_failure(e);
            }
        }
    });
}

/// Handle for sending commands to a running scheduler.
#[derive(Clone, Debug)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    state: SharedSchedulerState,
}

impl SchedulerHandle {
    /// Triggers an immediate extra run.
    pub async fn sync_now(&self) -> Result<(), mpsc::error::SendError<SchedulerCommand>> {
        self.command_tx.send(SchedulerCommand::SyncNow).await
    }

    /// Stops the scheduler.
    pub async fn stop(&self) -> Result<(), mpsc::error::SendError<SchedulerCommand>> {
        self.command_tx.send(SchedulerCommand::Stop).await
    }

    /// Returns the current scheduler state.
    pub async fn state(&self) -> SchedulerState {
        self.state.read().await.clone()
    }
}
