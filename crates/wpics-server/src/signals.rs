//! Process signals of `wp-ics-gen serve`.
//!
//! SIGTERM and SIGINT stop the HTTP server and the scheduler. SIGHUP asks
//! the scheduler for a pipeline run outside the regular interval.

use std::io;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

/// Fans process signals out to the server loop and the refresh task.
pub struct SignalHandler {
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
    /// Number of refresh requests so far.
    refresh_tx: Arc<watch::Sender<u64>>,
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHandler {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (refresh_tx, _) = watch::channel(0);

        Self {
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
            refresh_tx: Arc::new(refresh_tx),
        }
    }

    /// Registers SIGTERM, SIGINT and SIGHUP, then listens in a background
    /// task until the first shutdown signal.
    ///
    /// # Errors
    ///
    /// Fails if the runtime cannot register one of the signals.
    #[cfg(unix)]
    pub fn spawn_listener(&self) -> io::Result<()> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sighup = signal(SignalKind::hangup())?;

        let shutdown_tx = self.shutdown_tx.clone();
        let refresh_tx = self.refresh_tx.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!(signal = "SIGTERM", "Stopping feed server");
                        break;
                    }
                    _ = sigint.recv() => {
                        info!(signal = "SIGINT", "Stopping feed server");
                        break;
                    }
                    _ = sighup.recv() => {
                        info!(signal = "SIGHUP", "Feed refresh requested");
                        refresh_tx.send_modify(|n| *n += 1);
                    }
                }
            }

            let _ = shutdown_tx.send(true);
            debug!("Signal listener stopped");
        });
        Ok(())
    }

    /// Without Unix signals only Ctrl+C is handled, as a shutdown.
    #[cfg(not(unix))]
    pub fn spawn_listener(&self) -> io::Result<()> {
        let shutdown_tx = self.shutdown_tx.clone();

        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!(signal = "ctrl-c", "Stopping feed server");
                let _ = shutdown_tx.send(true);
            }
        });
        Ok(())
    }

    /// Resolves once shutdown was requested; used as the graceful shutdown
    /// future of the HTTP server.
    pub fn shutdown(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.shutdown_rx.clone(),
        }
    }

    /// Returns a stream of refresh requests made after this call.
    pub fn refreshes(&self) -> RefreshSignal {
        RefreshSignal {
            rx: self.refresh_tx.subscribe(),
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Requests shutdown as if SIGTERM had arrived.
    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Requests a refresh as if SIGHUP had arrived.
    pub fn trigger_refresh(&self) {
        self.refresh_tx.send_modify(|n| *n += 1);
    }

    /// Returns a cloneable handle, for code that must stop the server
    /// without owning the handler.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
            rx: self.shutdown_rx.clone(),
        }
    }
}

/// Future side of a shutdown request.
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub async fn wait(mut self) {
        // An error means every sender is gone, which also ends the process.
        let _ = self.rx.wait_for(|shutdown| *shutdown).await;
    }
}

/// Refresh requests, one wake-up per burst of signals.
pub struct RefreshSignal {
    rx: watch::Receiver<u64>,
}

impl RefreshSignal {
    /// Waits for the next refresh request.
    ///
    /// Returns false once the signal handler is gone.
    pub async fn next(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Cloneable shutdown trigger.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Same as [`SignalHandler::shutdown`].
    pub fn wait(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.rx.clone(),
        }
    }
}
