//! Single-slot handoff of the latest document to the feed server.
//!
//! Publishing never blocks: a newer document simply replaces the one in the
//! slot, whether or not a reader has seen it.

use std::sync::Arc;

use tokio::sync::watch;
use wpics_core::CalendarDocument;

type Slot = Option<Arc<CalendarDocument>>;

/// Creates a connected sender/receiver pair with an empty slot.
pub fn mailbox() -> (MailboxSender, MailboxReceiver) {
    let (tx, rx) = watch::channel(None);
    (MailboxSender { tx }, MailboxReceiver { rx })
}

/// Publishing side, owned by the pipeline.
#[derive(Debug)]
pub struct MailboxSender {
    tx: watch::Sender<Slot>,
}

impl MailboxSender {
    /// Replaces the current document.
    pub fn publish(&self, document: CalendarDocument) {
        // send_replace keeps working when no receiver is left.
        self.tx.send_replace(Some(Arc::new(document)));
    }

    /// Returns a new receiver for the slot.
    pub fn subscribe(&self) -> MailboxReceiver {
        MailboxReceiver {
            rx: self.tx.subscribe(),
        }
    }
}

/// Reading side, cloned into every request handler.
#[derive(Debug, Clone)]
pub struct MailboxReceiver {
    rx: watch::Receiver<Slot>,
}

/// The sender was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("mailbox closed")]
pub struct MailboxClosed;

impl MailboxReceiver {
    /// Returns the current document, if anything was published.
    pub fn latest(&self) -> Option<Arc<CalendarDocument>> {
        self.rx.borrow().clone()
    }

    /// Waits for the next publish and returns the new document.
    ///
    /// # Errors
    ///
    /// Returns [`MailboxClosed`] once the sender is gone.
    pub async fn changed(&mut self) -> Result<Option<Arc<CalendarDocument>>, MailboxClosed> {
        self.rx.changed().await.map_err(|_| MailboxClosed)?;
        Ok(self.rx.borrow_and_update().clone())
    }
}
