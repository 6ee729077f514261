//! Change detection on document fingerprints.

use std::sync::Mutex;

use tracing::debug;
use wpics_core::Fingerprint;

/// Remembers the last published fingerprint.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last: Mutex<Fingerprint>,
}

impl ChangeDetector {
    /// Creates a detector that has not published anything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detector seeded with a known fingerprint.
    pub fn seeded(fingerprint: Fingerprint) -> Self {
        Self {
            last: Mutex::new(fingerprint),
        }
    }

    /// Returns true and records `fingerprint` if it differs from the last one.
    ///
    /// Equal fingerprints leave the state untouched.
    pub fn should_publish(&self, fingerprint: Fingerprint) -> bool {
        let mut last = self.lock();
        if *last == fingerprint {
            debug!(fingerprint = %fingerprint, "Document unchanged");
            return false;
        }
        debug!(previous = %*last, current = %fingerprint, "Document changed");
        *last = fingerprint;
        true
    }

    /// Returns the last published fingerprint.
    pub fn last(&self) -> Fingerprint {
        *self.lock()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Fingerprint> {
        self.last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
