//! Snapshot of the last published document.
//!
//! The snapshot is a single file overwritten on every changed publish. It
//! seeds the change detector and the feed after a restart.

use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use wpics_core::CalendarDocument;

use crate::error::{PersistError, PersistResult};

/// Permissions of the snapshot file.
#[cfg(unix)]
const SNAPSHOT_MODE: u32 = 0o644;

/// Reads and writes the snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Creates a store for the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the snapshot path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the snapshot.
    ///
    /// A missing or unreadable file yields the empty document with the zero
    /// fingerprint.
    pub async fn load(&self) -> CalendarDocument {
        match self.read().await {
            Ok(Some(document)) => {
                info!(
                    path = %self.path.display(),
                    fingerprint = %document.fingerprint(),
                    "Loaded snapshot"
                );
                document
            }
            Ok(None) => {
                debug!(path = %self.path.display(), "No snapshot found");
                CalendarDocument::empty()
            }
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable snapshot");
                CalendarDocument::empty()
            }
        }
    }

    /// Reads the snapshot, distinguishing a missing file from a failure.
    pub async fn read(&self) -> PersistResult<Option<CalendarDocument>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.is_empty() => Ok(None),
            Ok(content) => Ok(Some(CalendarDocument::from_content(content))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PersistError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Replaces the snapshot with `document`.
    ///
    /// Any existing regular file is removed first; the new file is written
    /// with mode `0644` on unix.
    pub async fn save(&self, document: &CalendarDocument) -> PersistResult<()> {
        self.remove_existing().await?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.write_error(source))?;
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(SNAPSHOT_MODE);

        let mut file = options
            .open(&self.path)
            .await
            .map_err(|source| self.write_error(source))?;
        file.write_all(document.as_bytes())
            .await
            .map_err(|source| self.write_error(source))?;
        file.sync_all()
            .await
            .map_err(|source| self.write_error(source))?;

        // The process umask may have narrowed the mode given at creation.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(
                &self.path,
                std::fs::Permissions::from_mode(SNAPSHOT_MODE),
            )
            .await
            .map_err(|source| self.write_error(source))?;
        }

        debug!(
            path = %self.path.display(),
            bytes = document.as_bytes().len(),
            "Saved snapshot"
        );
        Ok(())
    }

    async fn remove_existing(&self) -> PersistResult<()> {
        match tokio::fs::symlink_metadata(&self.path).await {
            Ok(meta) if meta.is_file() || meta.file_type().is_symlink() => {
                tokio::fs::remove_file(&self.path)
                    .await
                    .map_err(|source| PersistError::Remove {
                        path: self.path.clone(),
                        source,
                    })
            }
            // Directories and missing files are left for the write to report.
            _ => Ok(()),
        }
    }

    fn write_error(&self, source: io::Error) -> PersistError {
        PersistError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wpics_core::Fingerprint;

    const DOC: &str = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nEND:VCALENDAR\r\n";

    #[tokio::test]
    async fn save_then_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path().join("events.ics"));
        let document = CalendarDocument::from_content(DOC);

        store.save(&document).await.unwrap();
        let loaded = store.load().await;

        assert_eq!(loaded.content(), DOC);
        assert_eq!(loaded.fingerprint(), document.fingerprint());
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path().join("events.ics"));

        let loaded = store.load().await;
        assert!(loaded.is_empty());
        assert_eq!(loaded.fingerprint(), Fingerprint::zero());
        assert!(store.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unreadable_file_loads_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("events.ics");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        let store = SnapshotStore::new(&path);

        assert!(matches!(store.read().await, Err(PersistError::Read { .. })));
        assert!(store.load().await.fingerprint().is_zero());
    }

    #[tokio::test]
    async fn save_replaces_previous_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("events.ics");
        std::fs::write(&path, "a much longer previous snapshot body").unwrap();
        let store = SnapshotStore::new(&path);

        store.save(&CalendarDocument::from_content(DOC)).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DOC);
    }

    #[tokio::test]
    async fn save_creates_working_dir() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path().join("data").join("events.ics"));

        store.save(&CalendarDocument::from_content(DOC)).await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn save_into_directory_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("events.ics");
        std::fs::create_dir(&path).unwrap();
        let store = SnapshotStore::new(&path);

        let err = store
            .save(&CalendarDocument::from_content(DOC))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistError::Write { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn save_sets_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path().join("events.ics"));
        store.save(&CalendarDocument::from_content(DOC)).await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
