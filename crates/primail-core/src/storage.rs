//! Snapshot files.
//!
//! Each persistent store keeps its full contents in one JSON file that is
//! rewritten after every mutation. Writes go to a sibling `.tmp` file which
//! is synced and then renamed over the target, so the snapshot on disk is
//! always a complete earlier state, never a truncated one.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};

use crate::error::PersistenceError;

/// A JSON snapshot on disk.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    /// Creates a handle for the snapshot at `path`. Nothing is touched on disk.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the snapshot.
    ///
    /// A missing file yields the default value, which is immediately written
    /// out as the initial snapshot. A file with only whitespace also yields
    /// the default value.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the initial snapshot
    /// cannot be written, or the contents are not valid JSON for `T`.
    pub async fn load<T>(&self) -> Result<T, PersistenceError>
    where
        T: DeserializeOwned + Serialize + Default,
    {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => {
                debug!("Snapshot {} is empty", self.path.display());
                Ok(T::default())
            }
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|source| PersistenceError::Serde {
                    path: self.path.clone(),
                    source,
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Creating snapshot {}", self.path.display());
                let value = T::default();
                self.save(&value).await?;
                Ok(value)
            }
            Err(source) => Err(self.io_error(source)),
        }
    }

    /// Writes `value` as the new snapshot, atomically replacing the old one.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any filesystem step fails. The
    /// previous snapshot is left intact in that case.
    pub async fn save<T: Serialize>(&self, value: &T) -> Result<(), PersistenceError> {
        let json = serde_json::to_vec_pretty(value).map_err(|source| PersistenceError::Serde {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }

        let tmp = self.tmp_path();
        if let Err(source) = write_synced(&tmp, &json).await {
            discard(&tmp).await;
            return Err(PersistenceError::Io { path: tmp, source });
        }
        if let Err(source) = tokio::fs::rename(&tmp, &self.path).await {
            discard(&tmp).await;
            return Err(self.io_error(source));
        }
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map_or_else(|| OsString::from("snapshot"), OsString::from);
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Writes `value` to `snapshot` (if the store is file-backed) and tracks
/// whether the on-disk state lags behind memory.
///
/// A failed write is logged and leaves `dirty` set; the in-memory state
/// stays authoritative and the next successful write catches the file up.
pub(crate) async fn commit<T: Serialize>(
    snapshot: Option<&SnapshotFile>,
    value: &T,
    dirty: &mut bool,
) -> Result<(), PersistenceError> {
    let Some(snapshot) = snapshot else {
        return Ok(());
    };
    match snapshot.save(value).await {
        Ok(()) => {
            *dirty = false;
            Ok(())
        }
        Err(e) => {
            error!("Failed to write snapshot {}: {e}", snapshot.path().display());
            *dirty = true;
            Err(e)
        }
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != io::ErrorKind::NotFound
    {
        warn!("Failed to remove temporary snapshot {}: {e}", path.display());
    }
}
