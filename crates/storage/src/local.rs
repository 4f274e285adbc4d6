//! Local artifact storage.
//!
//! A flat directory of downloaded segment files addressed by filename. The
//! store is append-only: an artifact is written once, atomically, and never
//! overwritten. Presence of the final filename is what makes a run
//! resumable, so a transfer is staged in `<filename>.partial` and only
//! linked into place once it is completely on disk.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};

/// Suffix of in-flight transfers.
pub const PARTIAL_SUFFIX: &str = ".partial";

#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    /// Open (creating if needed) the store at `root`. Leftover partial files
    /// from an interrupted run are removed, so a root must not be shared with
    /// a downloader that is still running.
    pub fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let store = Self { root };

        let purged = store.purge_partials()?;
        if purged > 0 {
            info!(count = purged, root = %store.root.display(), "Removed stale partial downloads");
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    pub fn exists(&self, filename: &str) -> bool {
        self.path_for(filename).is_file()
    }

    /// Write a new artifact. Fails with [`StorageError::AlreadyExists`] rather
    /// than replacing an existing one.
    pub async fn write(&self, filename: &str, data: Bytes) -> StorageResult<PathBuf> {
        let final_path = self.path_for(filename);
        if final_path.exists() {
            return Err(StorageError::AlreadyExists(final_path));
        }

        let partial_path = self.path_for(&format!("{}{}", filename, PARTIAL_SUFFIX));
        let mut file = fs::File::create(&partial_path).await?;
        let written = async {
            file.write_all(&data).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            fs::remove_file(&partial_path).await.ok();
            return Err(e.into());
        }
        drop(file);

        commit(&partial_path, &final_path).await?;
        debug!(path = %final_path.display(), size = data.len(), "Stored artifact");
        Ok(final_path)
    }

    pub fn read(&self, filename: &str) -> StorageResult<Vec<u8>> {
        Ok(std::fs::read(self.path_for(filename))?)
    }

    pub fn remove(&self, filename: &str) -> StorageResult<()> {
        Ok(std::fs::remove_file(self.path_for(filename))?)
    }

    /// Names of all complete artifacts, sorted. Subdirectories and partial
    /// files are not listed.
    pub fn list(&self) -> StorageResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) if !name.ends_with(PARTIAL_SUFFIX) => names.push(name),
                Ok(_) => {}
                Err(name) => warn!(name = ?name, "Skipping non UTF-8 filename"),
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete leftover `.partial` files; returns how many were removed.
    pub fn purge_partials(&self) -> StorageResult<usize> {
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            let is_partial = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.ends_with(PARTIAL_SUFFIX));
            if is_partial && path.is_file() {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Move a complete partial file to its final name without replacing an
/// existing artifact. Linking fails if `final_path` exists, unlike `rename`.
async fn commit(partial_path: &Path, final_path: &Path) -> StorageResult<()> {
    let linked = fs::hard_link(partial_path, final_path).await;
    fs::remove_file(partial_path).await.ok();
    match linked {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(StorageError::AlreadyExists(final_path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}
