//! Local filesystem storage implementation.
//!
//! Persists the catalog as a single JSON file under the storage directory,
//! written atomically (write to temp, then rename) so readers never observe a
//! half-written record set.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── config.toml     # Crawler configuration
//! └── forums.json     # The flat forum record set, in index order
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::ForumRecord;
use crate::storage::ForumStore;

const RECORDS_FILE: &str = "forums.json";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root_dir: PathBuf,
}

impl LocalStore {
    /// Create a new LocalStore rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    fn records_path(&self) -> PathBuf {
        self.root_dir.join(RECORDS_FILE)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &PathBuf, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Read the record file, returning None if it doesn't exist yet.
    async fn read_records(&self) -> Result<Option<Vec<ForumRecord>>> {
        match tokio::fs::read(self.records_path()).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl ForumStore for LocalStore {
    async fn replace_all(&self, records: &[ForumRecord]) -> Result<()> {
        let mut sorted = records.to_vec();
        sorted.sort_by_key(|r| r.index);

        let bytes = serde_json::to_vec_pretty(&sorted)?;
        self.write_bytes(&self.records_path(), &bytes).await?;
        log::info!(
            "Stored {} forum records to {}",
            sorted.len(),
            self.records_path().display()
        );
        Ok(())
    }

    async fn load_all_ordered(&self) -> Result<Vec<ForumRecord>> {
        let mut records = self.read_records().await?.unwrap_or_default();
        records.sort_by_key(|r| r.index);
        Ok(records)
    }

    async fn clear_all(&self) -> Result<()> {
        match tokio::fs::remove_file(self.records_path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}
