// src/storage/memory.rs

//! In-memory storage backend for tests and ephemeral runs.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::ForumRecord;
use crate::storage::ForumStore;

/// [`ForumStore`] holding records in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<ForumRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ForumStore for MemoryStore {
    async fn replace_all(&self, records: &[ForumRecord]) -> Result<()> {
        let mut guard = self.records.write().unwrap();
        *guard = records.to_vec();
        guard.sort_by_key(|r| r.index);
        Ok(())
    }

    async fn load_all_ordered(&self) -> Result<Vec<ForumRecord>> {
        Ok(self.records.read().unwrap().clone())
    }

    async fn clear_all(&self) -> Result<()> {
        self.records.write().unwrap().clear();
        Ok(())
    }
}
