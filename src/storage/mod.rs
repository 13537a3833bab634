//! Storage abstractions for the cached forum catalog.
//!
//! The catalog is a full-replace resource: each successful rebuild clears the
//! previous record set and bulk-inserts the new one. There is deliberately no
//! partial-update API; readers querying during the replacement window may see
//! an intermediate state.

pub mod local;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::ForumRecord;

// Re-export for convenience
pub use local::LocalStore;
pub use memory::MemoryStore;

/// Trait for forum catalog storage backends.
#[async_trait]
pub trait ForumStore: Send + Sync {
    /// Replace the entire stored record set with a new one.
    async fn replace_all(&self, records: &[ForumRecord]) -> Result<()>;

    /// Load all stored records ordered by their `index` field.
    async fn load_all_ordered(&self) -> Result<Vec<ForumRecord>>;

    /// Remove all stored records.
    async fn clear_all(&self) -> Result<()>;
}
