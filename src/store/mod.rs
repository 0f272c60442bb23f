use async_trait::async_trait;

use crate::models::{store_key, ItemSnapshot};
use crate::Result;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Key-value persistence for the last known snapshot of each item.
///
/// Keys are `{source}:{code}` and values are JSON-serialized snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Releases connections once the run is over.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

pub async fn load_snapshot(
    store: &dyn SnapshotStore,
    source: &str,
    code: &str,
) -> Result<Option<ItemSnapshot>> {
    match store.get(&store_key(source, code)).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub async fn save_snapshot(store: &dyn SnapshotStore, snapshot: &ItemSnapshot) -> Result<()> {
    let value = serde_json::to_string(snapshot)?;
    store.set(&snapshot.store_key(), &value).await
}
