use checkbook_core::{EntryId, LedgerEntry, NewEntry};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
    #[error("Corrupt entry {id}: {reason}")]
    Corrupt { id: i64, reason: String },
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// The primary keyed collection of ledger entries.
///
/// Every call completes (or fails) before it returns; callers never have two
/// dependent operations in flight. The bulk operations default to a sequence
/// of single-entry calls; backends with transactions override them.
#[allow(async_fn_in_trait)]
pub trait EntryStore {
    /// Full snapshot in id order.
    async fn get_all(&self) -> Result<Vec<LedgerEntry>, StoreError>;

    async fn get(&self, id: EntryId) -> Result<Option<LedgerEntry>, StoreError>;

    /// Inserts a new entry and returns the id the store assigned to it.
    async fn add(&self, entry: NewEntry) -> Result<EntryId, StoreError>;

    /// Writes the entry under its own id, inserting it if absent.
    async fn put(&self, entry: &LedgerEntry) -> Result<(), StoreError>;

    /// Returns whether an entry with that id existed.
    async fn delete(&self, id: EntryId) -> Result<bool, StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;

    async fn add_all(&self, entries: Vec<NewEntry>) -> Result<Vec<EntryId>, StoreError> {
        let mut ids = Vec::with_capacity(entries.len());
        for entry in entries {
            ids.push(self.add(entry).await?);
        }
        Ok(ids)
    }

    /// Clears the store, then writes every entry with its existing id.
    async fn replace_all(&self, entries: Vec<LedgerEntry>) -> Result<(), StoreError> {
        self.clear().await?;
        for entry in &entries {
            self.put(entry).await?;
        }
        Ok(())
    }
}

/// Flat, non-transactional snapshot storage mirroring the primary store.
#[allow(async_fn_in_trait)]
pub trait MirrorStore {
    async fn read(&self) -> Result<Option<String>, StoreError>;

    async fn write(&self, snapshot: String) -> Result<(), StoreError>;
}
