//! In-process stores, used as test doubles and for ephemeral ledgers.

use checkbook_core::{EntryId, LedgerEntry, NewEntry};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::store::{EntryStore, MirrorStore, StoreError};

#[derive(Debug, Default)]
struct MemoryState {
    last_id: i64,
    entries: BTreeMap<EntryId, LedgerEntry>,
}

impl MemoryState {
    fn insert(&mut self, entry: LedgerEntry) {
        self.last_id = self.last_id.max(entry.id.0);
        self.entries.insert(entry.id, entry);
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<LedgerEntry>) -> Self {
        let mut state = MemoryState::default();
        for entry in entries {
            state.insert(entry);
        }
        MemoryStore {
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl EntryStore for MemoryStore {
    async fn get_all(&self) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self.state()?.entries.values().cloned().collect())
    }

    async fn get(&self, id: EntryId) -> Result<Option<LedgerEntry>, StoreError> {
        Ok(self.state()?.entries.get(&id).cloned())
    }

    async fn add(&self, entry: NewEntry) -> Result<EntryId, StoreError> {
        let mut state = self.state()?;
        let id = EntryId(state.last_id + 1);
        state.insert(entry.with_id(id));
        Ok(id)
    }

    async fn put(&self, entry: &LedgerEntry) -> Result<(), StoreError> {
        self.state()?.insert(entry.clone());
        Ok(())
    }

    async fn delete(&self, id: EntryId) -> Result<bool, StoreError> {
        Ok(self.state()?.entries.remove(&id).is_some())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.state()?.entries.clear();
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryMirror {
    snapshot: Mutex<Option<String>>,
}

impl MemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: &str) -> Self {
        MemoryMirror {
            snapshot: Mutex::new(Some(snapshot.to_string())),
        }
    }

    /// Current contents, for inspection.
    pub fn snapshot(&self) -> Option<String> {
        self.snapshot.lock().ok().and_then(|s| s.clone())
    }
}

impl MirrorStore for MemoryMirror {
    async fn read(&self) -> Result<Option<String>, StoreError> {
        self.snapshot
            .lock()
            .map(|s| s.clone())
            .map_err(|_| StoreError::Unavailable("memory mirror lock poisoned".to_string()))
    }

    async fn write(&self, snapshot: String) -> Result<(), StoreError> {
        let mut slot = self
            .snapshot
            .lock()
            .map_err(|_| StoreError::Unavailable("memory mirror lock poisoned".to_string()))?;
        *slot = Some(snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkbook_core::Money;
    use chrono::NaiveDate;

    fn new_entry(desc: &str) -> NewEntry {
        NewEntry::new(
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            desc,
            "Misc",
            Money::from_cents(100),
        )
    }

    #[tokio::test]
    async fn ids_advance_past_explicit_inserts() {
        let store = MemoryStore::new();
        assert_eq!(store.add(new_entry("a")).await.unwrap(), EntryId(1));
        store.put(&new_entry("b").with_id(EntryId(40))).await.unwrap();
        assert_eq!(store.add(new_entry("c")).await.unwrap(), EntryId(41));

        store.clear().await.unwrap();
        assert_eq!(store.add(new_entry("d")).await.unwrap(), EntryId(42));
    }

    #[tokio::test]
    async fn default_replace_all_clears_first() {
        let store = MemoryStore::with_entries(vec![new_entry("old").with_id(EntryId(2))]);
        store
            .replace_all(vec![new_entry("new").with_id(EntryId(1))])
            .await
            .unwrap();
        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].description, "new");
    }

    #[tokio::test]
    async fn mirror_starts_empty_and_keeps_last_write() {
        let mirror = MemoryMirror::new();
        assert_eq!(mirror.read().await.unwrap(), None);
        mirror.write("[1]".to_string()).await.unwrap();
        mirror.write("[2]".to_string()).await.unwrap();
        assert_eq!(mirror.read().await.unwrap().as_deref(), Some("[2]"));
    }
}
