use checkbook_core::{
    render, suggestions, Confirmed, EntryFilter, EntryId, LedgerEntry, NewEntry, RegisterRow,
    SortOrder, Suggestions,
};
use checkbook_import::{remove_existing, CsvError, PendingImport, ProfileRegistry};
use checkbook_storage::{
    backup_to_mirror, decode_snapshot, encode_document, restore_from_mirror, EntryStore,
    MirrorStore, StoreError,
};
use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("CSV import error: {0}")]
    Csv(#[from] CsvError),
    #[error("Invalid ledger document: {0}")]
    Document(#[source] serde_json::Error),
    #[error("Import of {count} entries failed, nothing was committed: {source}")]
    ImportCommit {
        count: usize,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeSummary {
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub ids: Vec<EntryId>,
    /// Rows skipped at commit time because the store already held them.
    pub duplicates: usize,
}

/// A full-ledger JSON document ready to be written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub file_name: String,
    pub contents: String,
}

/// The checkbook: a primary entry store, its mirror backup and the CSV
/// profiles used for imports.
///
/// Every mutation runs its read, write and mirror refresh under one writer
/// lock. Reads go straight to the store.
pub struct Ledger<S, M> {
    store: S,
    mirror: M,
    profiles: ProfileRegistry,
    write_lock: Mutex<()>,
}

impl<S: EntryStore, M: MirrorStore> Ledger<S, M> {
    /// Brings the primary store into agreement with the mirror, then returns
    /// the ready ledger. A failed restore is logged and the primary store is
    /// used as it stands.
    pub async fn open(store: S, mirror: M, profiles: ProfileRegistry) -> Self {
        match restore_from_mirror(&store, &mirror).await {
            Ok(outcome) => debug!(?outcome, "Startup reconcile finished"),
            Err(e) => error!("Failed to rebuild primary store from mirror: {e}"),
        }

        Ledger {
            store,
            mirror,
            profiles,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn profiles(&self) -> &ProfileRegistry {
        &self.profiles
    }

    pub async fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(self.store.get_all().await?)
    }

    pub async fn entry(&self, id: EntryId) -> Result<Option<LedgerEntry>, LedgerError> {
        Ok(self.store.get(id).await?)
    }

    pub async fn register(
        &self,
        filter: Option<&EntryFilter>,
        order: SortOrder,
    ) -> Result<Vec<RegisterRow>, LedgerError> {
        let entries = self.store.get_all().await?;
        Ok(render(entries, filter, order))
    }

    pub async fn suggestions(&self) -> Result<Suggestions, LedgerError> {
        let entries = self.store.get_all().await?;
        Ok(suggestions(&entries))
    }

    pub async fn add_entry(&self, entry: NewEntry) -> Result<EntryId, LedgerError> {
        let _guard = self.write_lock.lock().await;
        let id = self.store.add(entry).await?;
        info!(%id, "Added entry");
        self.refresh_mirror().await;
        Ok(id)
    }

    /// Returns `false` when the entry was already gone.
    pub async fn delete_entry(&self, id: EntryId) -> Result<bool, LedgerError> {
        let _guard = self.write_lock.lock().await;
        if !self.store.delete(id).await? {
            warn!(%id, "Delete requested for an entry that no longer exists");
            return Ok(false);
        }
        info!(%id, "Deleted entry");
        self.refresh_mirror().await;
        Ok(true)
    }

    /// Returns `false` when the entry was already gone.
    pub async fn set_reconciled(&self, id: EntryId, reconciled: bool) -> Result<bool, LedgerError> {
        let _guard = self.write_lock.lock().await;
        let Some(mut entry) = self.store.get(id).await? else {
            warn!(%id, "Reconcile toggle for an entry that no longer exists");
            return Ok(false);
        };
        entry.reconciled = reconciled;
        self.store.put(&entry).await?;
        info!(%id, reconciled, "Updated reconciled flag");
        self.refresh_mirror().await;
        Ok(true)
    }

    /// Deletes every reconciled entry dated on or before the cutoff.
    ///
    /// Entries are deleted one at a time. If a delete fails the entries
    /// removed so far stay removed, the error is returned and the mirror is
    /// not refreshed.
    pub async fn purge(&self, cutoff: Confirmed<NaiveDate>) -> Result<PurgeSummary, LedgerError> {
        let _guard = self.write_lock.lock().await;
        let cutoff = cutoff.into_inner();

        let doomed: Vec<EntryId> = self
            .store
            .get_all()
            .await?
            .into_iter()
            .filter(|e| e.reconciled && e.date <= cutoff)
            .map(|e| e.id)
            .collect();

        let mut removed = 0;
        for id in doomed {
            if self.store.delete(id).await? {
                removed += 1;
            }
        }

        info!(%cutoff, removed, "Purged reconciled entries");
        self.refresh_mirror().await;
        Ok(PurgeSummary { removed })
    }

    /// Parses a bank export and drops rows already in the ledger. Nothing is
    /// written until [`Ledger::commit_import`].
    pub async fn stage_csv(&self, text: &str) -> Result<PendingImport, LedgerError> {
        let existing = self.store.get_all().await?;
        Ok(PendingImport::stage(text, &self.profiles, &existing)?)
    }

    /// Writes a staged batch. Rows that reached the store after staging, for
    /// example through an overlapping commit, are dropped here under the
    /// writer lock and counted as duplicates.
    pub async fn commit_import(
        &self,
        pending: PendingImport,
        mark_reconciled: bool,
    ) -> Result<ImportSummary, LedgerError> {
        let _guard = self.write_lock.lock().await;
        let existing = self.store.get_all().await?;
        let deduped = remove_existing(pending.into_entries(mark_reconciled), &existing);
        let duplicates = deduped.duplicates.len();
        if duplicates > 0 {
            info!(duplicates, "Dropped rows stored since the import was staged");
        }
        if deduped.fresh.is_empty() {
            return Ok(ImportSummary {
                ids: Vec::new(),
                duplicates,
            });
        }

        let count = deduped.fresh.len();
        let ids = self
            .store
            .add_all(deduped.fresh)
            .await
            .map_err(|source| LedgerError::ImportCommit { count, source })?;

        info!(count, reconciled = mark_reconciled, "Committed CSV import");
        self.refresh_mirror().await;
        Ok(ImportSummary { ids, duplicates })
    }

    pub async fn export(&self) -> Result<ExportDocument, LedgerError> {
        let entries = self.store.get_all().await?;
        let contents = encode_document(&entries).map_err(StoreError::from)?;
        Ok(ExportDocument {
            file_name: export_file_name(Utc::now().date_naive()),
            contents,
        })
    }

    /// Replaces the whole ledger with a parsed document. No merging or
    /// duplicate checks; ids are kept as they appear in the document.
    pub async fn replace_all(
        &self,
        document: Confirmed<Vec<LedgerEntry>>,
    ) -> Result<usize, LedgerError> {
        let _guard = self.write_lock.lock().await;
        let entries = document.into_inner();
        let count = entries.len();
        self.store.replace_all(entries).await?;
        info!(entries = count, "Replaced ledger from document");
        self.refresh_mirror().await;
        Ok(count)
    }

    async fn refresh_mirror(&self) {
        match backup_to_mirror(&self.store, &self.mirror).await {
            Ok(count) => debug!(entries = count, "Mirror refreshed"),
            Err(e) => warn!("Failed to refresh mirror backup: {e}"),
        }
    }
}

/// Decodes a ledger document. Run this before asking for confirmation, so a
/// bad file never reaches [`Ledger::replace_all`].
pub fn parse_document(text: &str) -> Result<Vec<LedgerEntry>, LedgerError> {
    decode_snapshot(text).map_err(LedgerError::Document)
}

fn export_file_name(date: NaiveDate) -> String {
    format!("checkbook_export_{date}.json")
}
