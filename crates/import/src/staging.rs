use checkbook_core::{LedgerEntry, Money, NewEntry};
use tracing::info;

use crate::csv::{parse_bank_csv, CsvError, SkippedRow};
use crate::dedup::remove_existing;
use crate::profile::ProfileRegistry;

/// Parsed, deduplicated rows waiting for the operator to confirm them.
#[derive(Debug, Clone)]
pub struct PendingImport {
    profile: String,
    entries: Vec<NewEntry>,
    duplicates: usize,
    skipped: Vec<SkippedRow>,
}

impl PendingImport {
    /// Runs the full pipeline: tokenize, detect, extract, drop rows already
    /// present in `existing`.
    pub fn stage(
        text: &str,
        registry: &ProfileRegistry,
        existing: &[LedgerEntry],
    ) -> Result<Self, CsvError> {
        let parsed = parse_bank_csv(text, registry)?;
        let deduped = remove_existing(parsed.rows, existing);

        info!(
            profile = %parsed.profile,
            new = deduped.fresh.len(),
            duplicates = deduped.duplicates.len(),
            skipped = parsed.skipped.len(),
            "Staged CSV import"
        );

        Ok(PendingImport {
            profile: parsed.profile,
            entries: deduped.fresh,
            duplicates: deduped.duplicates.len(),
            skipped: parsed.skipped,
        })
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn entries(&self) -> &[NewEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn skipped(&self) -> &[SkippedRow] {
        &self.skipped
    }

    pub fn total(&self) -> Money {
        self.entries.iter().map(|e| e.amount).sum()
    }

    /// Consumes the batch, applying the single reconciled choice to every row.
    pub fn into_entries(self, mark_reconciled: bool) -> Vec<NewEntry> {
        self.entries
            .into_iter()
            .map(|mut e| {
                e.reconciled = mark_reconciled;
                e
            })
            .collect()
    }
}
