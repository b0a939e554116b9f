//! JSON encoding of the full entry set, shared by the mirror backup and the
//! file export/import path.

use checkbook_core::LedgerEntry;

pub fn encode_snapshot(entries: &[LedgerEntry]) -> Result<String, serde_json::Error> {
    serde_json::to_string(entries)
}

/// Indented form offered to the operator as an export file.
pub fn encode_document(entries: &[LedgerEntry]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(entries)
}

pub fn decode_snapshot(text: &str) -> Result<Vec<LedgerEntry>, serde_json::Error> {
    serde_json::from_str(text)
}
