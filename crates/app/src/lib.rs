pub mod config;
pub mod ledger;

pub use config::{AppConfig, DataPaths};
pub use ledger::{
    parse_document, ExportDocument, ImportSummary, Ledger, LedgerError, PurgeSummary,
};
