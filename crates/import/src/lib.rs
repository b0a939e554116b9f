pub mod csv;
pub mod dedup;
pub mod profile;
pub mod staging;

pub use csv::{parse_bank_csv, split_line, CsvError, ParsedCsv, RowError, SkippedRow};
pub use dedup::{remove_existing, Deduplicated};
pub use profile::{AmountColumns, ColumnMap, CsvProfile, ProfileError, ProfileRegistry};
pub use staging::PendingImport;
