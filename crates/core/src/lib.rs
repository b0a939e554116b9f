pub mod confirm;
pub mod entry;
pub mod money;
pub mod period;
pub mod register;

pub use confirm::Confirmed;
pub use entry::{EntryId, EntryKind, LedgerEntry, NewEntry, UNCATEGORIZED};
pub use money::Money;
pub use period::DateRange;
pub use register::{
    render, suggestions, EntryFilter, ParseOptionError, ReconciledFilter, RegisterRow, SortOrder,
    Suggestions,
};
