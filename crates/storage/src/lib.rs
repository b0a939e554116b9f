pub mod db;
pub mod memory;
pub mod mirror;
pub mod snapshot;
pub mod store;
pub mod sync;

pub use db::{create_db, get_setting, set_setting, DbPool, SqliteStore};
pub use memory::{MemoryMirror, MemoryStore};
pub use mirror::FileMirror;
pub use snapshot::{decode_snapshot, encode_document, encode_snapshot};
pub use store::{EntryStore, MirrorStore, StoreError};
pub use sync::{backup_to_mirror, restore_from_mirror, RestoreOutcome};
