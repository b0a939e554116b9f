//! Keeps the primary store and the mirror backup in agreement.
//!
//! At startup the mirror wins: whenever it holds a snapshot, the primary store
//! is rebuilt from it. After each mutation the mirror is rewritten from the
//! primary store.

use tracing::{error, info, warn};

use crate::snapshot::{decode_snapshot, encode_snapshot};
use crate::store::{EntryStore, MirrorStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The primary store now holds exactly the mirror's entries.
    Restored { entries: usize },
    /// No snapshot existed; the primary store was left as it was.
    NoSnapshot,
    /// A snapshot existed but could not be read or decoded; the primary store
    /// was left as it was.
    Unreadable,
}

pub async fn restore_from_mirror<S, M>(store: &S, mirror: &M) -> Result<RestoreOutcome, StoreError>
where
    S: EntryStore,
    M: MirrorStore,
{
    let snapshot = match mirror.read().await {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => {
            info!("No mirror snapshot found, keeping primary store");
            return Ok(RestoreOutcome::NoSnapshot);
        }
        Err(e) => {
            warn!("Failed to read mirror snapshot, keeping primary store: {e}");
            return Ok(RestoreOutcome::Unreadable);
        }
    };

    let entries = match decode_snapshot(&snapshot) {
        Ok(entries) => entries,
        Err(e) => {
            error!("Mirror snapshot is not a valid entry list, keeping primary store: {e}");
            return Ok(RestoreOutcome::Unreadable);
        }
    };

    let count = entries.len();
    store.replace_all(entries).await?;
    info!(entries = count, "Primary store rebuilt from mirror snapshot");
    Ok(RestoreOutcome::Restored { entries: count })
}

/// Overwrites the mirror with the primary store's full contents.
pub async fn backup_to_mirror<S, M>(store: &S, mirror: &M) -> Result<usize, StoreError>
where
    S: EntryStore,
    M: MirrorStore,
{
    let entries = store.get_all().await?;
    mirror.write(encode_snapshot(&entries)?).await?;
    Ok(entries.len())
}
