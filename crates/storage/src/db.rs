use checkbook_core::{EntryId, LedgerEntry, Money, NewEntry};
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqliteConnection};
use std::path::Path;

use crate::store::{EntryStore, StoreError};

pub type DbPool = Pool<Sqlite>;

type EntryRow = (i64, String, String, String, i64, i64);

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    // AUTOINCREMENT keeps ids from being reused after deletes or a clear.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            description TEXT NOT NULL,
            category TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            reconciled INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_date ON entries(date)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_reconciled ON entries(reconciled)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_setting(pool: &DbPool, key: &str) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await
}

pub async fn set_setting(pool: &DbPool, key: &str, value: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

/// The primary entry store, backed by the `entries` table.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        SqliteStore { pool }
    }

    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(SqliteStore::new(create_db(path).await?))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn entry_from_row(r: EntryRow) -> Result<LedgerEntry, StoreError> {
    let date = NaiveDate::parse_from_str(&r.1, "%Y-%m-%d").map_err(|e| StoreError::Corrupt {
        id: r.0,
        reason: format!("date '{}': {e}", r.1),
    })?;
    Ok(LedgerEntry {
        id: EntryId(r.0),
        date,
        description: r.2,
        category: r.3,
        amount: Money::from_cents(r.4),
        reconciled: r.5 != 0,
    })
}

async fn insert_new(conn: &mut SqliteConnection, entry: &NewEntry) -> Result<EntryId, sqlx::Error> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO entries (date, description, category, amount_cents, reconciled) VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(entry.date.to_string())
    .bind(&entry.description)
    .bind(&entry.category)
    .bind(entry.amount.to_cents())
    .bind(i64::from(entry.reconciled))
    .fetch_one(conn)
    .await?;
    Ok(EntryId(id))
}

async fn upsert(conn: &mut SqliteConnection, entry: &LedgerEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO entries (id, date, description, category, amount_cents, reconciled)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            date = excluded.date,
            description = excluded.description,
            category = excluded.category,
            amount_cents = excluded.amount_cents,
            reconciled = excluded.reconciled
        "#,
    )
    .bind(entry.id.0)
    .bind(entry.date.to_string())
    .bind(&entry.description)
    .bind(&entry.category)
    .bind(entry.amount.to_cents())
    .bind(i64::from(entry.reconciled))
    .execute(conn)
    .await?;
    Ok(())
}

impl EntryStore for SqliteStore {
    async fn get_all(&self) -> Result<Vec<LedgerEntry>, StoreError> {
        let rows = sqlx::query_as::<_, EntryRow>(
            "SELECT id, date, description, category, amount_cents, reconciled FROM entries ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(entry_from_row).collect()
    }

    async fn get(&self, id: EntryId) -> Result<Option<LedgerEntry>, StoreError> {
        let row = sqlx::query_as::<_, EntryRow>(
            "SELECT id, date, description, category, amount_cents, reconciled FROM entries WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(entry_from_row).transpose()
    }

    async fn add(&self, entry: NewEntry) -> Result<EntryId, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(insert_new(&mut conn, &entry).await?)
    }

    async fn put(&self, entry: &LedgerEntry) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(upsert(&mut conn, entry).await?)
    }

    async fn delete(&self, id: EntryId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM entries WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM entries")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn add_all(&self, entries: Vec<NewEntry>) -> Result<Vec<EntryId>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(entries.len());
        for entry in &entries {
            ids.push(insert_new(&mut tx, entry).await?);
        }
        tx.commit().await?;
        Ok(ids)
    }

    async fn replace_all(&self, entries: Vec<LedgerEntry>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM entries").execute(&mut *tx).await?;
        for entry in &entries {
            upsert(&mut tx, entry).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
