//! SQLite-backed idempotency ledger.
//!
//! One row per processed event in `processed_events`. The primary key on
//! `event_id` is the serialisation point between workers sharing a file.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::error::DatabaseError;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

use ferry_core::EventId;

use super::{IdempotencyLedger, LedgerError};

/// Durable ledger persisted in a SQLite database file.
///
/// This struct is cheap to clone and is safe to share across tasks.
#[derive(Debug, Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Open (or create) the ledger database at `path`.
    ///
    /// Missing parent directories are created. Reopening the same path yields
    /// the same membership.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                LedgerError::storage(format!(
                    "failed to create ledger directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| {
                LedgerError::storage(format!(
                    "failed to open ledger at {}: {e}",
                    path.display()
                ))
            })?;

        Self::with_pool(pool).await
    }

    /// Private in-memory database (tests/dev).
    ///
    /// Every SQLite `:memory:` connection is its own database, so the pool is
    /// pinned to a single connection that is never recycled.
    pub async fn in_memory() -> Result<Self, LedgerError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| LedgerError::storage(format!("invalid in-memory ledger url: {e}")))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| LedgerError::storage(format!("failed to open in-memory ledger: {e}")))?;

        Self::with_pool(pool).await
    }

    /// Wrap an existing pool, creating the schema if needed.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self, LedgerError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS processed_events (
                event_id      TEXT PRIMARY KEY,
                processed_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| LedgerError::storage(format!("failed to create processed_events table: {e}")))?;

        Ok(Self { pool })
    }

    /// Number of recorded ids.
    pub async fn count(&self) -> Result<u64, LedgerError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM processed_events")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| LedgerError::storage(format!("failed to count processed events: {e}")))?;
        Ok(count.max(0) as u64)
    }

    /// Close all connections, flushing pending writes.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// SQLITE_CONSTRAINT_PRIMARYKEY (1555) or SQLITE_CONSTRAINT_UNIQUE (2067).
fn is_duplicate_key(err: &dyn DatabaseError) -> bool {
    err.is_unique_violation() || matches!(err.code().as_deref(), Some("1555") | Some("2067"))
}

#[async_trait]
impl IdempotencyLedger for SqliteLedger {
    async fn is_processed(&self, event_id: &EventId) -> Result<bool, LedgerError> {
        let row = sqlx::query("SELECT 1 FROM processed_events WHERE event_id = ?1")
            .bind(event_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                LedgerError::storage(format!("failed to query event {event_id}: {e}"))
            })?;
        Ok(row.is_some())
    }

    async fn mark_processed(&self, event_id: &EventId) -> Result<(), LedgerError> {
        let result = sqlx::query(
            r#"
            INSERT INTO processed_events (event_id, processed_at)
            VALUES (?1, ?2)
            "#,
        )
        .bind(event_id.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if is_duplicate_key(db.as_ref()) => {
                Err(LedgerError::Conflict(event_id.clone()))
            }
            Err(e) => Err(LedgerError::storage(format!(
                "failed to record event {event_id}: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> EventId {
        EventId::new(s).unwrap()
    }

    #[tokio::test]
    async fn mark_then_query() {
        let ledger = SqliteLedger::in_memory().await.unwrap();
        let eid = id("test-event-123");

        assert!(!ledger.is_processed(&eid).await.unwrap());
        ledger.mark_processed(&eid).await.unwrap();
        assert!(ledger.is_processed(&eid).await.unwrap());
        assert_eq!(ledger.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_mark_is_a_conflict_not_a_storage_error() {
        let ledger = SqliteLedger::in_memory().await.unwrap();
        let eid = id("dup");

        ledger.mark_processed(&eid).await.unwrap();
        let err = ledger.mark_processed(&eid).await.unwrap_err();

        assert!(err.is_conflict(), "expected conflict, got {err:?}");
        assert!(ledger.is_processed(&eid).await.unwrap());
        assert_eq!(ledger.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn membership_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("idempotency.db");

        {
            let ledger = SqliteLedger::open(&path).await.unwrap();
            ledger.mark_processed(&id("e1")).await.unwrap();
            ledger.close().await;
        }

        let reopened = SqliteLedger::open(&path).await.unwrap();
        assert!(reopened.is_processed(&id("e1")).await.unwrap());
        assert!(!reopened.is_processed(&id("e2")).await.unwrap());
        reopened.close().await;
    }

    #[tokio::test]
    async fn two_handles_on_one_file_serialise_on_the_primary_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.db");

        let a = SqliteLedger::open(&path).await.unwrap();
        let b = SqliteLedger::open(&path).await.unwrap();
        let eid = id("raced");

        // Both observe "unprocessed" before either writes.
        assert!(!a.is_processed(&eid).await.unwrap());
        assert!(!b.is_processed(&eid).await.unwrap());

        let first = a.mark_processed(&eid).await;
        let second = b.mark_processed(&eid).await;

        assert!(first.is_ok());
        assert!(matches!(second, Err(LedgerError::Conflict(_))));

        a.close().await;
        b.close().await;
    }
}
