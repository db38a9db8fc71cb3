//! Idempotency ledger: the durable set of event ids that completed.
//!
//! The ledger is the single source of truth for "this event has been
//! transferred". The worker checks it before copying and records into it
//! after a successful copy. The check and the record are two separate
//! calls, so two workers can both see an id as unprocessed; the ledger's
//! uniqueness constraint on write is what serialises them. A write that hits
//! an existing id reports [`LedgerError::Conflict`], which callers treat as
//! "already done", never as corruption.

pub mod in_memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use ferry_core::EventId;

pub use in_memory::InMemoryLedger;
pub use sqlite::SqliteLedger;

/// Ledger operation error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The id is already recorded. Benign: the ledger already reflects the
    /// desired state.
    #[error("event already recorded as processed: {0}")]
    Conflict(EventId),

    /// The underlying store failed for a reason unrelated to duplicates.
    #[error("ledger storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, LedgerError::Conflict(_))
    }
}

/// Durable record of which events completed successfully.
#[async_trait]
pub trait IdempotencyLedger: Send + Sync {
    /// `true` only if a prior `mark_processed` for this id has committed.
    async fn is_processed(&self, event_id: &EventId) -> Result<bool, LedgerError>;

    /// Record the id as processed.
    ///
    /// Returns `Err(LedgerError::Conflict)` if the id is already present.
    async fn mark_processed(&self, event_id: &EventId) -> Result<(), LedgerError>;
}

#[async_trait]
impl<T> IdempotencyLedger for Arc<T>
where
    T: IdempotencyLedger + ?Sized,
{
    async fn is_processed(&self, event_id: &EventId) -> Result<bool, LedgerError> {
        (**self).is_processed(event_id).await
    }

    async fn mark_processed(&self, event_id: &EventId) -> Result<(), LedgerError> {
        (**self).mark_processed(event_id).await
    }
}
