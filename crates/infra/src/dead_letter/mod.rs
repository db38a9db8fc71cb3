//! Dead-letter sink for events that exhausted their retries.
//!
//! The sink is write-only from the worker's point of view: entries are
//! appended, never updated or deduplicated. Inspection and replay happen out
//! of band (see [`read_dead_letters`]).

pub mod in_memory;
pub mod jsonl;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use ferry_core::TransferEvent;

pub use in_memory::InMemoryDeadLetterSink;
pub use jsonl::{JsonlDeadLetterSink, read_dead_letters};

/// Why an event was dead-lettered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureContext {
    /// Error reported by the last transfer attempt.
    pub reason: String,
    /// How many transfer attempts were made.
    pub attempts: u32,
    /// Whether the last error was classified as retryable.
    pub retryable: bool,
}

impl FailureContext {
    pub fn new(reason: impl Into<String>, attempts: u32, retryable: bool) -> Self {
        Self {
            reason: reason.into(),
            attempts,
            retryable,
        }
    }
}

/// Entry in the dead-letter log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub entry_id: Uuid,
    pub event: TransferEvent,
    pub failure: FailureContext,
    pub dead_lettered_at: DateTime<Utc>,
}

impl DeadLetterEntry {
    pub fn new(event: TransferEvent, failure: FailureContext) -> Self {
        Self {
            entry_id: Uuid::now_v7(),
            event,
            failure,
            dead_lettered_at: Utc::now(),
        }
    }
}

/// Dead-letter operation error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeadLetterError {
    #[error("dead-letter storage error: {0}")]
    Storage(String),
    #[error("failed to encode dead-letter entry: {0}")]
    Encoding(String),
}

impl DeadLetterError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

/// Durable, append-only record of terminally failed events.
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    /// Durably append one entry. Previously appended entries are untouched.
    async fn append(
        &self,
        event: &TransferEvent,
        failure: &FailureContext,
    ) -> Result<(), DeadLetterError>;
}

#[async_trait]
impl<T> DeadLetterSink for Arc<T>
where
    T: DeadLetterSink + ?Sized,
{
    async fn append(
        &self,
        event: &TransferEvent,
        failure: &FailureContext,
    ) -> Result<(), DeadLetterError> {
        (**self).append(event, failure).await
    }
}
