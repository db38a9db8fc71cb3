//! Event sources: where transfer events come from.
//!
//! The worker pulls; a source answers with the next event or `None` once it
//! is exhausted. Delivery is at-least-once, so the same event may appear
//! more than once.

pub mod in_memory;
pub mod json_file;

use async_trait::async_trait;
use thiserror::Error;

use ferry_core::TransferEvent;

pub use in_memory::InMemorySource;
pub use json_file::JsonFileSource;

/// Event source error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("event source I/O error: {0}")]
    Io(String),
    #[error("failed to decode events: {0}")]
    Decode(String),
}

/// Pull-based supplier of transfer events.
#[async_trait]
pub trait EventSource: Send {
    /// The next event, or `None` when the source is exhausted.
    async fn next(&mut self) -> Result<Option<TransferEvent>, SourceError>;
}
