//! Infrastructure layer: stores, event sources, transfer executors and the
//! worker loop that ties them together.

pub mod backoff;
pub mod config;
pub mod dead_letter;
pub mod idempotency;
pub mod source;
pub mod transfer;
pub mod workers;

#[cfg(test)]
pub(crate) mod testing;

pub use backoff::BackoffPolicy;
pub use config::{StoreConfig, WorkerConfig};
pub use dead_letter::{DeadLetterEntry, DeadLetterSink, FailureContext, JsonlDeadLetterSink};
pub use idempotency::{IdempotencyLedger, LedgerError, SqliteLedger};
pub use source::{EventSource, JsonFileSource};
pub use transfer::{TransferError, TransferExecutor};
pub use workers::{Outcome, Shutdown, ShutdownHandle, TransferWorker, WorkerStats};
