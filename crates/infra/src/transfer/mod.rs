//! Transfer executors: the thing that actually copies an object.
//!
//! Executors report failures as [`TransferError`], split into transient
//! failures (worth retrying) and permanent ones (retrying cannot help).

pub mod local_fs;
pub mod simulated;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use ferry_core::ObjectLocation;

pub use local_fs::LocalFsTransfer;
pub use simulated::SimulatedTransfer;

/// Transfer failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransferError {
    /// Expected to go away on retry (timeouts, throttling, flaky I/O).
    #[error("transient transfer failure: {0}")]
    Transient(String),
    /// Will fail the same way every time (missing source, bad descriptor).
    #[error("permanent transfer failure: {0}")]
    Permanent(String),
}

impl TransferError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn permanent(msg: impl Into<String>) -> Self {
        Self::Permanent(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, TransferError::Transient(_))
    }
}

/// Copies one object from `source` to `destination`.
#[async_trait]
pub trait TransferExecutor: Send + Sync {
    async fn copy(
        &self,
        source: &ObjectLocation,
        destination: &ObjectLocation,
    ) -> Result<(), TransferError>;
}

#[async_trait]
impl<T> TransferExecutor for Arc<T>
where
    T: TransferExecutor + ?Sized,
{
    async fn copy(
        &self,
        source: &ObjectLocation,
        destination: &ObjectLocation,
    ) -> Result<(), TransferError> {
        (**self).copy(source, destination).await
    }
}
