//! Test doubles shared by unit and integration tests.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use ferry_core::{EventId, ObjectLocation, TransferEvent};

use crate::dead_letter::{DeadLetterError, DeadLetterSink, FailureContext};
use crate::idempotency::{IdempotencyLedger, LedgerError};
use crate::transfer::{TransferError, TransferExecutor};

pub fn event(id: &str) -> TransferEvent {
    TransferEvent::new(
        EventId::new(id).unwrap(),
        ObjectLocation::new("a"),
        ObjectLocation::new("a"),
    )
}

type CopyFn = Box<dyn Fn(&ObjectLocation) -> Result<(), TransferError> + Send + Sync>;

enum Script {
    Succeed,
    AlwaysFail,
    FailTimes(u32),
    Custom(CopyFn),
}

/// Executor with a fixed behaviour that counts its invocations.
pub struct ScriptedTransfer {
    script: Script,
    calls: AtomicU32,
}

impl ScriptedTransfer {
    fn new(script: Script) -> Self {
        Self {
            script,
            calls: AtomicU32::new(0),
        }
    }

    pub fn succeed() -> Self {
        Self::new(Script::Succeed)
    }

    pub fn always_fail() -> Self {
        Self::new(Script::AlwaysFail)
    }

    /// Fail the first `n` calls with a transient error, then succeed.
    pub fn fail_times(n: u32) -> Self {
        Self::new(Script::FailTimes(n))
    }

    /// Decide per call from the destination.
    pub fn with<F>(f: F) -> Self
    where
        F: Fn(&ObjectLocation) -> Result<(), TransferError> + Send + Sync + 'static,
    {
        Self::new(Script::Custom(Box::new(f)))
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransferExecutor for ScriptedTransfer {
    async fn copy(
        &self,
        _source: &ObjectLocation,
        destination: &ObjectLocation,
    ) -> Result<(), TransferError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Succeed => Ok(()),
            Script::AlwaysFail => Err(TransferError::transient("simulated outage")),
            Script::FailTimes(n) if call < *n => {
                Err(TransferError::transient(format!("simulated failure {}", call + 1)))
            }
            Script::FailTimes(_) => Ok(()),
            Script::Custom(f) => f(destination),
        }
    }
}

/// Ledger whose store is broken.
pub struct FailingLedger;

#[async_trait]
impl IdempotencyLedger for FailingLedger {
    async fn is_processed(&self, _event_id: &EventId) -> Result<bool, LedgerError> {
        Err(LedgerError::storage("disk I/O error"))
    }

    async fn mark_processed(&self, _event_id: &EventId) -> Result<(), LedgerError> {
        Err(LedgerError::storage("disk I/O error"))
    }
}

/// Dead-letter sink whose store is broken.
pub struct FailingSink;

#[async_trait]
impl DeadLetterSink for FailingSink {
    async fn append(
        &self,
        _event: &TransferEvent,
        _failure: &FailureContext,
    ) -> Result<(), DeadLetterError> {
        Err(DeadLetterError::storage("read-only file system"))
    }
}
