use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use ferry_core::{EventId, TransferEvent};

use super::{DeadLetterEntry, DeadLetterError, DeadLetterSink, FailureContext};

/// In-memory dead-letter sink for tests/dev.
///
/// A poisoned lock is recovered: appends are a single `push`.
#[derive(Debug, Default)]
pub struct InMemoryDeadLetterSink {
    entries: Mutex<Vec<DeadLetterEntry>>,
}

impl InMemoryDeadLetterSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DeadLetterEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of all entries in append order.
    pub fn entries(&self) -> Vec<DeadLetterEntry> {
        self.lock().clone()
    }

    /// Entries recorded for one event id.
    pub fn entries_for(&self, event_id: &EventId) -> Vec<DeadLetterEntry> {
        self.entries()
            .into_iter()
            .filter(|e| &e.event.event_id == event_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DeadLetterSink for InMemoryDeadLetterSink {
    async fn append(
        &self,
        event: &TransferEvent,
        failure: &FailureContext,
    ) -> Result<(), DeadLetterError> {
        self.lock()
            .push(DeadLetterEntry::new(event.clone(), failure.clone()));
        Ok(())
    }
}
