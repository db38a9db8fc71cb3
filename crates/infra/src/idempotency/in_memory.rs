use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use ferry_core::EventId;

use super::{IdempotencyLedger, LedgerError};

/// In-memory idempotency ledger.
///
/// Intended for tests/dev. Not durable: membership is lost on drop.
///
/// A poisoned lock is recovered: every write is a single `insert`, so the
/// set is never left half-updated.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    processed: RwLock<HashSet<EventId>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded ids.
    pub fn len(&self) -> usize {
        self.processed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl IdempotencyLedger for InMemoryLedger {
    async fn is_processed(&self, event_id: &EventId) -> Result<bool, LedgerError> {
        let processed = self.processed.read().unwrap_or_else(PoisonError::into_inner);
        Ok(processed.contains(event_id))
    }

    async fn mark_processed(&self, event_id: &EventId) -> Result<(), LedgerError> {
        let mut processed = self
            .processed
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        // `insert` is the uniqueness check: exactly one caller wins.
        if !processed.insert(event_id.clone()) {
            return Err(LedgerError::Conflict(event_id.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> EventId {
        EventId::new(s).unwrap()
    }

    #[tokio::test]
    async fn unknown_ids_are_not_processed() {
        let ledger = InMemoryLedger::new();
        assert!(!ledger.is_processed(&id("e1")).await.unwrap());
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn second_mark_reports_conflict_and_keeps_membership() {
        let ledger = InMemoryLedger::new();

        ledger.mark_processed(&id("e1")).await.unwrap();
        let err = ledger.mark_processed(&id("e1")).await.unwrap_err();

        assert_eq!(err, LedgerError::Conflict(id("e1")));
        assert!(err.is_conflict());
        assert!(ledger.is_processed(&id("e1")).await.unwrap());
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn racing_marks_have_exactly_one_winner() {
        let ledger = std::sync::Arc::new(InMemoryLedger::new());

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let ledger = ledger.clone();
            tasks.push(tokio::spawn(async move {
                ledger.mark_processed(&id("shared")).await
            }));
        }

        let mut wins = 0;
        let mut conflicts = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(()) => wins += 1,
                Err(LedgerError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected ledger error: {other}"),
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(conflicts, 15);
    }

    #[tokio::test]
    async fn poisoned_lock_keeps_serving_membership() {
        let ledger = std::sync::Arc::new(InMemoryLedger::new());
        ledger.mark_processed(&id("before")).await.unwrap();

        let poisoner = ledger.clone();
        std::thread::spawn(move || {
            let _guard = poisoner.processed.write().unwrap();
            panic!("poison the ledger lock");
        })
        .join()
        .unwrap_err();
        assert!(ledger.processed.is_poisoned());

        assert_eq!(ledger.len(), 1);
        assert!(ledger.is_processed(&id("before")).await.unwrap());
        ledger.mark_processed(&id("after")).await.unwrap();
        assert_eq!(ledger.len(), 2);
    }
}
