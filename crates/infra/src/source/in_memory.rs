use std::collections::VecDeque;

use async_trait::async_trait;

use ferry_core::TransferEvent;

use super::{EventSource, SourceError};

/// FIFO source over a fixed list of events.
#[derive(Debug, Default, Clone)]
pub struct InMemorySource {
    queue: VecDeque<TransferEvent>,
}

impl InMemorySource {
    pub fn new(events: impl IntoIterator<Item = TransferEvent>) -> Self {
        Self {
            queue: events.into_iter().collect(),
        }
    }

    pub fn push(&mut self, event: TransferEvent) {
        self.queue.push_back(event);
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

#[async_trait]
impl EventSource for InMemorySource {
    async fn next(&mut self) -> Result<Option<TransferEvent>, SourceError> {
        Ok(self.queue.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::{EventId, ObjectLocation};

    fn event(id: &str) -> TransferEvent {
        TransferEvent::new(
            EventId::new(id).unwrap(),
            ObjectLocation::new("a"),
            ObjectLocation::new("b"),
        )
    }

    #[tokio::test]
    async fn yields_in_order_then_none() {
        let mut source = InMemorySource::new([event("1"), event("2")]);
        source.push(event("3"));

        let mut seen = Vec::new();
        while let Some(e) = source.next().await.unwrap() {
            seen.push(e.event_id.into_inner());
        }

        assert_eq!(seen, vec!["1", "2", "3"]);
        assert!(source.next().await.unwrap().is_none());
        assert_eq!(source.remaining(), 0);
    }
}
