//! Event source backed by a JSON file holding an array of events.

use std::path::Path;

use async_trait::async_trait;
use tracing::{info, warn};

use ferry_core::TransferEvent;

use super::{EventSource, InMemorySource, SourceError};

/// Loads every event from a JSON array file up front, then hands them out in
/// file order.
#[derive(Debug, Default, Clone)]
pub struct JsonFileSource {
    inner: InMemorySource,
}

impl JsonFileSource {
    /// Load events from `path`.
    ///
    /// A missing file is not an error: it logs a warning and yields an empty
    /// queue. A file that is not a JSON array of events is.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "event file not found; using empty queue");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(SourceError::Io(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        let events: Vec<TransferEvent> = serde_json::from_slice(&raw)
            .map_err(|e| SourceError::Decode(format!("{}: {e}", path.display())))?;

        info!(path = %path.display(), count = events.len(), "loaded events");
        Ok(Self {
            inner: InMemorySource::new(events),
        })
    }

    pub fn remaining(&self) -> usize {
        self.inner.remaining()
    }
}

#[async_trait]
impl EventSource for JsonFileSource {
    async fn next(&mut self) -> Result<Option<TransferEvent>, SourceError> {
        self.inner.next().await
    }
}
