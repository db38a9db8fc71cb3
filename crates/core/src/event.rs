//! Transfer events as delivered by the queue.
//!
//! An event is immutable once read: the worker never rewrites it, it only
//! decides whether the copy it describes has already happened.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DomainError, DomainResult};
use crate::id::EventId;

/// Where an object lives: `provider://bucket/key`.
///
/// Only `key` is mandatory; provider and bucket are carried through untouched
/// for executors that understand them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            provider: None,
            bucket: None,
            key: key.into(),
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Reject descriptors that cannot address anything.
    pub fn validate(&self) -> DomainResult<()> {
        if self.key.trim().is_empty() {
            return Err(DomainError::validation("location key must not be blank"));
        }
        Ok(())
    }
}

impl core::fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "{provider}://")?;
        }
        if let Some(bucket) = &self.bucket {
            write!(f, "{bucket}/")?;
        }
        f.write_str(&self.key)
    }
}

/// A request to copy one object from `source` to `destination`.
///
/// Fields other than `eventId`, `source` and `destination` are kept verbatim
/// in `payload`, so a dead-lettered event can be replayed exactly as it was
/// received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferEvent {
    #[serde(rename = "eventId")]
    pub event_id: EventId,
    pub source: ObjectLocation,
    pub destination: ObjectLocation,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl TransferEvent {
    pub fn new(event_id: EventId, source: ObjectLocation, destination: ObjectLocation) -> Self {
        Self {
            event_id,
            source,
            destination,
            payload: Map::new(),
        }
    }

    pub fn with_payload_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.payload.insert(name.into(), value);
        self
    }

    pub fn id(&self) -> &EventId {
        &self.event_id
    }
}
