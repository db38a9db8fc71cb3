//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a transfer event.
///
/// Event ids are assigned by the producer, not by the worker, so this is an
/// opaque string rather than a UUID. The only rule is that it is non-blank:
/// the idempotency ledger keys on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventId(String);

impl EventId {
    /// Create an identifier, rejecting blank input.
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::invalid_id("EventId: must not be blank"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for EventId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EventId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EventId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for EventId {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EventId> for String {
    fn from(value: EventId) -> Self {
        value.0
    }
}

impl FromStr for EventId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_ids_are_rejected() {
        assert!(matches!(EventId::new(""), Err(DomainError::InvalidId(_))));
        assert!(matches!(EventId::new("   "), Err(DomainError::InvalidId(_))));
    }

    #[test]
    fn ids_keep_their_exact_text() {
        let id: EventId = " e1 ".parse().unwrap();
        assert_eq!(id.as_str(), " e1 ");
        assert_eq!(id.to_string(), " e1 ");
    }

    #[test]
    fn deserializing_blank_id_fails() {
        let err = serde_json::from_str::<EventId>("\"\"").unwrap_err();
        assert!(err.to_string().contains("must not be blank"));
    }
}
