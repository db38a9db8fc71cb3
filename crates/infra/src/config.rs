//! Configuration for the transfer worker and its stores.
//!
//! Everything is passed in explicitly; nothing here reads the environment
//! or falls back to process-wide default paths.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::backoff::BackoffPolicy;

/// Transfer worker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Name for logging
    pub name: String,
    /// Transfer attempts per event before dead-lettering
    pub max_retries: u32,
    /// Delay policy between attempts
    pub backoff: BackoffPolicy,
    /// Maximum events processed at once (1 = strictly sequential)
    pub max_concurrent: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: "transfer-worker".to_string(),
            max_retries: 5,
            backoff: BackoffPolicy::default(),
            max_concurrent: 1,
        }
    }
}

impl WorkerConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Attempts actually made per event. Every event gets at least one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Concurrency limit actually applied.
    pub fn concurrency(&self) -> usize {
        self.max_concurrent.max(1)
    }
}

/// Locations of the durable stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database holding processed event ids
    pub ledger_path: PathBuf,
    /// JSON Lines dead-letter log
    pub dead_letter_path: PathBuf,
}

impl StoreConfig {
    pub fn new(ledger_path: impl Into<PathBuf>, dead_letter_path: impl Into<PathBuf>) -> Self {
        Self {
            ledger_path: ledger_path.into(),
            dead_letter_path: dead_letter_path.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.max_concurrent, 1);
        assert_eq!(config.backoff, BackoffPolicy::default());
    }

    #[test]
    fn zero_limits_are_clamped() {
        let config = WorkerConfig::default()
            .with_max_retries(0)
            .with_max_concurrent(0);
        assert_eq!(config.max_attempts(), 1);
        assert_eq!(config.concurrency(), 1);
    }

    #[test]
    fn builder_sets_fields() {
        let backoff = BackoffPolicy::new(Duration::from_millis(10), Duration::from_millis(80));
        let config = WorkerConfig::default()
            .with_name("w1")
            .with_max_retries(3)
            .with_backoff(backoff)
            .with_max_concurrent(8);

        assert_eq!(config.name, "w1");
        assert_eq!(config.max_attempts(), 3);
        assert_eq!(config.backoff, backoff);
        assert_eq!(config.concurrency(), 8);
    }
}
