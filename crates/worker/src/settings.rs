//! Process settings read from `FERRY_*` environment variables.
//!
//! This is the only place the environment is consulted; everything below it
//! receives explicit configuration.

use std::path::PathBuf;
use std::time::Duration;

use ferry_infra::{BackoffPolicy, StoreConfig, WorkerConfig};
use ferry_observability::LogFormat;
use thiserror::Error;

pub const EVENTS_PATH: &str = "FERRY_EVENTS_PATH";
pub const LEDGER_PATH: &str = "FERRY_LEDGER_PATH";
pub const DLQ_PATH: &str = "FERRY_DLQ_PATH";
pub const MAX_RETRIES: &str = "FERRY_MAX_RETRIES";
pub const BACKOFF_BASE_MS: &str = "FERRY_BACKOFF_BASE_MS";
pub const BACKOFF_CAP_MS: &str = "FERRY_BACKOFF_CAP_MS";
pub const CONCURRENCY: &str = "FERRY_CONCURRENCY";
pub const TRANSFER_ROOT: &str = "FERRY_TRANSFER_ROOT";
pub const LOG_FORMAT: &str = "FERRY_LOG_FORMAT";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid value '{value}' for {var}: {reason}")]
pub struct SettingsError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Everything the worker binary needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub events_path: PathBuf,
    pub stores: StoreConfig,
    pub worker: WorkerConfig,
    /// When set, copies are performed on the local disk under this root;
    /// otherwise they are only simulated.
    pub transfer_root: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |var: &str, default: &str| {
            PathBuf::from(lookup(var).unwrap_or_else(|| default.to_string()))
        };

        let defaults = WorkerConfig::default();
        let backoff = BackoffPolicy::new(
            parse(&lookup, BACKOFF_BASE_MS)?
                .map(Duration::from_millis)
                .unwrap_or(defaults.backoff.base),
            parse(&lookup, BACKOFF_CAP_MS)?
                .map(Duration::from_millis)
                .unwrap_or(defaults.backoff.cap),
        );

        let max_retries: u32 = parse(&lookup, MAX_RETRIES)?.unwrap_or(defaults.max_retries);
        if max_retries == 0 {
            return Err(SettingsError {
                var: MAX_RETRIES,
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let concurrency: usize = parse(&lookup, CONCURRENCY)?.unwrap_or(defaults.max_concurrent);

        let log_format = match lookup(LOG_FORMAT) {
            Some(raw) => raw.parse().map_err(|reason| SettingsError {
                var: LOG_FORMAT,
                value: raw,
                reason,
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            events_path: path(EVENTS_PATH, "events.json"),
            stores: StoreConfig::new(
                path(LEDGER_PATH, "idempotency.db"),
                path(DLQ_PATH, "dlq.jsonl"),
            ),
            worker: defaults
                .with_max_retries(max_retries)
                .with_backoff(backoff)
                .with_max_concurrent(concurrency.max(1)),
            transfer_root: lookup(TRANSFER_ROOT).map(PathBuf::from),
            log_format,
        })
    }
}

fn parse<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, SettingsError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|e: T::Err| SettingsError {
            var,
            reason: e.to_string(),
            value: raw,
        }),
    }
}
