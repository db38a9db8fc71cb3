//! Transfer worker: pulls events, guards against redelivery, retries failed
//! copies with backoff and dead-letters what cannot be copied.
//!
//! Per event:
//!
//! ```text
//! Fetched ─┬─> Skipped                      (ledger already has the id)
//!          └─> Attempting ─┬─> Succeeded    (copy ok, id recorded)
//!                          ├─> Duplicate    (copy ok, another worker recorded it first)
//!                          ├─> Exhausted    (attempts used up or permanent error, dead-lettered)
//!                          └─> Interrupted  (shutdown during backoff)
//! ```
//!
//! Retry state lives on the stack of the task handling the event; nothing is
//! shared between events except the ledger, the sink and the executor.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use ferry_core::{EventId, TransferEvent};

use super::shutdown::Shutdown;
use crate::config::WorkerConfig;
use crate::dead_letter::{DeadLetterError, DeadLetterSink, FailureContext};
use crate::idempotency::{IdempotencyLedger, LedgerError};
use crate::source::{EventSource, SourceError};
use crate::transfer::TransferExecutor;

/// Terminal state of one event delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Outcome {
    /// Already processed; the executor was not called.
    Skipped,
    /// Copied and recorded in the ledger.
    Succeeded { attempts: u32 },
    /// Copied, but a concurrent worker recorded the id first. No-op success.
    Duplicate { attempts: u32 },
    /// Dead-lettered; not recorded as processed.
    Exhausted { attempts: u32, retryable: bool },
    /// Shutdown arrived while waiting to retry; neither recorded nor
    /// dead-lettered, so a redelivery starts from scratch.
    Interrupted { attempts: u32 },
}

/// Durable store failure while resolving an event.
///
/// These are never swallowed: they mean the ledger or dead-letter log may not
/// reflect what happened to the event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProcessError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    DeadLetter(#[from] DeadLetterError),
}

/// Failure of the worker loop as a whole.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("event source failed: {0}")]
    Source(#[from] SourceError),
    #[error("concurrency limiter closed")]
    LimiterClosed,
}

/// Worker runtime statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    pub processed: u64,
    pub succeeded: u64,
    pub skipped: u64,
    pub duplicates: u64,
    pub dead_lettered: u64,
    pub interrupted: u64,
    /// Events whose processing hit a durable store failure or panicked.
    pub failed: u64,
    pub elapsed_ms: u64,
}

impl WorkerStats {
    fn record(&mut self, outcome: &Outcome) {
        self.processed += 1;
        match outcome {
            Outcome::Skipped => self.skipped += 1,
            Outcome::Succeeded { .. } => self.succeeded += 1,
            Outcome::Duplicate { .. } => self.duplicates += 1,
            Outcome::Exhausted { .. } => self.dead_lettered += 1,
            Outcome::Interrupted { .. } => self.interrupted += 1,
        }
    }

    fn record_failure(&mut self) {
        self.processed += 1;
        self.failed += 1;
    }
}

type TaskResult = (EventId, Result<Outcome, ProcessError>);

/// Orchestrates ledger, executor and dead-letter sink for each event.
pub struct TransferWorker<L, D, X> {
    ledger: L,
    dead_letters: D,
    executor: X,
    config: WorkerConfig,
}

impl<L, D, X> TransferWorker<L, D, X>
where
    L: IdempotencyLedger,
    D: DeadLetterSink,
    X: TransferExecutor,
{
    pub fn new(ledger: L, dead_letters: D, executor: X, config: WorkerConfig) -> Self {
        Self {
            ledger,
            dead_letters,
            executor,
            config,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn dead_letters(&self) -> &D {
        &self.dead_letters
    }

    /// Resolve a single delivery of `event`.
    ///
    /// Transfer failures never surface here; they end in `Exhausted`. Only
    /// ledger and dead-letter failures are returned as errors.
    pub async fn process(
        &self,
        event: &TransferEvent,
        shutdown: &mut Shutdown,
    ) -> Result<Outcome, ProcessError> {
        let event_id = &event.event_id;

        if self.ledger.is_processed(event_id).await? {
            info!(worker = %self.config.name, event_id = %event_id, "skipping duplicate event");
            return Ok(Outcome::Skipped);
        }

        let max_attempts = self.config.max_attempts();
        let mut attempt: u32 = 0;

        loop {
            let err = match self.executor.copy(&event.source, &event.destination).await {
                Ok(()) => return self.record_success(event_id, attempt + 1).await,
                Err(err) => err,
            };

            let attempts = attempt + 1;
            if !err.is_retryable() || attempts >= max_attempts {
                warn!(
                    worker = %self.config.name,
                    event_id = %event_id,
                    attempts,
                    error = %err,
                    "transfer failed; sending event to dead-letter sink"
                );
                let failure = FailureContext::new(err.to_string(), attempts, err.is_retryable());
                self.dead_letters.append(event, &failure).await?;
                return Ok(Outcome::Exhausted {
                    attempts,
                    retryable: failure.retryable,
                });
            }

            let delay = self.config.backoff.delay(attempt);
            debug!(
                worker = %self.config.name,
                event_id = %event_id,
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "transfer failed; backing off"
            );

            tokio::select! {
                biased;
                _ = shutdown.requested() => {
                    warn!(
                        worker = %self.config.name,
                        event_id = %event_id,
                        attempts,
                        "shutdown during backoff; leaving event for redelivery"
                    );
                    return Ok(Outcome::Interrupted { attempts });
                }
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }

    async fn record_success(&self, event_id: &EventId, attempts: u32) -> Result<Outcome, ProcessError> {
        match self.ledger.mark_processed(event_id).await {
            Ok(()) => {
                info!(worker = %self.config.name, event_id = %event_id, attempts, "transfer completed");
                Ok(Outcome::Succeeded { attempts })
            }
            Err(LedgerError::Conflict(_)) => {
                info!(
                    worker = %self.config.name,
                    event_id = %event_id,
                    attempts,
                    "event already recorded by a concurrent worker"
                );
                Ok(Outcome::Duplicate { attempts })
            }
            Err(err) => Err(err.into()),
        }
    }
}

impl<L, D, X> TransferWorker<L, D, X>
where
    L: IdempotencyLedger + 'static,
    D: DeadLetterSink + 'static,
    X: TransferExecutor + 'static,
{
    /// Pull and process events until the source is exhausted or shutdown is
    /// requested.
    ///
    /// Up to `max_concurrent` distinct events are in flight at once. One
    /// event's failure never stops the loop; only a failing source does, and
    /// even then in-flight events are allowed to finish first.
    pub async fn run<S>(
        self: Arc<Self>,
        mut source: S,
        mut shutdown: Shutdown,
    ) -> Result<WorkerStats, WorkerError>
    where
        S: EventSource,
    {
        let name = self.config.name.clone();
        info!(
            worker = %name,
            max_attempts = self.config.max_attempts(),
            max_concurrent = self.config.concurrency(),
            "transfer worker started"
        );

        let start_time = Instant::now();
        let limit = Arc::new(Semaphore::new(self.config.concurrency()));
        let mut tasks: JoinSet<TaskResult> = JoinSet::new();
        let mut stats = WorkerStats::default();
        let mut source_error = None;

        loop {
            while let Some(joined) = tasks.try_join_next() {
                settle(&name, &mut stats, joined);
            }

            let permit = tokio::select! {
                biased;
                _ = shutdown.requested() => {
                    info!(worker = %name, "shutdown requested; no longer pulling events");
                    break;
                }
                permit = limit.clone().acquire_owned() => {
                    permit.map_err(|_| WorkerError::LimiterClosed)?
                }
            };

            let event = match source.next().await {
                Ok(Some(event)) => event,
                Ok(None) => {
                    debug!(worker = %name, "event source exhausted");
                    break;
                }
                Err(err) => {
                    error!(worker = %name, error = %err, "event source failed");
                    source_error = Some(err);
                    break;
                }
            };

            let worker = self.clone();
            let mut task_shutdown = shutdown.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let result = worker.process(&event, &mut task_shutdown).await;
                (event.event_id, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            settle(&name, &mut stats, joined);
        }
        stats.elapsed_ms = start_time.elapsed().as_millis() as u64;

        info!(
            worker = %name,
            processed = stats.processed,
            succeeded = stats.succeeded,
            skipped = stats.skipped,
            duplicates = stats.duplicates,
            dead_lettered = stats.dead_lettered,
            interrupted = stats.interrupted,
            failed = stats.failed,
            elapsed_ms = stats.elapsed_ms,
            "transfer worker stopped"
        );

        match source_error {
            Some(err) => Err(err.into()),
            None => Ok(stats),
        }
    }
}

fn settle(worker: &str, stats: &mut WorkerStats, joined: Result<TaskResult, JoinError>) {
    match joined {
        Ok((_, Ok(outcome))) => stats.record(&outcome),
        Ok((event_id, Err(err))) => {
            error!(
                worker,
                event_id = %event_id,
                error = %err,
                "durable store failure; event outcome may not be recorded"
            );
            stats.record_failure();
        }
        Err(err) => {
            error!(worker, error = %err, "event task panicked");
            stats.record_failure();
        }
    }
}
