//! Wiring: build the stores, source and executor from settings and run the
//! worker to completion.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use ferry_infra::transfer::{LocalFsTransfer, SimulatedTransfer};
use ferry_infra::{
    JsonFileSource, JsonlDeadLetterSink, Shutdown, SqliteLedger, TransferExecutor, TransferWorker,
    WorkerStats,
};

use crate::settings::Settings;

/// Run one pass over the configured event file.
pub async fn run(settings: &Settings, shutdown: Shutdown) -> anyhow::Result<WorkerStats> {
    let ledger = SqliteLedger::open(&settings.stores.ledger_path)
        .await
        .with_context(|| {
            format!(
                "failed to open idempotency ledger at {}",
                settings.stores.ledger_path.display()
            )
        })?;
    let dead_letters = JsonlDeadLetterSink::new(&settings.stores.dead_letter_path);
    let source = JsonFileSource::load(&settings.events_path)
        .await
        .with_context(|| format!("failed to load events from {}", settings.events_path.display()))?;

    let executor: Arc<dyn TransferExecutor> = match &settings.transfer_root {
        Some(root) => {
            info!(root = %root.display(), "copying objects on the local file system");
            Arc::new(LocalFsTransfer::new(root))
        }
        None => {
            info!("no transfer root configured; simulating copies");
            Arc::new(SimulatedTransfer::new())
        }
    };

    let worker = Arc::new(TransferWorker::new(
        ledger.clone(),
        dead_letters,
        executor,
        settings.worker.clone(),
    ));

    let stats = worker.run(source, shutdown).await;
    ledger.close().await;
    stats.context("transfer worker stopped on a source failure")
}
