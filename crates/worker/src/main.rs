use ferry_infra::ShutdownHandle;
use ferry_worker::{Settings, app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env();
    ferry_observability::tracing::init(
        settings
            .as_ref()
            .map(|s| s.log_format)
            .unwrap_or_default(),
    );
    let settings = settings?;

    let (handle, shutdown) = ShutdownHandle::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; finishing in-flight events");
            handle.shutdown();
        }
    });

    let stats = app::run(&settings, shutdown).await?;

    tracing::info!(
        processed = stats.processed,
        succeeded = stats.succeeded,
        skipped = stats.skipped,
        dead_lettered = stats.dead_lettered,
        failed = stats.failed,
        "run complete"
    );
    Ok(())
}
