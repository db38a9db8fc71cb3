//! Executor that copies files between directories on the local disk.
//!
//! A location maps to `root/<provider>/<bucket>/<key>`, skipping absent
//! parts. The copy lands in a temporary sibling first and is renamed into
//! place, so a destination is either absent or complete.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use ferry_core::ObjectLocation;

use super::{TransferError, TransferExecutor};

const PARTIAL_SUFFIX: &str = ".ferry-partial";

#[derive(Debug, Clone)]
pub struct LocalFsTransfer {
    root: PathBuf,
}

impl LocalFsTransfer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a location to a path under `root`.
    ///
    /// Rejects anything that could escape the root (absolute paths, `..`).
    pub fn resolve(&self, location: &ObjectLocation) -> Result<PathBuf, TransferError> {
        location
            .validate()
            .map_err(|e| TransferError::permanent(e.to_string()))?;

        let mut path = self.root.clone();
        let parts = [
            location.provider.as_deref(),
            location.bucket.as_deref(),
            Some(location.key.as_str()),
        ];
        for part in parts.into_iter().flatten() {
            let relative = Path::new(part);
            if !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
            {
                return Err(TransferError::permanent(format!(
                    "location escapes transfer root: {location}"
                )));
            }
            path.push(relative);
        }
        Ok(path)
    }
}

/// Unique sibling of `to`, so concurrent copies to one destination never
/// share a staging file.
fn staging_path(to: &Path) -> PathBuf {
    let mut staging = to.as_os_str().to_owned();
    staging.push(format!(".{}{PARTIAL_SUFFIX}", Uuid::now_v7().simple()));
    PathBuf::from(staging)
}

fn classify(op: &str, path: &Path, err: std::io::Error) -> TransferError {
    let msg = format!("failed to {op} {}: {err}", path.display());
    match err.kind() {
        ErrorKind::NotFound | ErrorKind::InvalidInput | ErrorKind::IsADirectory => {
            TransferError::Permanent(msg)
        }
        _ => TransferError::Transient(msg),
    }
}

#[async_trait]
impl TransferExecutor for LocalFsTransfer {
    async fn copy(
        &self,
        source: &ObjectLocation,
        destination: &ObjectLocation,
    ) -> Result<(), TransferError> {
        let from = self.resolve(source)?;
        let to = self.resolve(destination)?;

        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| classify("create directory", parent, e))?;
        }

        let staging = staging_path(&to);

        let bytes = match tokio::fs::copy(&from, &staging).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = tokio::fs::remove_file(&staging).await;
                return Err(classify("copy", &from, e));
            }
        };
        if let Err(e) = tokio::fs::rename(&staging, &to).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(classify("rename into", &to, e));
        }

        debug!(from = %from.display(), to = %to.display(), bytes, "copied object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copies_between_buckets() {
        let dir = tempfile::tempdir().unwrap();
        let transfer = LocalFsTransfer::new(dir.path());

        let src = ObjectLocation::new("reports/q1.csv").with_bucket("inbox");
        let dst = ObjectLocation::new("reports/q1.csv").with_bucket("archive");

        let src_path = transfer.resolve(&src).unwrap();
        tokio::fs::create_dir_all(src_path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&src_path, b"a,b\n1,2\n").await.unwrap();

        transfer.copy(&src, &dst).await.unwrap();

        let copied = tokio::fs::read(dir.path().join("archive/reports/q1.csv"))
            .await
            .unwrap();
        assert_eq!(copied, b"a,b\n1,2\n");
        assert!(leftover_partials(&dir.path().join("archive/reports")).is_empty());
    }

    fn leftover_partials(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|p| p.to_string_lossy().ends_with(PARTIAL_SUFFIX))
            .collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_copies_to_one_destination_both_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let transfer = std::sync::Arc::new(LocalFsTransfer::new(dir.path()));

        let src = ObjectLocation::new("in/big.bin");
        let dst = ObjectLocation::new("out/big.bin");
        let payload: Vec<u8> = (0..4 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
        std::fs::create_dir_all(dir.path().join("in")).unwrap();
        std::fs::write(dir.path().join("in/big.bin"), &payload).unwrap();

        for _ in 0..20 {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let transfer = transfer.clone();
                    let (src, dst) = (src.clone(), dst.clone());
                    tokio::spawn(async move { transfer.copy(&src, &dst).await })
                })
                .collect();
            for handle in handles {
                handle.await.unwrap().unwrap();
            }
        }

        assert_eq!(std::fs::read(dir.path().join("out/big.bin")).unwrap(), payload);
        assert!(leftover_partials(&dir.path().join("out")).is_empty());
    }

    #[tokio::test]
    async fn failed_copy_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let transfer = LocalFsTransfer::new(dir.path());

        transfer
            .copy(&ObjectLocation::new("missing.txt"), &ObjectLocation::new("out/x.txt"))
            .await
            .unwrap_err();

        assert!(leftover_partials(&dir.path().join("out")).is_empty());
    }

    #[tokio::test]
    async fn missing_source_is_permanent() {
        let dir = tempfile::tempdir().unwrap();
        let transfer = LocalFsTransfer::new(dir.path());

        let err = transfer
            .copy(&ObjectLocation::new("nope.txt"), &ObjectLocation::new("out.txt"))
            .await
            .unwrap_err();

        assert!(!err.is_retryable(), "expected permanent, got {err:?}");
    }

    #[test]
    fn resolve_rejects_escaping_keys() {
        let transfer = LocalFsTransfer::new("/srv/ferry");

        assert!(transfer.resolve(&ObjectLocation::new("../etc/passwd")).is_err());
        assert!(transfer.resolve(&ObjectLocation::new("/etc/passwd")).is_err());
        assert!(
            transfer
                .resolve(&ObjectLocation::new("k").with_bucket(".."))
                .is_err()
        );
        assert_eq!(
            transfer
                .resolve(&ObjectLocation::new("k").with_provider("aws").with_bucket("b"))
                .unwrap(),
            PathBuf::from("/srv/ferry/aws/b/k")
        );
    }
}
