//! JSON Lines dead-letter log.
//!
//! Each entry is one line, appended with `O_APPEND` and flushed with
//! `sync_data` before `append` returns. Existing lines are never rewritten,
//! so a crash mid-append can at worst leave a torn final line. Readers skip
//! it and the next append starts on a fresh line.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::warn;

use ferry_core::TransferEvent;

use super::{DeadLetterEntry, DeadLetterError, DeadLetterSink, FailureContext};

/// Append-only dead-letter log stored as JSON Lines.
#[derive(Debug)]
pub struct JsonlDeadLetterSink {
    path: PathBuf,
    // Serialises appends from tasks sharing this sink so lines never interleave.
    write_lock: Mutex<()>,
}

impl JsonlDeadLetterSink {
    /// The file is not touched until the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_line(&self, mut line: Vec<u8>) -> Result<(), DeadLetterError> {
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                DeadLetterError::storage(format!(
                    "failed to create dead-letter directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error("open", e))?;

        // A previous crash may have left a torn line without its newline.
        let len = file
            .metadata()
            .await
            .map_err(|e| self.io_error("stat", e))?
            .len();
        if len > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1))
                .await
                .map_err(|e| self.io_error("seek", e))?;
            file.read_exact(&mut last)
                .await
                .map_err(|e| self.io_error("read", e))?;
            if last[0] != b'\n' {
                line.insert(0, b'\n');
            }
        }

        file.write_all(&line)
            .await
            .map_err(|e| self.io_error("write", e))?;
        file.sync_data()
            .await
            .map_err(|e| self.io_error("sync", e))?;
        Ok(())
    }

    fn io_error(&self, op: &str, err: std::io::Error) -> DeadLetterError {
        DeadLetterError::storage(format!(
            "failed to {op} dead-letter log {}: {err}",
            self.path.display()
        ))
    }
}

#[async_trait]
impl DeadLetterSink for JsonlDeadLetterSink {
    async fn append(
        &self,
        event: &TransferEvent,
        failure: &FailureContext,
    ) -> Result<(), DeadLetterError> {
        let entry = DeadLetterEntry::new(event.clone(), failure.clone());
        let mut line =
            serde_json::to_vec(&entry).map_err(|e| DeadLetterError::Encoding(e.to_string()))?;
        line.push(b'\n');
        self.write_line(line).await
    }
}

/// Read every entry from a dead-letter log.
///
/// A missing file reads as empty. Lines that do not parse (torn writes left
/// by a crash) are skipped with a warning.
pub async fn read_dead_letters(path: impl AsRef<Path>) -> Result<Vec<DeadLetterEntry>, DeadLetterError> {
    let path = path.as_ref();
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(DeadLetterError::storage(format!(
                "failed to read dead-letter log {}: {e}",
                path.display()
            )));
        }
    };

    let mut entries = Vec::new();
    // Split on raw bytes: a torn tail may end inside a multi-byte character.
    for (idx, line) in raw.split(|b| *b == b'\n').enumerate() {
        if line.trim_ascii().is_empty() {
            continue;
        }
        match serde_json::from_slice::<DeadLetterEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    line = idx + 1,
                    error = %e,
                    "skipping unreadable dead-letter line"
                );
            }
        }
    }

    Ok(entries)
}
