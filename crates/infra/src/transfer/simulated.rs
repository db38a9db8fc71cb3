use async_trait::async_trait;
use tracing::info;

use ferry_core::ObjectLocation;

use super::{TransferError, TransferExecutor};

/// Executor that only logs the copy it would perform. Always succeeds.
///
/// Lets the whole pipeline run locally without any storage backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedTransfer;

impl SimulatedTransfer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransferExecutor for SimulatedTransfer {
    async fn copy(
        &self,
        source: &ObjectLocation,
        destination: &ObjectLocation,
    ) -> Result<(), TransferError> {
        info!(source = %source, destination = %destination, "simulated copy");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulated_copy_succeeds() {
        let result = SimulatedTransfer::new()
            .copy(&ObjectLocation::new("file.txt"), &ObjectLocation::new("file.txt"))
            .await;
        assert!(result.is_ok());
    }
}
