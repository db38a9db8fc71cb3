//! Background workers.

pub mod shutdown;
pub mod transfer_worker;

pub use shutdown::{Shutdown, ShutdownHandle};
pub use transfer_worker::{Outcome, ProcessError, TransferWorker, WorkerError, WorkerStats};
