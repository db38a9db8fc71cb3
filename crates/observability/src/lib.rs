//! Tracing/logging setup shared by the worker binaries.

/// Tracing configuration (filters, formats).
pub mod tracing;

pub use tracing::{LogFormat, init};
