//! `ferry-core` — the transfer event model.
//!
//! This crate contains **pure domain** types (no storage, no runtime).

pub mod error;
pub mod event;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use event::{ObjectLocation, TransferEvent};
pub use id::EventId;
