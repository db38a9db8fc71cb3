//! `ferry-worker` — process entry point for the transfer worker.

pub mod app;
pub mod settings;

pub use settings::{Settings, SettingsError};
