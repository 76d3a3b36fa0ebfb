//! Synchronizer: provider → event cache reconciliation.

pub mod service;

pub use service::{SyncOptions, SyncService};
