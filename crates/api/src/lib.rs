//! # Chime API
//!
//! Application layer - wiring and the operational HTTP surface.
//!
//! This crate contains:
//! - Application context (dependency injection)
//! - Admin/trigger HTTP routes (manual sync/notify, health, stats)
//! - Main entry point and setup
//!
//! ## Architecture
//! - Depends on `chime-domain`, `chime-core`, and `chime-infra`
//! - Wires up the hexagonal architecture
//! - Owns process concerns: logging init, schedulers, graceful shutdown

pub mod context;
pub mod routes;
pub mod utils;

// Re-export for convenience
pub use context::AppContext;
pub use routes::router;
