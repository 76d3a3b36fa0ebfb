//! # Chime Core
//!
//! Port interfaces and the two pass services (Synchronizer, Notifier).
//!
//! This crate contains:
//! - Repository and sender ports implemented by `chime-infra`
//! - The calendar provider port implemented once per provider
//! - `SyncService`: provider → event cache reconciliation
//! - `NotifyService`: event cache + dedup ledger → outbound reminders
//!
//! ## Architecture
//! - Depends only on `chime-domain`
//! - All I/O goes through injected ports; no ambient global state
//! - Every mutation behind the ports is an upsert or idempotent insert, so
//!   both services are safe to re-run, interrupt, and overlap

pub mod calendar_ports;
pub mod notify;
pub mod ports;
pub mod sync;

pub use calendar_ports::CalendarProvider;
pub use notify::NotifyService;
pub use ports::{
    ConnectionRepository, EventCacheRepository, MessageSender, NotificationSettingsRepository,
    SentNotificationLedger, SettingsStore, UserRepository,
};
pub use sync::{SyncOptions, SyncService};
