//! # Chime Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - Database implementations (SQLite via rusqlite + r2d2)
//! - Calendar provider adapters (Google REST, CalDAV document)
//! - Telegram outbound sender with localized message catalog
//! - Cron schedulers driving the two pass services
//! - Configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `chime-core`
//! - Depends on `chime-domain` and `chime-core`
//! - Contains all "impure" code (I/O, network, clock-adjacent glue)

pub mod config;
pub mod database;
pub mod errors;
pub mod integrations;
pub mod scheduling;

// Re-export commonly used items
pub use database::{
    DbManager, SqliteConnectionRepository, SqliteEventCacheRepository,
    SqliteNotificationSettingsRepository, SqliteSentNotificationLedger, SqliteSettingsStore,
    SqliteStatisticsRepository, SqliteUserRepository,
};
pub use errors::InfraError;
pub use integrations::calendar::providers::{create_provider, create_provider_by_name};
pub use integrations::telegram::TelegramSender;
pub use scheduling::{
    NotifyScheduler, NotifySchedulerConfig, SchedulerError, SchedulerResult, SyncScheduler,
    SyncSchedulerConfig,
};
