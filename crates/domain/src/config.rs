//! Application configuration structures.
//!
//! Static configuration loaded at startup (environment or file). Values the
//! operator can edit at runtime live in the `system_settings` store instead
//! and override nothing here; the two layers cover different concerns.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_NOTIFY_CRON, DEFAULT_SYNC_CRON};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub scheduler: SchedulerConfig,
    pub admin: AdminConfig,
}

/// SQLite database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the database file.
    pub path: String,
    /// Connection pool size.
    pub pool_size: u32,
}

/// Cadences for the two background passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Cron expression for the synchronizer pass.
    #[serde(default = "default_sync_cron")]
    pub sync_cron: String,
    /// Cron expression for the notifier pass.
    #[serde(default = "default_notify_cron")]
    pub notify_cron: String,
    /// Whether background scheduling is enabled at all. Manual triggers
    /// keep working either way.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Bind address for the admin/trigger HTTP surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    pub bind_addr: String,
}

fn default_sync_cron() -> String {
    DEFAULT_SYNC_CRON.to_string()
}

fn default_notify_cron() -> String {
    DEFAULT_NOTIFY_CRON.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { sync_cron: default_sync_cron(), notify_cron: default_notify_cron(), enabled: true }
    }
}
