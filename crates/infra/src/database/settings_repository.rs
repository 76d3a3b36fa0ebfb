//! SQLite-backed implementation of the SettingsStore port.
//!
//! Operator-editable key→value settings (provider client ids/secrets, the
//! bot token, cadences). Reads fall back to the environment so a fresh
//! deployment works before the operator has stored anything.

use std::sync::Arc;

use async_trait::async_trait;
use chime_core::ports::SettingsStore;
use chime_domain::Result;
use chrono::Utc;
use rusqlite::params;
use tracing::{debug, instrument};

use super::manager::{connection_from, DbPool};
use crate::errors::InfraError;

/// SQLite implementation of SettingsStore with environment fallback.
pub struct SqliteSettingsStore {
    pool: Arc<DbPool>,
}

impl SqliteSettingsStore {
    /// Create a new settings store.
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = connection_from(&self.pool)?;

        let result = conn.query_row(
            "SELECT value FROM system_settings WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) if !value.trim().is_empty() => Ok(Some(value)),
            // Blank stored values count as unset.
            Ok(_) | Err(rusqlite::Error::QueryReturnedNoRows) => Ok(env_fallback(key)),
            Err(err) => Err(InfraError::from(err).into()),
        }
    }

    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = connection_from(&self.pool)?;

        conn.execute(
            "INSERT INTO system_settings (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![key, value, Utc::now().timestamp()],
        )
        .map_err(InfraError::from)?;

        debug!(key, "updated system setting");

        Ok(())
    }
}

/// Settings not stored by the operator can come from the environment; the
/// variable name is the key upper-cased (e.g. `telegram_bot_token` →
/// `TELEGRAM_BOT_TOKEN`).
fn env_fallback(key: &str) -> Option<String> {
    std::env::var(key.to_ascii_uppercase()).ok().filter(|v| !v.trim().is_empty())
}
