//! SQLite-backed implementation of the NotificationSettingsRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use chime_core::ports::NotificationSettingsRepository;
use chime_domain::{NotificationSettings, Result};
use rusqlite::params;
use tracing::{debug, instrument};

use super::manager::{connection_from, DbPool};
use crate::errors::InfraError;

/// SQLite implementation of NotificationSettingsRepository.
pub struct SqliteNotificationSettingsRepository {
    pool: Arc<DbPool>,
}

impl SqliteNotificationSettingsRepository {
    /// Create a new notification settings repository.
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationSettingsRepository for SqliteNotificationSettingsRepository {
    #[instrument(skip(self))]
    async fn get(&self, user_id: i64) -> Result<NotificationSettings> {
        let conn = connection_from(&self.pool)?;

        let result = conn.query_row(
            "SELECT lead_minutes, enabled FROM notification_settings WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(NotificationSettings {
                    lead_minutes: row.get::<_, u32>(0)?,
                    enabled: row.get::<_, bool>(1)?,
                })
            },
        );

        match result {
            Ok(settings) => Ok(settings),
            // Lazily defaulted: no row means the user never touched their
            // settings.
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(NotificationSettings::default()),
            Err(err) => Err(InfraError::from(err).into()),
        }
    }

    #[instrument(skip(self))]
    async fn update(&self, user_id: i64, settings: NotificationSettings) -> Result<()> {
        let conn = connection_from(&self.pool)?;

        conn.execute(
            "INSERT INTO notification_settings (user_id, lead_minutes, enabled)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                lead_minutes = excluded.lead_minutes,
                enabled = excluded.enabled",
            params![user_id, settings.lead_minutes, settings.enabled],
        )
        .map_err(InfraError::from)?;

        debug!(user_id, lead_minutes = settings.lead_minutes, enabled = settings.enabled, "updated notification settings");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::database::manager::DbManager;

    fn setup() -> (Arc<DbPool>, TempDir) {
        let temp = TempDir::new().unwrap();
        let manager = DbManager::new(temp.path().join("test.db"), 2).unwrap();
        manager.run_migrations().unwrap();
        (manager.pool(), temp)
    }

    #[tokio::test]
    async fn missing_settings_default_lazily() {
        let (pool, _temp) = setup();
        let repo = SqliteNotificationSettingsRepository::new(pool);

        let settings = repo.get(1).await.unwrap();
        assert_eq!(settings, NotificationSettings::default());
    }

    #[tokio::test]
    async fn update_then_get_round_trips() {
        let (pool, _temp) = setup();
        let repo = SqliteNotificationSettingsRepository::new(pool);

        repo.update(1, NotificationSettings { lead_minutes: 30, enabled: false }).await.unwrap();

        let settings = repo.get(1).await.unwrap();
        assert_eq!(settings.lead_minutes, 30);
        assert!(!settings.enabled);

        repo.update(1, NotificationSettings { lead_minutes: 60, enabled: true }).await.unwrap();
        let settings = repo.get(1).await.unwrap();
        assert_eq!(settings.lead_minutes, 60);
        assert!(settings.enabled);
    }
}
