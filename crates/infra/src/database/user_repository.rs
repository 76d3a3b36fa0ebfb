//! SQLite-backed implementation of the UserRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use chime_core::ports::UserRepository;
use chime_domain::{Result, User};
use chrono::Utc;
use rusqlite::params;
use tracing::{debug, instrument};

use super::manager::{connection_from, datetime_from_ts, DbPool};
use crate::errors::InfraError;

/// SQLite implementation of UserRepository.
pub struct SqliteUserRepository {
    pool: Arc<DbPool>,
}

impl SqliteUserRepository {
    /// Create a new user repository.
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    #[instrument(skip(self))]
    async fn register(
        &self,
        user_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
    ) -> Result<()> {
        let conn = connection_from(&self.pool)?;

        // First contact wins; the platform id is immutable and re-registering
        // must not clobber an existing profile.
        conn.execute(
            "INSERT OR IGNORE INTO users (user_id, username, first_name, language, created_at)
             VALUES (?1, ?2, ?3, 'en', ?4)",
            params![user_id, username, first_name, Utc::now().timestamp()],
        )
        .map_err(InfraError::from)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get(&self, user_id: i64) -> Result<Option<User>> {
        let conn = connection_from(&self.pool)?;

        let result = conn.query_row(
            "SELECT user_id, username, first_name, language, created_at
             FROM users WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        );

        match result {
            Ok((user_id, username, first_name, language, created_ts)) => Ok(Some(User {
                user_id,
                username,
                first_name,
                language,
                created_at: datetime_from_ts(created_ts)?,
            })),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(err) => Err(InfraError::from(err).into()),
        }
    }

    #[instrument(skip(self))]
    async fn set_language(&self, user_id: i64, language: &str) -> Result<()> {
        let conn = connection_from(&self.pool)?;

        conn.execute(
            "UPDATE users SET language = ?1 WHERE user_id = ?2",
            params![language, user_id],
        )
        .map_err(InfraError::from)?;

        debug!(user_id, language, "updated user language");

        Ok(())
    }
}
