//! SQLite-backed implementation of the ConnectionRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use chime_core::ports::ConnectionRepository;
use chime_domain::{CalendarConnection, Credential, ProviderKind, Result};
use rusqlite::{params, Row};
use tracing::{debug, instrument};

use super::manager::{connection_from, datetime_from_ts, DbPool};
use crate::errors::InfraError;

/// SQLite implementation of ConnectionRepository.
pub struct SqliteConnectionRepository {
    pool: Arc<DbPool>,
}

impl SqliteConnectionRepository {
    /// Create a new connection repository.
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

type ConnectionRow =
    (i64, String, String, Option<String>, Option<i64>, Option<String>, Option<String>, i64, i64);

fn read_row(row: &Row<'_>) -> rusqlite::Result<ConnectionRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

fn into_connection(raw: ConnectionRow) -> Result<CalendarConnection> {
    let (user_id, provider, access, refresh, expires_ts, cal_id, cal_name, created, updated) = raw;
    let expires_at = expires_ts.map(datetime_from_ts).transpose()?;
    Ok(CalendarConnection {
        user_id,
        provider: provider.parse::<ProviderKind>()?,
        credential: Credential::new(access, refresh, expires_at),
        calendar_id: cal_id,
        calendar_name: cal_name,
        created_at: datetime_from_ts(created)?,
        updated_at: datetime_from_ts(updated)?,
    })
}

const SELECT_COLUMNS: &str = "user_id, provider, access_token, refresh_token, token_expires_at,
                              calendar_id, calendar_name, created_at, updated_at";

#[async_trait]
impl ConnectionRepository for SqliteConnectionRepository {
    #[instrument(skip(self, connection), fields(user_id = connection.user_id, provider = %connection.provider))]
    async fn save(&self, connection: &CalendarConnection) -> Result<()> {
        let conn = connection_from(&self.pool)?;

        // Full-row replace: a new connection for the same (user, provider)
        // overwrites every field atomically.
        conn.execute(
            "INSERT INTO calendar_connections (
                user_id, provider, access_token, refresh_token, token_expires_at,
                calendar_id, calendar_name, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(user_id, provider) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                token_expires_at = excluded.token_expires_at,
                calendar_id = excluded.calendar_id,
                calendar_name = excluded.calendar_name,
                updated_at = excluded.updated_at",
            params![
                connection.user_id,
                connection.provider.as_str(),
                connection.credential.access_token,
                connection.credential.refresh_token,
                connection.credential.expires_at.map(|dt| dt.timestamp()),
                connection.calendar_id,
                connection.calendar_name,
                connection.created_at.timestamp(),
                connection.updated_at.timestamp(),
            ],
        )
        .map_err(InfraError::from)?;

        debug!("saved calendar connection");

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get(
        &self,
        user_id: i64,
        provider: ProviderKind,
    ) -> Result<Option<CalendarConnection>> {
        let conn = connection_from(&self.pool)?;

        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM calendar_connections
             WHERE user_id = ?1 AND provider = ?2"
        );

        let result =
            conn.query_row(&sql, params![user_id, provider.as_str()], read_row);

        match result {
            Ok(raw) => Ok(Some(into_connection(raw)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(err) => Err(InfraError::from(err).into()),
        }
    }

    #[instrument(skip(self))]
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<CalendarConnection>> {
        let conn = connection_from(&self.pool)?;

        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM calendar_connections
             WHERE user_id = ?1 ORDER BY provider ASC"
        );

        let mut stmt = conn.prepare(&sql).map_err(InfraError::from)?;
        let raw_rows = stmt
            .query_map(params![user_id], read_row)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;

        raw_rows.into_iter().map(into_connection).collect()
    }

    #[instrument(skip(self))]
    async fn delete(&self, user_id: i64, provider: ProviderKind) -> Result<()> {
        let conn = connection_from(&self.pool)?;

        conn.execute(
            "DELETE FROM calendar_connections WHERE user_id = ?1 AND provider = ?2",
            params![user_id, provider.as_str()],
        )
        .map_err(InfraError::from)?;

        debug!(user_id, provider = %provider, "deleted calendar connection");

        Ok(())
    }

    #[instrument(skip(self))]
    async fn active_user_ids(&self) -> Result<Vec<i64>> {
        let conn = connection_from(&self.pool)?;

        let mut stmt = conn
            .prepare("SELECT DISTINCT user_id FROM calendar_connections ORDER BY user_id ASC")
            .map_err(InfraError::from)?;

        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;

        Ok(ids)
    }
}
