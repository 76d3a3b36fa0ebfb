//! SQLite-backed implementation of the StatisticsRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use chime_core::ports::StatisticsRepository;
use chime_domain::{ProviderKind, Result, Statistics};
use chrono::{DateTime, Duration, Utc};
use rusqlite::params;
use tracing::instrument;

use super::manager::{connection_from, DbConnection, DbPool};
use crate::errors::InfraError;

/// SQLite implementation of StatisticsRepository.
pub struct SqliteStatisticsRepository {
    pool: Arc<DbPool>,
}

impl SqliteStatisticsRepository {
    /// Create a new statistics repository.
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

fn count(conn: &DbConnection, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<usize> {
    let n: i64 = conn.query_row(sql, args, |row| row.get(0)).map_err(InfraError::from)?;
    Ok(usize::try_from(n).unwrap_or(0))
}

#[async_trait]
impl StatisticsRepository for SqliteStatisticsRepository {
    #[instrument(skip(self))]
    async fn collect(&self, now: DateTime<Utc>) -> Result<Statistics> {
        let conn = connection_from(&self.pool)?;

        let day_ago = (now - Duration::hours(24)).timestamp();

        Ok(Statistics {
            total_users: count(&conn, "SELECT COUNT(*) FROM users", &[])?,
            active_users: count(
                &conn,
                "SELECT COUNT(DISTINCT user_id) FROM calendar_connections",
                &[],
            )?,
            total_connections: count(&conn, "SELECT COUNT(*) FROM calendar_connections", &[])?,
            google_connections: count(
                &conn,
                "SELECT COUNT(*) FROM calendar_connections WHERE provider = ?1",
                &[&ProviderKind::Google.as_str()],
            )?,
            caldav_connections: count(
                &conn,
                "SELECT COUNT(*) FROM calendar_connections WHERE provider = ?1",
                &[&ProviderKind::CalDav.as_str()],
            )?,
            notifications_total: count(&conn, "SELECT COUNT(*) FROM sent_notifications", &[])?,
            notifications_last_24h: count(
                &conn,
                "SELECT COUNT(*) FROM sent_notifications WHERE notified_at >= ?1",
                &[&day_ago],
            )?,
            generated_at: now,
        })
    }
}
