//! SQLite-backed implementation of the EventCacheRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use chime_core::ports::EventCacheRepository;
use chime_domain::{CachedEvent, CanonicalEvent, ProviderKind, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, ToSql};
use tracing::{debug, instrument};

use super::manager::{connection_from, datetime_from_ts, DbPool};
use crate::errors::InfraError;

/// SQLite implementation of EventCacheRepository.
pub struct SqliteEventCacheRepository {
    pool: Arc<DbPool>,
}

impl SqliteEventCacheRepository {
    /// Create a new event cache repository.
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventCacheRepository for SqliteEventCacheRepository {
    #[instrument(skip(self, event), fields(event_id = %event.event_id))]
    async fn upsert(
        &self,
        user_id: i64,
        provider: ProviderKind,
        event: &CanonicalEvent,
    ) -> Result<()> {
        let conn = connection_from(&self.pool)?;
        let now = Utc::now().timestamp();

        conn.execute(
            "INSERT INTO event_cache (
                user_id, provider, event_id, title, description, location,
                start_ts, end_ts, html_link, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(user_id, provider, event_id, start_ts) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                location = excluded.location,
                end_ts = excluded.end_ts,
                html_link = excluded.html_link,
                updated_at = excluded.updated_at",
            params![
                user_id,
                provider.as_str(),
                event.event_id,
                event.title,
                event.description,
                event.location,
                event.start.timestamp(),
                event.end.timestamp(),
                event.html_link,
                now,
            ],
        )
        .map_err(InfraError::from)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn events_in_range(
        &self,
        user_id: i64,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        provider: Option<ProviderKind>,
    ) -> Result<Vec<CachedEvent>> {
        let conn = connection_from(&self.pool)?;

        // Half-open window: start in [time_min, time_max).
        let base = "SELECT provider, event_id, title, description, location,
                           start_ts, end_ts, html_link
                    FROM event_cache
                    WHERE user_id = ?1 AND start_ts >= ?2 AND start_ts < ?3";

        let min_ts = time_min.timestamp();
        let max_ts = time_max.timestamp();

        let mut rows = Vec::new();
        let mut push_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<()> {
            let provider_str: String = row.get(0)?;
            rows.push((
                provider_str,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, Option<String>>(7)?,
            ));
            Ok(())
        };

        if let Some(kind) = provider {
            let sql = format!("{base} AND provider = ?4 ORDER BY start_ts ASC");
            let mut stmt = conn.prepare(&sql).map_err(InfraError::from)?;
            let mut result = stmt
                .query(params![user_id, min_ts, max_ts, kind.as_str()])
                .map_err(InfraError::from)?;
            while let Some(row) = result.next().map_err(InfraError::from)? {
                push_row(row).map_err(InfraError::from)?;
            }
        } else {
            let sql = format!("{base} ORDER BY start_ts ASC");
            let mut stmt = conn.prepare(&sql).map_err(InfraError::from)?;
            let mut result =
                stmt.query(params![user_id, min_ts, max_ts]).map_err(InfraError::from)?;
            while let Some(row) = result.next().map_err(InfraError::from)? {
                push_row(row).map_err(InfraError::from)?;
            }
        }

        let mut events = Vec::with_capacity(rows.len());
        for (provider_str, event_id, title, description, location, start_ts, end_ts, html_link) in
            rows
        {
            events.push(CachedEvent::new(
                provider_str.parse()?,
                CanonicalEvent {
                    event_id,
                    title,
                    description,
                    location,
                    start: datetime_from_ts(start_ts)?,
                    end: datetime_from_ts(end_ts)?,
                    html_link,
                },
            ));
        }

        debug!(user_id, count = events.len(), "retrieved cached events");

        Ok(events)
    }

    #[instrument(skip(self))]
    async fn prune_before(
        &self,
        user_id: i64,
        provider: ProviderKind,
        cutoff: DateTime<Utc>,
    ) -> Result<usize> {
        let conn = connection_from(&self.pool)?;

        let deleted = conn
            .execute(
                "DELETE FROM event_cache
                 WHERE user_id = ?1 AND provider = ?2 AND start_ts < ?3",
                [&user_id as &dyn ToSql, &provider.as_str(), &cutoff.timestamp()].as_ref(),
            )
            .map_err(InfraError::from)?;

        debug!(user_id, provider = %provider, deleted, "pruned cached events");

        Ok(deleted)
    }
}
