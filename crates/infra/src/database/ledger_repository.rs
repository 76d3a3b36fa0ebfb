//! SQLite-backed implementation of the SentNotificationLedger port.
//!
//! The ledger is the source of truth for exactly-once delivery: the unique
//! key plus `INSERT OR IGNORE` gives first-write-wins semantics without any
//! in-process coordination.

use std::sync::Arc;

use async_trait::async_trait;
use chime_core::ports::SentNotificationLedger;
use chime_domain::{ProviderKind, Result};
use chrono::{DateTime, Utc};
use rusqlite::params;
use tracing::{debug, instrument};

use super::manager::{connection_from, DbPool};
use crate::errors::InfraError;

/// SQLite implementation of SentNotificationLedger.
pub struct SqliteSentNotificationLedger {
    pool: Arc<DbPool>,
}

impl SqliteSentNotificationLedger {
    /// Create a new ledger repository.
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SentNotificationLedger for SqliteSentNotificationLedger {
    #[instrument(skip(self))]
    async fn is_sent(
        &self,
        user_id: i64,
        provider: ProviderKind,
        event_id: &str,
        event_start: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = connection_from(&self.pool)?;

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sent_notifications
                 WHERE user_id = ?1 AND provider = ?2
                   AND event_id = ?3 AND event_start_ts = ?4",
                params![user_id, provider.as_str(), event_id, event_start.timestamp()],
                |row| row.get(0),
            )
            .map_err(InfraError::from)?;

        Ok(count > 0)
    }

    #[instrument(skip(self))]
    async fn mark_sent(
        &self,
        user_id: i64,
        provider: ProviderKind,
        event_id: &str,
        event_start: DateTime<Utc>,
    ) -> Result<()> {
        let conn = connection_from(&self.pool)?;

        // First-write-wins: a duplicate tuple is a no-op, not an error.
        conn.execute(
            "INSERT OR IGNORE INTO sent_notifications
                (user_id, provider, event_id, event_start_ts, notified_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id,
                provider.as_str(),
                event_id,
                event_start.timestamp(),
                Utc::now().timestamp(),
            ],
        )
        .map_err(InfraError::from)?;

        Ok(())
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
                "DELETE FROM sent_notifications
                 WHERE user_id = ?1 AND provider = ?2 AND event_start_ts < ?3",
                params![user_id, provider.as_str(), cutoff.timestamp()],
            )
            .map_err(InfraError::from)?;

        debug!(user_id, provider = %provider, deleted, "pruned ledger entries");

        Ok(deleted)
    }
}
