//! Pass reports and operator statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counters from one synchronizer pass. A pass that reached nothing is not
/// an error; it simply reports zeros and is retried on the next cadence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub users_seen: usize,
    pub connections_seen: usize,
    pub events_upserted: usize,
    pub events_pruned: usize,
    /// Connections skipped or failed this pass (credential problems,
    /// transient fetch errors). Siblings are unaffected.
    pub connection_failures: usize,
}

/// Counters from one notifier pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyReport {
    pub users_seen: usize,
    pub events_due: usize,
    pub reminders_sent: usize,
    /// Occurrences recorded as sent because the recipient is permanently
    /// unreachable (blocked the bot, account gone).
    pub reminders_suppressed: usize,
    /// Transient send failures left unrecorded for retry on the next pass.
    pub send_failures: usize,
}

/// Aggregate system statistics for the operational surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub total_users: usize,
    /// Users with at least one connected calendar.
    pub active_users: usize,
    pub total_connections: usize,
    pub google_connections: usize,
    pub caldav_connections: usize,
    pub notifications_total: usize,
    pub notifications_last_24h: usize,
    pub generated_at: DateTime<Utc>,
}
