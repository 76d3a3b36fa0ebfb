//! Repository and sender ports implemented by the infrastructure layer.

use async_trait::async_trait;
use chime_domain::{
    CachedEvent, CalendarConnection, CanonicalEvent, NotificationSettings, ProviderKind, Reminder,
    Result, SendOutcome, Statistics, User,
};
use chrono::{DateTime, Utc};

/// Durable, queryable local mirror of canonical events.
#[async_trait]
pub trait EventCacheRepository: Send + Sync {
    /// Insert or fully overwrite the row keyed by
    /// (user, provider, event id, start). Safe to call repeatedly with
    /// identical data.
    async fn upsert(&self, user_id: i64, provider: ProviderKind, event: &CanonicalEvent)
        -> Result<()>;

    /// All cached events for the user with start in `[time_min, time_max)`,
    /// start ascending, optionally filtered by provider.
    async fn events_in_range(
        &self,
        user_id: i64,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        provider: Option<ProviderKind>,
    ) -> Result<Vec<CachedEvent>>;

    /// Delete cached events with start strictly before `cutoff`; returns the
    /// number removed. Events at or after the cutoff are never touched.
    async fn prune_before(
        &self,
        user_id: i64,
        provider: ProviderKind,
        cutoff: DateTime<Utc>,
    ) -> Result<usize>;
}

/// Calendar connections, one row per (user, provider).
#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// Insert or atomically replace the connection for
    /// (connection.user_id, connection.provider).
    async fn save(&self, connection: &CalendarConnection) -> Result<()>;

    async fn get(&self, user_id: i64, provider: ProviderKind)
        -> Result<Option<CalendarConnection>>;

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<CalendarConnection>>;

    async fn delete(&self, user_id: i64, provider: ProviderKind) -> Result<()>;

    /// Distinct ids of users holding at least one connection, ascending.
    async fn active_user_ids(&self) -> Result<Vec<i64>>;
}

/// Bot users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Record a user on first contact. Re-registering an existing id is a
    /// no-op (the id is immutable once created).
    async fn register(
        &self,
        user_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
    ) -> Result<()>;

    async fn get(&self, user_id: i64) -> Result<Option<User>>;

    async fn set_language(&self, user_id: i64, language: &str) -> Result<()>;
}

/// Per-user notification preferences.
#[async_trait]
pub trait NotificationSettingsRepository: Send + Sync {
    /// Settings for the user, lazily defaulted when none are stored yet.
    async fn get(&self, user_id: i64) -> Result<NotificationSettings>;

    async fn update(&self, user_id: i64, settings: NotificationSettings) -> Result<()>;
}

/// Durable record of reminders already sent; the source of truth for
/// exactly-once delivery. Lives apart from the notifier because passes may
/// run in fresh processes — no in-memory state survives between them.
#[async_trait]
pub trait SentNotificationLedger: Send + Sync {
    async fn is_sent(
        &self,
        user_id: i64,
        provider: ProviderKind,
        event_id: &str,
        event_start: DateTime<Utc>,
    ) -> Result<bool>;

    /// Idempotent insert: recording an already-recorded tuple is a no-op,
    /// not an error (first-write-wins).
    async fn mark_sent(
        &self,
        user_id: i64,
        provider: ProviderKind,
        event_id: &str,
        event_start: DateTime<Utc>,
    ) -> Result<()>;

    /// Drop ledger rows for occurrences with start strictly before `cutoff`.
    /// Safe alongside event pruning: a re-arriving occurrence that old has
    /// already passed and can never become due again.
    async fn prune_before(
        &self,
        user_id: i64,
        provider: ProviderKind,
        cutoff: DateTime<Utc>,
    ) -> Result<usize>;
}

/// Operator-editable key→value settings (provider client ids/secrets, bot
/// token, cadences). A missing key means "feature unconfigured", not an
/// error; operations that strictly need one fail with `ChimeError::Config`.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Outbound reminder delivery.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Cheap preflight for the whole pass. Fails with `ChimeError::Config`
    /// when no outbound credential is configured at all — the one condition
    /// that aborts a notify pass early.
    async fn ensure_configured(&self) -> Result<()>;

    /// Render and deliver one reminder to the recipient, in the recipient's
    /// language. Permanent recipient-side failures come back as outcomes
    /// ([`SendOutcome::RecipientBlocked`], [`SendOutcome::RecipientGone`]);
    /// transient failures come back as errors and are retried next pass.
    async fn send_reminder(&self, user_id: i64, reminder: &Reminder) -> Result<SendOutcome>;
}

/// Aggregate statistics for the operational surface.
#[async_trait]
pub trait StatisticsRepository: Send + Sync {
    async fn collect(&self, now: DateTime<Utc>) -> Result<Statistics>;
}
