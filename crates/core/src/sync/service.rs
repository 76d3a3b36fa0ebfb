//! Calendar synchronization service - core business logic.
//!
//! One pass walks every user with at least one calendar connection, pulls a
//! wide window of events per connection, reconciles them into the event
//! cache, and prunes entries past the retention horizon. Failures are
//! isolated per connection: one broken calendar never stops the rest of the
//! fleet from synchronizing.

use std::sync::Arc;

use chime_domain::constants::{
    MAX_EVENTS_PER_SYNC, RETENTION_DAYS, SYNC_LOOK_AHEAD_DAYS, SYNC_LOOK_BACK_DAYS,
};
use chime_domain::{CalendarConnection, ChimeError, Result, SyncReport};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, instrument, warn};

use crate::calendar_ports::CalendarProvider;
use crate::ports::{ConnectionRepository, EventCacheRepository, SentNotificationLedger};

/// Tunable window lengths for a synchronizer pass.
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    pub look_back_days: i64,
    pub look_ahead_days: i64,
    pub retention_days: i64,
    pub max_results: u32,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            look_back_days: SYNC_LOOK_BACK_DAYS,
            look_ahead_days: SYNC_LOOK_AHEAD_DAYS,
            retention_days: RETENTION_DAYS,
            max_results: MAX_EVENTS_PER_SYNC,
        }
    }
}

/// Calendar synchronization service.
pub struct SyncService {
    providers: Vec<Arc<dyn CalendarProvider>>,
    connections: Arc<dyn ConnectionRepository>,
    events: Arc<dyn EventCacheRepository>,
    ledger: Arc<dyn SentNotificationLedger>,
    options: SyncOptions,
}

impl SyncService {
    /// Create a new synchronizer with default window options.
    pub fn new(
        providers: Vec<Arc<dyn CalendarProvider>>,
        connections: Arc<dyn ConnectionRepository>,
        events: Arc<dyn EventCacheRepository>,
        ledger: Arc<dyn SentNotificationLedger>,
    ) -> Self {
        Self { providers, connections, events, ledger, options: SyncOptions::default() }
    }

    /// Override the window options.
    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Run one synchronizer pass at the current time.
    ///
    /// Safe to invoke concurrently with itself and with the notifier: every
    /// write behind the ports is an upsert or idempotent insert keyed by
    /// natural identity.
    #[instrument(skip(self))]
    pub async fn run_sync(&self) -> Result<SyncReport> {
        self.run_sync_at(Utc::now()).await
    }

    /// Run one pass against an explicit clock. Split out so tests can pin
    /// the window boundaries.
    pub async fn run_sync_at(&self, now: DateTime<Utc>) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        let user_ids = self.connections.active_user_ids().await?;
        info!(users = user_ids.len(), "starting synchronizer pass");

        for user_id in user_ids {
            report.users_seen += 1;

            let conns = match self.connections.list_for_user(user_id).await {
                Ok(conns) => conns,
                Err(err) => {
                    error!(user_id, error = %err, "failed to load connections; skipping user");
                    report.connection_failures += 1;
                    continue;
                }
            };

            for conn in conns {
                report.connections_seen += 1;

                match self.sync_connection(&conn, now).await {
                    Ok((upserted, pruned)) => {
                        report.events_upserted += upserted;
                        report.events_pruned += pruned;
                    }
                    Err(err) => {
                        report.connection_failures += 1;
                        log_connection_failure(&conn, &err);
                    }
                }
            }
        }

        info!(
            users = report.users_seen,
            connections = report.connections_seen,
            upserted = report.events_upserted,
            pruned = report.events_pruned,
            failures = report.connection_failures,
            "synchronizer pass completed"
        );

        Ok(report)
    }

    /// Synchronize a single connection: refresh the credential when needed,
    /// fetch the window, upsert into the cache, prune the tail.
    async fn sync_connection(
        &self,
        conn: &CalendarConnection,
        now: DateTime<Utc>,
    ) -> Result<(usize, usize)> {
        let provider = self.provider_for(conn)?;
        let user_id = conn.user_id;

        let mut credential = conn.credential.clone();
        if credential.is_expired(now) {
            if credential.refresh_token.is_none() {
                // Marked for re-authorization; nothing to do until the user
                // reconnects. Not a pass failure.
                debug!(
                    user_id,
                    provider = %conn.provider,
                    "credential expired with no refresh credential; awaiting re-authorization"
                );
                return Ok((0, 0));
            }

            credential = match provider.refresh(&credential).await {
                Ok(refreshed) => refreshed,
                Err(ChimeError::CredentialExpired(msg)) => {
                    // Drop the rejected refresh credential so future passes
                    // skip this connection without another provider round
                    // trip until the user re-authorizes.
                    let mut dead = credential.clone();
                    dead.refresh_token = None;
                    let marked = conn.clone().with_credential(dead, now);
                    if let Err(save_err) = self.connections.save(&marked).await {
                        error!(user_id, error = %save_err, "failed to mark connection for re-authorization");
                    }
                    return Err(ChimeError::CredentialExpired(msg));
                }
                Err(other) => return Err(other),
            };

            // Persist immediately so a crash mid-pass does not lose the
            // refreshed credential.
            let refreshed = conn.clone().with_credential(credential.clone(), now);
            self.connections.save(&refreshed).await?;
            debug!(user_id, provider = %conn.provider, "persisted refreshed credential");
        }

        let time_min = now - Duration::days(self.options.look_back_days);
        let time_max = now + Duration::days(self.options.look_ahead_days);

        let events = provider
            .list_events(&credential, time_min, time_max, self.options.max_results)
            .await?;

        let mut upserted = 0;
        for event in &events {
            match self.events.upsert(user_id, conn.provider, event).await {
                Ok(()) => upserted += 1,
                Err(err) => {
                    // Per-event failures never abort the connection.
                    error!(
                        user_id,
                        provider = %conn.provider,
                        event_id = %event.event_id,
                        error = %err,
                        "failed to cache event"
                    );
                }
            }
        }

        let cutoff = now - Duration::days(self.options.retention_days);
        let pruned = self.events.prune_before(user_id, conn.provider, cutoff).await?;

        // The ledger is pruned on the same cutoff; a re-arriving occurrence
        // that old has already passed and can never become due again.
        if let Err(err) = self.ledger.prune_before(user_id, conn.provider, cutoff).await {
            warn!(user_id, provider = %conn.provider, error = %err, "ledger prune failed");
        }

        debug!(
            user_id,
            provider = %conn.provider,
            fetched = events.len(),
            upserted,
            pruned,
            "connection synchronized"
        );

        Ok((upserted, pruned))
    }

    fn provider_for(&self, conn: &CalendarConnection) -> Result<&Arc<dyn CalendarProvider>> {
        self.providers.iter().find(|p| p.kind() == conn.provider).ok_or_else(|| {
            ChimeError::Internal(format!("no adapter registered for provider {}", conn.provider))
        })
    }
}

fn log_connection_failure(conn: &CalendarConnection, err: &ChimeError) {
    match err {
        ChimeError::CredentialExpired(_) => warn!(
            user_id = conn.user_id,
            provider = %conn.provider,
            error = %err,
            "connection needs re-authorization; skipped"
        ),
        ChimeError::TransientFetch(_) => warn!(
            user_id = conn.user_id,
            provider = %conn.provider,
            error = %err,
            "transient fetch failure; will retry next pass"
        ),
        _ => error!(
            user_id = conn.user_id,
            provider = %conn.provider,
            error = %err,
            "connection sync failed"
        ),
    }
}
