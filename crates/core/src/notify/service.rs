//! Reminder delivery service - core business logic.
//!
//! One pass walks every user with notifications enabled, queries the event
//! cache for starts inside the due window `[now, now + lead)`, and sends a
//! reminder for each occurrence the dedup ledger has not seen. The cache is
//! the only event source at notification time; a provider outage can delay
//! what the cache knows, but it can never block reminders for events
//! already mirrored.
//!
//! Exactly-once delivery rests on the ledger's unique-insert semantics, not
//! on in-process state: each pass re-queries and re-checks, so overlapping
//! or restarted passes converge on one send per occurrence.

use std::sync::Arc;

use chime_domain::{ChimeError, NotifyReport, Reminder, Result, SendOutcome};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, instrument, warn};

use crate::ports::{
    ConnectionRepository, EventCacheRepository, MessageSender, NotificationSettingsRepository,
    SentNotificationLedger,
};

/// Reminder delivery service.
pub struct NotifyService {
    connections: Arc<dyn ConnectionRepository>,
    events: Arc<dyn EventCacheRepository>,
    ledger: Arc<dyn SentNotificationLedger>,
    settings: Arc<dyn NotificationSettingsRepository>,
    sender: Arc<dyn MessageSender>,
}

impl NotifyService {
    /// Create a new notifier.
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        events: Arc<dyn EventCacheRepository>,
        ledger: Arc<dyn SentNotificationLedger>,
        settings: Arc<dyn NotificationSettingsRepository>,
        sender: Arc<dyn MessageSender>,
    ) -> Self {
        Self { connections, events, ledger, settings, sender }
    }

    /// Run one notifier pass at the current time.
    #[instrument(skip(self))]
    pub async fn run_notify(&self) -> Result<NotifyReport> {
        self.run_notify_at(Utc::now()).await
    }

    /// Run one pass against an explicit clock. Split out so tests can pin
    /// the due-window boundaries.
    pub async fn run_notify_at(&self, now: DateTime<Utc>) -> Result<NotifyReport> {
        // The only globally required setting: without an outbound
        // credential no useful work is possible, so the pass aborts early.
        self.sender.ensure_configured().await?;

        let mut report = NotifyReport::default();

        let user_ids = self.connections.active_user_ids().await?;
        info!(users = user_ids.len(), "starting notifier pass");

        for user_id in user_ids {
            report.users_seen += 1;
            if let Err(err) = self.notify_user(user_id, now, &mut report).await {
                // Per-user isolation: siblings still get their reminders.
                error!(user_id, error = %err, "notify failed for user");
                report.send_failures += 1;
            }
        }

        info!(
            users = report.users_seen,
            due = report.events_due,
            sent = report.reminders_sent,
            suppressed = report.reminders_suppressed,
            failures = report.send_failures,
            "notifier pass completed"
        );

        Ok(report)
    }

    async fn notify_user(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
        report: &mut NotifyReport,
    ) -> Result<()> {
        let settings = self.settings.get(user_id).await?;
        if !settings.enabled {
            debug!(user_id, "notifications disabled; skipping user");
            return Ok(());
        }

        let lead = i64::from(settings.effective_lead_minutes());
        let due_by = now + Duration::minutes(lead);

        // Half-open [now, due_by): an event that already started is never
        // due, and one exactly `lead` minutes out becomes due next pass.
        let due = self.events.events_in_range(user_id, now, due_by, None).await?;
        if due.is_empty() {
            return Ok(());
        }

        debug!(user_id, due = due.len(), lead_minutes = lead, "events inside due window");

        for cached in &due {
            report.events_due += 1;

            let event = &cached.event;
            let already_sent = self
                .ledger
                .is_sent(user_id, cached.provider, &event.event_id, event.start)
                .await?;
            if already_sent {
                continue;
            }

            let reminder = Reminder::from_event(cached);
            match self.sender.send_reminder(user_id, &reminder).await {
                Ok(outcome) => {
                    // Permanent recipient failures are recorded as sent too:
                    // retrying a blocked or deactivated recipient is useless.
                    self.ledger
                        .mark_sent(user_id, cached.provider, &event.event_id, event.start)
                        .await?;
                    match outcome {
                        SendOutcome::Delivered => report.reminders_sent += 1,
                        SendOutcome::RecipientBlocked | SendOutcome::RecipientGone => {
                            warn!(user_id, outcome = ?outcome, "recipient unreachable; reminder suppressed");
                            report.reminders_suppressed += 1;
                        }
                    }
                }
                Err(err @ ChimeError::TransientFetch(_)) => {
                    // Not recorded: the due window guarantees another
                    // attempt while the start has not passed.
                    warn!(
                        user_id,
                        event_id = %event.event_id,
                        error = %err,
                        "transient send failure; will retry next pass"
                    );
                    report.send_failures += 1;
                }
                Err(err) => {
                    error!(
                        user_id,
                        event_id = %event.event_id,
                        error = %err,
                        "send failed"
                    );
                    report.send_failures += 1;
                }
            }
        }

        Ok(())
    }
}
