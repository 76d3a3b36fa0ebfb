//! Notifier pass behavior against mocked ports.

mod support;

use std::sync::Arc;

use chime_core::ports::{EventCacheRepository as _, NotificationSettingsRepository as _};
use chime_core::NotifyService;
use chime_domain::{ChimeError, NotificationSettings, ProviderKind};
use chrono::Utc;
use support::{
    event_at, live_connection, MockConnectionRepository, MockEventCacheRepository, MockLedger,
    MockSender, MockSettingsRepository, SendScript,
};

struct Fixture {
    connections: Arc<MockConnectionRepository>,
    events: Arc<MockEventCacheRepository>,
    ledger: Arc<MockLedger>,
    settings: Arc<MockSettingsRepository>,
    sender: Arc<MockSender>,
}

impl Fixture {
    fn new(sender: MockSender) -> Self {
        Self {
            connections: Arc::new(MockConnectionRepository::with_connections(vec![
                live_connection(1, ProviderKind::Google),
            ])),
            events: Arc::new(MockEventCacheRepository::default()),
            ledger: Arc::new(MockLedger::default()),
            settings: Arc::new(MockSettingsRepository::default()),
            sender: Arc::new(sender),
        }
    }

    fn service(&self) -> NotifyService {
        NotifyService::new(
            Arc::clone(&self.connections) as _,
            Arc::clone(&self.events) as _,
            Arc::clone(&self.ledger) as _,
            Arc::clone(&self.settings) as _,
            Arc::clone(&self.sender) as _,
        )
    }
}

#[tokio::test]
async fn due_event_is_sent_exactly_once_across_passes() {
    // User 1, lead 15 min, one cached event starting in 10 minutes.
    let now = Utc::now();
    let fixture = Fixture::new(MockSender::default());
    fixture
        .events
        .upsert(1, ProviderKind::Google, &event_at("E1", "Standup", now, 10))
        .await.unwrap();

    let notify = fixture.service();
    let first = notify.run_notify_at(now).await.unwrap();

    assert_eq!(first.events_due, 1);
    assert_eq!(first.reminders_sent, 1);
    let attempts = fixture.sender.attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].0, 1);
    assert_eq!(attempts[0].1.title, "Standup");
    assert_eq!(attempts[0].1.event_id, "E1");

    // Second pass with the same window overlap: the ledger suppresses a
    // duplicate send.
    let second = notify.run_notify_at(now).await.unwrap();
    assert_eq!(second.reminders_sent, 0);
    assert_eq!(fixture.sender.attempt_count(), 1);
}

#[tokio::test]
async fn due_window_boundaries_with_fifteen_minute_lead() {
    let now = Utc::now();
    let fixture = Fixture::new(MockSender::default());
    for (id, minutes) in [("due", 14i64), ("later", 16), ("started", -1)] {
        fixture
            .events
            .upsert(1, ProviderKind::Google, &event_at(id, id, now, minutes))
            .await.unwrap();
    }

    let report = fixture.service().run_notify_at(now).await.unwrap();

    assert_eq!(report.events_due, 1);
    let attempts = fixture.sender.attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].1.event_id, "due", "only the 14-minute event is inside [now, now+15)");
}

#[tokio::test]
async fn disabled_user_gets_no_reminders() {
    let now = Utc::now();
    let fixture = Fixture::new(MockSender::default());
    fixture
        .events
        .upsert(1, ProviderKind::Google, &event_at("E1", "Standup", now, 5))
        .await.unwrap();
    fixture
        .settings
        .update(1, NotificationSettings { lead_minutes: 15, enabled: false })
        .await.unwrap();

    let report = fixture.service().run_notify_at(now).await.unwrap();

    assert_eq!(report.events_due, 0);
    assert_eq!(fixture.sender.attempt_count(), 0);
}

#[tokio::test]
async fn custom_lead_time_widens_the_window() {
    let now = Utc::now();
    let fixture = Fixture::new(MockSender::default());
    fixture
        .events
        .upsert(1, ProviderKind::Google, &event_at("E1", "Review", now, 100))
        .await.unwrap();
    fixture
        .settings
        .update(1, NotificationSettings { lead_minutes: 120, enabled: true })
        .await.unwrap();

    let report = fixture.service().run_notify_at(now).await.unwrap();
    assert_eq!(report.reminders_sent, 1);
}

#[tokio::test]
async fn transient_send_failure_retries_on_next_pass() {
    let now = Utc::now();
    let fixture = Fixture::new(MockSender::with_script(vec![SendScript::Transient]));
    fixture
        .events
        .upsert(1, ProviderKind::Google, &event_at("E1", "Standup", now, 10))
        .await.unwrap();

    let notify = fixture.service();
    let first = notify.run_notify_at(now).await.unwrap();

    assert_eq!(first.reminders_sent, 0);
    assert_eq!(first.send_failures, 1);
    assert_eq!(fixture.ledger.len(), 0, "transient failures are not recorded as sent");

    // Still inside the due window on the next pass; the scripted failure is
    // consumed, so this attempt delivers.
    let second = notify.run_notify_at(now).await.unwrap();
    assert_eq!(second.reminders_sent, 1);
    assert_eq!(fixture.ledger.len(), 1);
}

#[tokio::test]
async fn blocked_recipient_is_recorded_and_never_retried() {
    let now = Utc::now();
    let fixture = Fixture::new(MockSender::with_script(vec![SendScript::Blocked]));
    fixture
        .events
        .upsert(1, ProviderKind::Google, &event_at("E1", "Standup", now, 10))
        .await.unwrap();

    let notify = fixture.service();
    let first = notify.run_notify_at(now).await.unwrap();

    assert_eq!(first.reminders_sent, 0);
    assert_eq!(first.reminders_suppressed, 1);
    assert_eq!(fixture.ledger.len(), 1, "permanent recipient failure still recorded as sent");

    let second = notify.run_notify_at(now).await.unwrap();
    assert_eq!(second.reminders_suppressed, 0);
    assert_eq!(fixture.sender.attempt_count(), 1);
}

#[tokio::test]
async fn deactivated_recipient_is_recorded_as_sent() {
    let now = Utc::now();
    let fixture = Fixture::new(MockSender::with_script(vec![SendScript::Gone]));
    fixture
        .events
        .upsert(1, ProviderKind::Google, &event_at("E1", "Standup", now, 10))
        .await.unwrap();

    let report = fixture.service().run_notify_at(now).await.unwrap();
    assert_eq!(report.reminders_suppressed, 1);
    assert_eq!(fixture.ledger.len(), 1);
}

#[tokio::test]
async fn missing_bot_token_aborts_the_pass() {
    let now = Utc::now();
    let fixture = Fixture::new(MockSender::unconfigured());
    fixture
        .events
        .upsert(1, ProviderKind::Google, &event_at("E1", "Standup", now, 10))
        .await.unwrap();

    let err = fixture.service().run_notify_at(now).await.unwrap_err();
    assert!(matches!(err, ChimeError::Config(_)));
    assert_eq!(fixture.sender.attempt_count(), 0);
}

#[tokio::test]
async fn recurring_instances_are_independently_due() {
    let now = Utc::now();
    let fixture = Fixture::new(MockSender::default());
    // Same event id, two occurrences: one due now, one due on a later pass.
    fixture
        .events
        .upsert(1, ProviderKind::Google, &event_at("series-1", "Weekly", now, 10))
        .await.unwrap();
    fixture
        .events
        .upsert(1, ProviderKind::Google, &event_at("series-1", "Weekly", now, 7 * 24 * 60 + 10))
        .await.unwrap();

    let notify = fixture.service();
    let first = notify.run_notify_at(now).await.unwrap();
    assert_eq!(first.reminders_sent, 1);

    // A week later the second occurrence enters its own due window and is
    // not shadowed by the first occurrence's ledger entry.
    let later = now + chrono::Duration::days(7);
    let second = notify.run_notify_at(later).await.unwrap();
    assert_eq!(second.reminders_sent, 1);
    assert_eq!(fixture.ledger.len(), 2);
}
