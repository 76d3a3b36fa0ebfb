//! Synchronizer pass behavior against mocked ports.

mod support;

use std::sync::Arc;

use chime_core::{SyncOptions, SyncService};
use chime_domain::{ChimeError, Credential, ProviderKind};
use chrono::{Duration, Utc};
use support::{
    event_at, live_connection, FetchScript, MockConnectionRepository, MockEventCacheRepository,
    MockLedger, MockProvider,
};

fn service(
    providers: Vec<Arc<MockProvider>>,
    connections: Arc<MockConnectionRepository>,
    events: Arc<MockEventCacheRepository>,
    ledger: Arc<MockLedger>,
) -> SyncService {
    let providers = providers
        .into_iter()
        .map(|p| p as Arc<dyn chime_core::CalendarProvider>)
        .collect();
    SyncService::new(providers, connections, events, ledger)
}

#[tokio::test]
async fn pass_upserts_fetched_events_into_cache() {
    let now = Utc::now();
    let provider = Arc::new(MockProvider::new(ProviderKind::Google).push_fetch(
        FetchScript::Events(vec![
            event_at("E1", "Standup", now, 30),
            event_at("E2", "Planning", now, 90),
        ]),
    ));
    let connections =
        Arc::new(MockConnectionRepository::with_connections(vec![live_connection(
            7,
            ProviderKind::Google,
        )]));
    let events = Arc::new(MockEventCacheRepository::default());
    let ledger = Arc::new(MockLedger::default());

    let sync =
        service(vec![provider], connections, Arc::clone(&events), ledger);
    let report = sync.run_sync_at(now).await.unwrap();

    assert_eq!(report.users_seen, 1);
    assert_eq!(report.connections_seen, 1);
    assert_eq!(report.events_upserted, 2);
    assert_eq!(report.connection_failures, 0);
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn failing_connection_does_not_abort_siblings() {
    let now = Utc::now();
    // User 1's google fetch blows up; user 2's caldav fetch succeeds.
    let google =
        Arc::new(MockProvider::new(ProviderKind::Google).push_fetch(FetchScript::Transient));
    let caldav = Arc::new(MockProvider::new(ProviderKind::CalDav).push_fetch(
        FetchScript::Events(vec![event_at("C1", "Dentist", now, 120)]),
    ));
    let connections = Arc::new(MockConnectionRepository::with_connections(vec![
        live_connection(1, ProviderKind::Google),
        live_connection(2, ProviderKind::CalDav),
    ]));
    let events = Arc::new(MockEventCacheRepository::default());

    let sync = service(
        vec![google, caldav],
        connections,
        Arc::clone(&events),
        Arc::new(MockLedger::default()),
    );
    let report = sync.run_sync_at(now).await.unwrap();

    assert_eq!(report.connection_failures, 1);
    assert_eq!(report.events_upserted, 1);
    assert_eq!(events.len(), 1, "healthy connection still cached its events");
}

#[tokio::test]
async fn recurring_instances_become_distinct_cache_rows() {
    let now = Utc::now();
    // Same event id, two start times: a recurring series expanded by the
    // provider. Both must be independently notifiable.
    let mut second = event_at("series-9", "Weekly sync", now, 60);
    second.start = now + Duration::days(7);
    second.end = second.start + Duration::minutes(30);

    let provider = Arc::new(MockProvider::new(ProviderKind::Google).push_fetch(
        FetchScript::Events(vec![event_at("series-9", "Weekly sync", now, 60), second]),
    ));
    let connections =
        Arc::new(MockConnectionRepository::with_connections(vec![live_connection(
            3,
            ProviderKind::Google,
        )]));
    let events = Arc::new(MockEventCacheRepository::default());

    let sync =
        service(vec![provider], connections, Arc::clone(&events), Arc::new(MockLedger::default()));
    let report = sync.run_sync_at(now).await.unwrap();

    assert_eq!(report.events_upserted, 2);
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn resyncing_identical_events_is_idempotent() {
    let now = Utc::now();
    let make_provider = || {
        Arc::new(MockProvider::new(ProviderKind::Google).push_fetch(FetchScript::Events(vec![
            event_at("E1", "Standup", now, 30),
        ])))
    };
    let connections =
        Arc::new(MockConnectionRepository::with_connections(vec![live_connection(
            5,
            ProviderKind::Google,
        )]));
    let events = Arc::new(MockEventCacheRepository::default());
    let ledger = Arc::new(MockLedger::default());

    for _ in 0..2 {
        let sync = service(
            vec![make_provider()],
            Arc::clone(&connections),
            Arc::clone(&events),
            Arc::clone(&ledger),
        );
        sync.run_sync_at(now).await.unwrap();
    }

    assert_eq!(events.len(), 1, "identical occurrence must stay a single row");
}

#[tokio::test]
async fn expired_credential_without_refresh_skips_connection() {
    let now = Utc::now();
    let provider = Arc::new(MockProvider::new(ProviderKind::Google));
    let mut conn = live_connection(4, ProviderKind::Google);
    conn.credential = Credential::new("stale", None, Some(now - Duration::hours(1)));

    let healthy = live_connection(5, ProviderKind::Google);
    let connections =
        Arc::new(MockConnectionRepository::with_connections(vec![conn, healthy]));
    let events = Arc::new(MockEventCacheRepository::default());

    let sync = service(
        vec![Arc::clone(&provider)],
        connections,
        events,
        Arc::new(MockLedger::default()),
    );
    let report = sync.run_sync_at(now).await.unwrap();

    // Only the healthy connection reached the provider.
    assert_eq!(provider.list_call_count(), 1);
    assert_eq!(provider.refresh_call_count(), 0);
    assert_eq!(report.connections_seen, 2);
    assert_eq!(report.connection_failures, 0);
}

#[tokio::test]
async fn expired_credential_is_refreshed_and_persisted() {
    let now = Utc::now();
    let fresh = Credential::new(
        "fresh-token",
        Some("refresh".to_string()),
        Some(now + Duration::hours(1)),
    );
    let provider = Arc::new(
        MockProvider::new(ProviderKind::Google)
            .with_refresh(Ok(fresh.clone()))
            .push_fetch(FetchScript::Events(vec![event_at("E1", "Standup", now, 30)])),
    );
    let mut conn = live_connection(6, ProviderKind::Google);
    conn.credential =
        Credential::new("stale", Some("refresh".to_string()), Some(now - Duration::hours(1)));

    let connections = Arc::new(MockConnectionRepository::with_connections(vec![conn]));
    let events = Arc::new(MockEventCacheRepository::default());

    let sync = service(
        vec![Arc::clone(&provider)],
        Arc::clone(&connections),
        Arc::clone(&events),
        Arc::new(MockLedger::default()),
    );
    let report = sync.run_sync_at(now).await.unwrap();

    assert_eq!(provider.refresh_call_count(), 1);
    assert_eq!(report.events_upserted, 1);

    let stored = connections.stored(6, ProviderKind::Google).unwrap();
    assert_eq!(stored.credential.access_token, "fresh-token");
}

#[tokio::test]
async fn rejected_refresh_marks_connection_for_reauthorization() {
    let now = Utc::now();
    let provider = Arc::new(
        MockProvider::new(ProviderKind::Google)
            .with_refresh(Err(ChimeError::CredentialExpired("invalid_grant".into()))),
    );
    let mut conn = live_connection(8, ProviderKind::Google);
    conn.credential =
        Credential::new("stale", Some("revoked".to_string()), Some(now - Duration::hours(1)));

    let connections = Arc::new(MockConnectionRepository::with_connections(vec![conn]));

    let sync = service(
        vec![Arc::clone(&provider)],
        Arc::clone(&connections),
        Arc::new(MockEventCacheRepository::default()),
        Arc::new(MockLedger::default()),
    );

    let report = sync.run_sync_at(now).await.unwrap();
    assert_eq!(report.connection_failures, 1);
    assert_eq!(provider.refresh_call_count(), 1);

    // The refresh credential is dropped, so the next pass skips the
    // connection without touching the provider again.
    let stored = connections.stored(8, ProviderKind::Google).unwrap();
    assert!(stored.credential.refresh_token.is_none());

    let second = sync.run_sync_at(now).await.unwrap();
    assert_eq!(second.connection_failures, 0);
    assert_eq!(provider.refresh_call_count(), 1, "no hot-loop refresh retries");
    assert_eq!(provider.list_call_count(), 0);
}

#[tokio::test]
async fn retention_prunes_old_events_only() {
    let now = Utc::now();
    let old = event_at("old", "Ancient", now, -8 * 24 * 60);
    let recent = event_at("recent", "Recent", now, -6 * 24 * 60);
    let events = Arc::new(MockEventCacheRepository::with_events(vec![
        (9, ProviderKind::Google, old),
        (9, ProviderKind::Google, recent),
    ]));
    let connections =
        Arc::new(MockConnectionRepository::with_connections(vec![live_connection(
            9,
            ProviderKind::Google,
        )]));
    let provider = Arc::new(MockProvider::new(ProviderKind::Google));

    let sync = service(
        vec![provider],
        connections,
        Arc::clone(&events),
        Arc::new(MockLedger::default()),
    )
    .with_options(SyncOptions { retention_days: 7, ..SyncOptions::default() });

    let report = sync.run_sync_at(now).await.unwrap();

    assert_eq!(report.events_pruned, 1);
    assert_eq!(events.len(), 1, "event inside the retention horizon is kept");
}

#[tokio::test]
async fn empty_world_pass_is_not_an_error() {
    let sync = service(
        vec![Arc::new(MockProvider::new(ProviderKind::Google))],
        Arc::new(MockConnectionRepository::default()),
        Arc::new(MockEventCacheRepository::default()),
        Arc::new(MockLedger::default()),
    );

    let report = sync.run_sync_at(Utc::now()).await.unwrap();
    assert_eq!(report.users_seen, 0);
    assert_eq!(report.events_upserted, 0);
}

#[tokio::test]
async fn connection_replacement_is_atomic_per_pair() {
    // Saving a new connection for the same (user, provider) replaces the
    // old one entirely rather than accumulating rows.
    let connections = Arc::new(MockConnectionRepository::default());
    let first = live_connection(11, ProviderKind::Google);
    let mut second = live_connection(11, ProviderKind::Google);
    second.calendar_name = Some("Replaced".into());

    use chime_core::ports::ConnectionRepository as _;
    connections.save(&first).await.unwrap();
    connections.save(&second).await.unwrap();

    let listed = connections.list_for_user(11).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].calendar_name.as_deref(), Some("Replaced"));
}
