//! Mock port implementations for core service tests.
//!
//! In-memory mocks for the repository, ledger, sender, and provider ports,
//! enabling deterministic unit tests without database or network
//! dependencies.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chime_core::calendar_ports::CalendarProvider;
use chime_core::ports::{
    ConnectionRepository, EventCacheRepository, MessageSender, NotificationSettingsRepository,
    SentNotificationLedger,
};
use chime_domain::{
    CachedEvent, CalendarConnection, CalendarInfo, CanonicalEvent, ChimeError, Credential,
    NotificationSettings, ProviderKind, Reminder, Result, SendOutcome,
};
use chrono::{DateTime, Duration, Utc};

/// In-memory `ConnectionRepository`.
#[derive(Default)]
pub struct MockConnectionRepository {
    rows: Mutex<HashMap<(i64, ProviderKind), CalendarConnection>>,
}

impl MockConnectionRepository {
    pub fn with_connections(connections: Vec<CalendarConnection>) -> Self {
        let repo = Self::default();
        {
            let mut rows = repo.rows.lock().unwrap();
            for conn in connections {
                rows.insert((conn.user_id, conn.provider), conn);
            }
        }
        repo
    }

    pub fn stored(&self, user_id: i64, provider: ProviderKind) -> Option<CalendarConnection> {
        self.rows.lock().unwrap().get(&(user_id, provider)).cloned()
    }
}

#[async_trait]
impl ConnectionRepository for MockConnectionRepository {
    async fn save(&self, connection: &CalendarConnection) -> Result<()> {
        self.rows
            .lock()
            .unwrap()
            .insert((connection.user_id, connection.provider), connection.clone());
        Ok(())
    }

    async fn get(
        &self,
        user_id: i64,
        provider: ProviderKind,
    ) -> Result<Option<CalendarConnection>> {
        Ok(self.rows.lock().unwrap().get(&(user_id, provider)).cloned())
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<CalendarConnection>> {
        let mut conns: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        conns.sort_by_key(|c| c.provider.as_str());
        Ok(conns)
    }

    async fn delete(&self, user_id: i64, provider: ProviderKind) -> Result<()> {
        self.rows.lock().unwrap().remove(&(user_id, provider));
        Ok(())
    }

    async fn active_user_ids(&self) -> Result<Vec<i64>> {
        let mut ids: Vec<_> = self.rows.lock().unwrap().keys().map(|(id, _)| *id).collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }
}

/// In-memory `EventCacheRepository` keyed on the occurrence identity.
#[derive(Default)]
pub struct MockEventCacheRepository {
    rows: Mutex<HashMap<(i64, ProviderKind, String, DateTime<Utc>), CanonicalEvent>>,
}

impl MockEventCacheRepository {
    pub fn with_events(seed: Vec<(i64, ProviderKind, CanonicalEvent)>) -> Self {
        let repo = Self::default();
        {
            let mut rows = repo.rows.lock().unwrap();
            for (user_id, provider, event) in seed {
                rows.insert((user_id, provider, event.event_id.clone(), event.start), event);
            }
        }
        repo
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl EventCacheRepository for MockEventCacheRepository {
    async fn upsert(
        &self,
        user_id: i64,
        provider: ProviderKind,
        event: &CanonicalEvent,
    ) -> Result<()> {
        self.rows
            .lock()
            .unwrap()
            .insert((user_id, provider, event.event_id.clone(), event.start), event.clone());
        Ok(())
    }

    async fn events_in_range(
        &self,
        user_id: i64,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        provider: Option<ProviderKind>,
    ) -> Result<Vec<CachedEvent>> {
        let mut out: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|((uid, prov, _, start), _)| {
                *uid == user_id
                    && provider.map_or(true, |p| p == *prov)
                    && *start >= time_min
                    && *start < time_max
            })
            .map(|((_, prov, _, _), event)| CachedEvent::new(*prov, event.clone()))
            .collect();
        out.sort_by_key(|cached| cached.event.start);
        Ok(out)
    }

    async fn prune_before(
        &self,
        user_id: i64,
        provider: ProviderKind,
        cutoff: DateTime<Utc>,
    ) -> Result<usize> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|(uid, prov, _, start), _| {
            !(*uid == user_id && *prov == provider && *start < cutoff)
        });
        Ok(before - rows.len())
    }
}

/// In-memory `SentNotificationLedger` with first-write-wins inserts.
#[derive(Default)]
pub struct MockLedger {
    rows: Mutex<HashMap<(i64, ProviderKind, String, DateTime<Utc>), DateTime<Utc>>>,
}

impl MockLedger {
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl SentNotificationLedger for MockLedger {
    async fn is_sent(
        &self,
        user_id: i64,
        provider: ProviderKind,
        event_id: &str,
        event_start: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .contains_key(&(user_id, provider, event_id.to_string(), event_start)))
    }

    async fn mark_sent(
        &self,
        user_id: i64,
        provider: ProviderKind,
        event_id: &str,
        event_start: DateTime<Utc>,
    ) -> Result<()> {
        self.rows
            .lock()
            .unwrap()
            .entry((user_id, provider, event_id.to_string(), event_start))
            .or_insert_with(Utc::now);
        Ok(())
    }

    async fn prune_before(
        &self,
        user_id: i64,
        provider: ProviderKind,
        cutoff: DateTime<Utc>,
    ) -> Result<usize> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|(uid, prov, _, start), _| {
            !(*uid == user_id && *prov == provider && *start < cutoff)
        });
        Ok(before - rows.len())
    }
}

/// In-memory `NotificationSettingsRepository` with lazy defaults.
#[derive(Default)]
pub struct MockSettingsRepository {
    rows: Mutex<HashMap<i64, NotificationSettings>>,
}

impl MockSettingsRepository {
    pub fn with_settings(user_id: i64, settings: NotificationSettings) -> Self {
        let repo = Self::default();
        repo.rows.lock().unwrap().insert(user_id, settings);
        repo
    }
}

#[async_trait]
impl NotificationSettingsRepository for MockSettingsRepository {
    async fn get(&self, user_id: i64) -> Result<NotificationSettings> {
        Ok(self.rows.lock().unwrap().get(&user_id).copied().unwrap_or_default())
    }

    async fn update(&self, user_id: i64, settings: NotificationSettings) -> Result<()> {
        self.rows.lock().unwrap().insert(user_id, settings);
        Ok(())
    }
}

/// Scripted behavior for one `MockSender::send_reminder` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendScript {
    Deliver,
    Blocked,
    Gone,
    Transient,
}

/// In-memory `MessageSender` that records every attempt.
pub struct MockSender {
    configured: bool,
    /// Behaviors consumed in order; once exhausted every send delivers.
    script: Mutex<Vec<SendScript>>,
    sent: Mutex<Vec<(i64, Reminder)>>,
}

impl Default for MockSender {
    fn default() -> Self {
        Self { configured: true, script: Mutex::new(Vec::new()), sent: Mutex::new(Vec::new()) }
    }
}

impl MockSender {
    pub fn unconfigured() -> Self {
        Self { configured: false, ..Self::default() }
    }

    pub fn with_script(script: Vec<SendScript>) -> Self {
        Self { script: Mutex::new(script), ..Self::default() }
    }

    /// Reminders that reached the wire (delivered or permanently refused).
    pub fn attempts(&self) -> Vec<(i64, Reminder)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl MessageSender for MockSender {
    async fn ensure_configured(&self) -> Result<()> {
        if self.configured {
            Ok(())
        } else {
            Err(ChimeError::Config("bot token not configured".into()))
        }
    }

    async fn send_reminder(&self, user_id: i64, reminder: &Reminder) -> Result<SendOutcome> {
        let behavior = {
            let mut script = self.script.lock().unwrap();
            if script.is_empty() { SendScript::Deliver } else { script.remove(0) }
        };

        match behavior {
            SendScript::Transient => Err(ChimeError::TransientFetch("telegram 502".into())),
            other => {
                self.sent.lock().unwrap().push((user_id, reminder.clone()));
                Ok(match other {
                    SendScript::Deliver => SendOutcome::Delivered,
                    SendScript::Blocked => SendOutcome::RecipientBlocked,
                    SendScript::Gone => SendOutcome::RecipientGone,
                    SendScript::Transient => unreachable!(),
                })
            }
        }
    }
}

/// Scripted provider result for one `list_events` call.
pub enum FetchScript {
    Events(Vec<CanonicalEvent>),
    Transient,
    Credential,
}

/// Scripted `CalendarProvider` recording call counts.
pub struct MockProvider {
    kind: ProviderKind,
    fetches: Mutex<Vec<FetchScript>>,
    refresh_result: Mutex<Option<Result<Credential>>>,
    pub list_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            fetches: Mutex::new(Vec::new()),
            refresh_result: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
        }
    }

    /// Queue one fetch behavior; once exhausted fetches return no events.
    pub fn push_fetch(self, script: FetchScript) -> Self {
        self.fetches.lock().unwrap().push(script);
        self
    }

    pub fn with_refresh(self, result: Result<Credential>) -> Self {
        *self.refresh_result.lock().unwrap() = Some(result);
        self
    }

    pub fn list_call_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_call_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CalendarProvider for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn authorization_url(&self, user_id: i64) -> Result<String> {
        Ok(format!("https://example.com/auth?state={user_id}"))
    }

    async fn exchange_code(&self, _code: &str) -> Result<Credential> {
        Ok(Credential::new("exchanged", None, None))
    }

    async fn refresh(&self, _credential: &Credential) -> Result<Credential> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        match self.refresh_result.lock().unwrap().take() {
            Some(result) => result,
            None => Ok(Credential::new(
                "refreshed",
                Some("refresh".to_string()),
                Some(Utc::now() + Duration::hours(1)),
            )),
        }
    }

    async fn list_events(
        &self,
        _credential: &Credential,
        _time_min: DateTime<Utc>,
        _time_max: DateTime<Utc>,
        _max_results: u32,
    ) -> Result<Vec<CanonicalEvent>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let script = {
            let mut fetches = self.fetches.lock().unwrap();
            if fetches.is_empty() { FetchScript::Events(Vec::new()) } else { fetches.remove(0) }
        };
        match script {
            FetchScript::Events(events) => Ok(events),
            FetchScript::Transient => Err(ChimeError::TransientFetch("connect timeout".into())),
            FetchScript::Credential => Err(ChimeError::Credential("401 unauthorized".into())),
        }
    }

    async fn calendar_info(&self, _credential: &Credential) -> CalendarInfo {
        CalendarInfo { id: "primary".into(), name: "Mock Calendar".into() }
    }
}

/// Event occurring `minutes_from` minutes after `now`.
pub fn event_at(id: &str, title: &str, now: DateTime<Utc>, minutes_from: i64) -> CanonicalEvent {
    let start = now + Duration::minutes(minutes_from);
    CanonicalEvent {
        event_id: id.to_string(),
        title: title.to_string(),
        description: None,
        location: None,
        start,
        end: start + Duration::minutes(30),
        html_link: None,
    }
}

/// Connection for `user_id` with a live (non-expiring) credential.
pub fn live_connection(user_id: i64, provider: ProviderKind) -> CalendarConnection {
    CalendarConnection::new(
        user_id,
        provider,
        Credential::new("access", Some("refresh".to_string()), None),
        Some("primary".into()),
        Some("Test Calendar".into()),
        Utc::now(),
    )
}
