//! Calendar provider port.
//!
//! One implementation exists per provider in `chime-infra`. The services
//! hold a set of these and select by [`ProviderKind`]; nothing else in the
//! core ever branches on the provider.

use async_trait::async_trait;
use chime_domain::{CalendarInfo, CanonicalEvent, Credential, ProviderKind, Result};
use chrono::{DateTime, Utc};

/// Uniform capability over one external calendar protocol.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// The provider this adapter speaks for.
    fn kind(&self) -> ProviderKind;

    /// Build the provider login URL for a user. The user id rides along in
    /// the OAuth `state` parameter so the callback can be attributed
    /// without an active session.
    ///
    /// Fails with `ChimeError::Config` when the client id or redirect
    /// target is unset or blank.
    async fn authorization_url(&self, user_id: i64) -> Result<String>;

    /// One-time exchange of an authorization code for credentials.
    ///
    /// Fails with `ChimeError::AuthExchange` on any transport or
    /// provider-side rejection. Codes are single-use by provider contract;
    /// callers must not retry with the same code.
    async fn exchange_code(&self, code: &str) -> Result<Credential>;

    /// Exchange the refresh credential for a new access credential.
    ///
    /// Fails with `ChimeError::CredentialExpired` when the provider rejects
    /// the refresh credential itself — the connection then needs user
    /// re-authorization, not retries.
    async fn refresh(&self, credential: &Credential) -> Result<Credential>;

    /// Fetch events whose start falls in `[time_min, time_max)`, start
    /// ascending, capped at `max_results`. Timestamps are UTC-normalized.
    ///
    /// Transient transport failures surface as `ChimeError::TransientFetch`
    /// and credential problems as `ChimeError::Credential`, so the
    /// synchronizer can refresh or skip without aborting sibling
    /// connections. An empty list is a valid result.
    async fn list_events(
        &self,
        credential: &Credential,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        max_results: u32,
    ) -> Result<Vec<CanonicalEvent>>;

    /// Best-effort calendar metadata. Never fatal: adapters return a
    /// fallback name when the provider call fails.
    async fn calendar_info(&self, credential: &Credential) -> CalendarInfo;
}
