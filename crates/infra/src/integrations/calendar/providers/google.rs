//! Google Calendar provider implementation

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chime_core::calendar_ports::CalendarProvider;
use chime_core::ports::SettingsStore;
use chime_domain::constants::HTTP_TIMEOUT_SECS;
use chime_domain::{
    CalendarInfo, CanonicalEvent, ChimeError, Credential, ProviderKind, Result,
};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::errors::InfraError;

const GOOGLE_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const GOOGLE_AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

const CLIENT_ID_KEY: &str = "google_client_id";
const CLIENT_SECRET_KEY: &str = "google_client_secret";
const REDIRECT_URI_KEY: &str = "google_redirect_uri";

/// Google Calendar provider
pub struct GoogleCalendarProvider {
    http: Client,
    settings: Arc<dyn SettingsStore>,
    auth_endpoint: String,
    token_endpoint: String,
    api_base: String,
}

impl GoogleCalendarProvider {
    /// Create a provider against the production Google endpoints.
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            http: Client::new(),
            settings,
            auth_endpoint: GOOGLE_AUTH_ENDPOINT.to_string(),
            token_endpoint: GOOGLE_TOKEN_ENDPOINT.to_string(),
            api_base: GOOGLE_CALENDAR_API_BASE.to_string(),
        }
    }

    /// Create a provider against custom endpoints (tests).
    pub fn with_endpoints(
        settings: Arc<dyn SettingsStore>,
        auth_endpoint: impl Into<String>,
        token_endpoint: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            http: Client::new(),
            settings,
            auth_endpoint: auth_endpoint.into(),
            token_endpoint: token_endpoint.into(),
            api_base: api_base.into(),
        }
    }

    fn timeout() -> StdDuration {
        StdDuration::from_secs(HTTP_TIMEOUT_SECS)
    }

    async fn required_setting(&self, key: &str) -> Result<String> {
        match self.settings.get(key).await? {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ChimeError::Config(format!("{key} is not set"))),
        }
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendarProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    async fn authorization_url(&self, user_id: i64) -> Result<String> {
        let client_id = self.required_setting(CLIENT_ID_KEY).await?;
        let redirect_uri = self.required_setting(REDIRECT_URI_KEY).await?;

        let mut url = Url::parse(&self.auth_endpoint)
            .map_err(|err| ChimeError::Config(format!("invalid Google auth endpoint: {err}")))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &client_id)
            .append_pair("redirect_uri", &redirect_uri)
            .append_pair("scope", GOOGLE_SCOPE)
            .append_pair("access_type", "offline")
            .append_pair("include_granted_scopes", "true")
            .append_pair("prompt", "consent")
            // The user id rides in `state` so the callback can be attributed
            // without a session.
            .append_pair("state", &user_id.to_string());

        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> Result<Credential> {
        let client_id = self.required_setting(CLIENT_ID_KEY).await?;
        let client_secret = self.required_setting(CLIENT_SECRET_KEY).await?;
        let redirect_uri = self.required_setting(REDIRECT_URI_KEY).await?;

        let response = self
            .http
            .post(&self.token_endpoint)
            .timeout(Self::timeout())
            .form(&[
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|err| ChimeError::AuthExchange(format!("token request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChimeError::AuthExchange(format!(
                "code exchange rejected ({status}): {body}"
            )));
        }

        let token: GoogleTokenResponse = response
            .json()
            .await
            .map_err(|err| ChimeError::AuthExchange(format!("invalid token response: {err}")))?;

        Ok(token.into_credential(None))
    }

    async fn refresh(&self, credential: &Credential) -> Result<Credential> {
        let refresh_token = credential.refresh_token.as_deref().ok_or_else(|| {
            ChimeError::CredentialExpired("no refresh credential stored".into())
        })?;

        let client_id = self.required_setting(CLIENT_ID_KEY).await?;
        let client_secret = self.required_setting(CLIENT_SECRET_KEY).await?;

        let response = self
            .http
            .post(&self.token_endpoint)
            .timeout(Self::timeout())
            .form(&[
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(InfraError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // 4xx means Google rejected the refresh credential itself; only
            // the user can fix that by re-authorizing.
            return if status.is_client_error() {
                Err(ChimeError::CredentialExpired(format!(
                    "refresh rejected ({status}): {body}"
                )))
            } else {
                Err(ChimeError::TransientFetch(format!("refresh failed ({status}): {body}")))
            };
        }

        let token: GoogleTokenResponse = response.json().await.map_err(|err| {
            ChimeError::TransientFetch(format!("invalid refresh response: {err}"))
        })?;

        // Google omits the refresh token on refresh; keep the stored one.
        Ok(token.into_credential(credential.refresh_token.clone()))
    }

    async fn list_events(
        &self,
        credential: &Credential,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        max_results: u32,
    ) -> Result<Vec<CanonicalEvent>> {
        let url = format!("{}/calendars/primary/events", self.api_base);

        let response = self
            .http
            .get(&url)
            .timeout(Self::timeout())
            .bearer_auth(&credential.access_token)
            .query(&[
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("timeMin", time_min.to_rfc3339()),
                ("timeMax", time_max.to_rfc3339()),
                ("timeZone", "UTC".to_string()),
                ("maxResults", max_results.to_string()),
                (
                    "fields",
                    "items(id,summary,description,location,start,end,htmlLink)".to_string(),
                ),
            ])
            .send()
            .await
            .map_err(InfraError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return match status.as_u16() {
                401 | 403 => {
                    Err(ChimeError::Credential(format!("Google API error ({status}): {body}")))
                }
                _ => Err(ChimeError::TransientFetch(format!(
                    "Google API error ({status}): {body}"
                ))),
            };
        }

        let payload: GoogleEventsResponse = response.json().await.map_err(|err| {
            ChimeError::InvalidInput(format!("failed to parse Google response: {err}"))
        })?;

        let mut events = Vec::with_capacity(payload.items.len());
        for item in payload.items {
            match convert_event(item) {
                Ok(Some(event)) => {
                    // The API honors timeMin/timeMax, but all-day expansion
                    // can leak boundary instances; clamp to the contract.
                    if event.start >= time_min && event.start < time_max {
                        events.push(event);
                    }
                }
                Ok(None) => {}
                Err(err) => warn!(error = %err, "skipping unparseable Google event"),
            }
        }

        events.sort_by_key(|event| event.start);
        events.truncate(max_results as usize);

        debug!(count = events.len(), "fetched Google events");

        Ok(events)
    }

    async fn calendar_info(&self, credential: &Credential) -> CalendarInfo {
        let fallback =
            CalendarInfo { id: "primary".to_string(), name: "Google Calendar".to_string() };

        let url = format!("{}/calendars/primary", self.api_base);
        let response = self
            .http
            .get(&url)
            .timeout(Self::timeout())
            .bearer_auth(&credential.access_token)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                match resp.json::<GoogleCalendarMetadata>().await {
                    Ok(meta) => CalendarInfo {
                        id: meta.id.unwrap_or_else(|| "primary".to_string()),
                        name: meta.summary.unwrap_or_else(|| "Google Calendar".to_string()),
                    },
                    Err(err) => {
                        warn!(error = %err, "failed to parse Google calendar metadata");
                        fallback
                    }
                }
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "Google calendar metadata fetch failed");
                fallback
            }
            Err(err) => {
                warn!(error = %err, "Google calendar metadata fetch failed");
                fallback
            }
        }
    }
}

/// Convert one raw Google item into a canonical event. Returns `Ok(None)`
/// for items without a usable identity.
fn convert_event(item: GoogleCalendarEvent) -> Result<Option<CanonicalEvent>> {
    let Some(id) = item.id.filter(|id| !id.is_empty()) else {
        return Ok(None);
    };

    let start = parse_event_datetime(&item.start)?;
    let end = match parse_event_datetime(&item.end) {
        Ok(end) => end,
        // A truncated end never blocks the reminder; fall back to an
        // hour-long occurrence.
        Err(_) => start + Duration::hours(1),
    };

    let title = item
        .summary
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "Untitled event".to_string());

    Ok(Some(CanonicalEvent {
        event_id: id,
        title,
        description: item.description.filter(|d| !d.is_empty()),
        location: item.location.filter(|l| !l.is_empty()),
        start,
        end,
        html_link: item.html_link.filter(|l| !l.is_empty()),
    }))
}

/// Normalize a Google start/end value into a UTC timestamp. All-day events
/// carry a `date`; timed events carry a `dateTime` that may be
/// timezone-naive.
fn parse_event_datetime(value: &EventDateTime) -> Result<DateTime<Utc>> {
    if let Some(ref date_time) = value.date_time {
        return parse_rfc3339_utc(date_time);
    }

    if let Some(ref date) = value.date {
        let naive = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|err| {
            ChimeError::InvalidInput(format!("invalid all-day date '{date}': {err}"))
        })?;
        let midnight = naive.and_hms_opt(0, 0, 0).ok_or_else(|| {
            ChimeError::InvalidInput(format!("invalid all-day date '{date}'"))
        })?;
        return Ok(midnight.and_utc());
    }

    Err(ChimeError::InvalidInput("event missing both date and dateTime".into()))
}

/// Parse an RFC 3339 timestamp, treating timezone-naive values as UTC.
fn parse_rfc3339_utc(value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    let has_explicit_timezone = trimmed.ends_with('Z')
        || trimmed
            .rfind('T')
            .is_some_and(|idx| trimmed[idx + 1..].chars().any(|c| matches!(c, '+' | '-')));

    let candidate = if has_explicit_timezone { trimmed.to_string() } else { format!("{trimmed}Z") };

    DateTime::parse_from_rfc3339(&candidate)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| ChimeError::InvalidInput(format!("invalid timestamp '{value}': {err}")))
}

#[derive(Debug, Deserialize)]
struct GoogleEventsResponse {
    #[serde(default)]
    items: Vec<GoogleCalendarEvent>,
}

#[derive(Debug, Deserialize)]
struct GoogleCalendarEvent {
    id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: EventDateTime,
    end: EventDateTime,
    #[serde(rename = "htmlLink")]
    html_link: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EventDateTime {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

impl GoogleTokenResponse {
    fn into_credential(self, fallback_refresh: Option<String>) -> Credential {
        let expires_at = self.expires_in.map(|secs| Utc::now() + Duration::seconds(secs));
        Credential::new(self.access_token, self.refresh_token.or(fallback_refresh), expires_at)
    }
}

#[derive(Debug, Deserialize)]
struct GoogleCalendarMetadata {
    id: Option<String>,
    summary: Option<String>,
}
