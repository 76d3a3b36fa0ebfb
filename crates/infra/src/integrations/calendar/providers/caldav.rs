//! CalDAV provider implementation.
//!
//! The provider speaks OAuth2 for credentials but exposes no event-listing
//! REST API; events come from the account's calendar export document
//! (an ICS file), parsed with a lower-level document parser. When the
//! document is missing or unparseable the adapter returns an empty list —
//! "no events" is a valid outcome for the rest of the pipeline.

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
use icalendar::parser::{read_calendar, unfold};
use icalendar::{CalendarDateTime, DatePerhapsTime};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::errors::InfraError;

const CALDAV_AUTH_ENDPOINT: &str = "https://oauth.yandex.ru/authorize";
const CALDAV_TOKEN_ENDPOINT: &str = "https://oauth.yandex.ru/token";
const CALDAV_API_BASE: &str = "https://caldav.yandex.ru";
const EXPORT_PATH: &str = "/export.ics";

const CLIENT_ID_KEY: &str = "caldav_client_id";
const CLIENT_SECRET_KEY: &str = "caldav_client_secret";
const REDIRECT_URI_KEY: &str = "caldav_redirect_uri";

/// CalDAV calendar provider
pub struct CalDavProvider {
    http: Client,
    settings: Arc<dyn SettingsStore>,
    auth_endpoint: String,
    token_endpoint: String,
    api_base: String,
}

impl CalDavProvider {
    /// Create a provider against the production endpoints.
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            http: Client::new(),
            settings,
            auth_endpoint: CALDAV_AUTH_ENDPOINT.to_string(),
            token_endpoint: CALDAV_TOKEN_ENDPOINT.to_string(),
            api_base: CALDAV_API_BASE.to_string(),
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

    /// Fetch the calendar export document, or `None` when the server has no
    /// document to offer (treated as "no events").
    async fn fetch_export(&self, credential: &Credential) -> Result<Option<String>> {
        let url = format!("{}{}", self.api_base, EXPORT_PATH);

        let response = self
            .http
            .get(&url)
            .timeout(Self::timeout())
            .bearer_auth(&credential.access_token)
            .header(reqwest::header::ACCEPT, "text/calendar")
            .send()
            .await
            .map_err(InfraError::from)?;

        let status = response.status();
        match status.as_u16() {
            200 => Ok(Some(response.text().await.map_err(InfraError::from)?)),
            401 | 403 => {
                let body = response.text().await.unwrap_or_default();
                Err(ChimeError::Credential(format!("CalDAV error ({status}): {body}")))
            }
            404 => Ok(None),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(ChimeError::TransientFetch(format!("CalDAV error ({status}): {body}")))
            }
        }
    }
}

#[async_trait]
impl CalendarProvider for CalDavProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::CalDav
    }

    async fn authorization_url(&self, user_id: i64) -> Result<String> {
        let client_id = self.required_setting(CLIENT_ID_KEY).await?;
        let redirect_uri = self.required_setting(REDIRECT_URI_KEY).await?;

        let mut url = Url::parse(&self.auth_endpoint)
            .map_err(|err| ChimeError::Config(format!("invalid CalDAV auth endpoint: {err}")))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &client_id)
            .append_pair("redirect_uri", &redirect_uri)
            .append_pair("state", &user_id.to_string());

        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> Result<Credential> {
        let client_id = self.required_setting(CLIENT_ID_KEY).await?;
        let client_secret = self.required_setting(CLIENT_SECRET_KEY).await?;

        let response = self
            .http
            .post(&self.token_endpoint)
            .timeout(Self::timeout())
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
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

        let token: CalDavTokenResponse = response
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
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(InfraError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return if status.is_client_error() {
                Err(ChimeError::CredentialExpired(format!(
                    "refresh rejected ({status}): {body}"
                )))
            } else {
                Err(ChimeError::TransientFetch(format!("refresh failed ({status}): {body}")))
            };
        }

        let token: CalDavTokenResponse = response.json().await.map_err(|err| {
            ChimeError::TransientFetch(format!("invalid refresh response: {err}"))
        })?;

        Ok(token.into_credential(credential.refresh_token.clone()))
    }

    async fn list_events(
        &self,
        credential: &Credential,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        max_results: u32,
    ) -> Result<Vec<CanonicalEvent>> {
        let Some(document) = self.fetch_export(credential).await? else {
            debug!("no export document available; treating as no events");
            return Ok(Vec::new());
        };

        let mut events: Vec<_> = parse_ics_events(&document)
            .into_iter()
            .filter(|event| event.start >= time_min && event.start < time_max)
            .collect();

        events.sort_by_key(|event| event.start);
        events.truncate(max_results as usize);

        debug!(count = events.len(), "fetched CalDAV events");

        Ok(events)
    }

    async fn calendar_info(&self, credential: &Credential) -> CalendarInfo {
        let fallback =
            CalendarInfo { id: "default".to_string(), name: "CalDAV Calendar".to_string() };

        match self.fetch_export(credential).await {
            Ok(Some(document)) => {
                let name = calendar_display_name(&document);
                CalendarInfo {
                    id: "default".to_string(),
                    name: name.unwrap_or(fallback.name),
                }
            }
            Ok(None) => fallback,
            Err(err) => {
                warn!(error = %err, "CalDAV calendar metadata fetch failed");
                fallback
            }
        }
    }
}

/// Parse every VEVENT of an ICS document into canonical events. Components
/// without a UID or DTSTART are skipped; an unparseable document yields an
/// empty list.
fn parse_ics_events(content: &str) -> Vec<CanonicalEvent> {
    let unfolded = unfold(content);
    let calendar = match read_calendar(&unfolded) {
        Ok(calendar) => calendar,
        Err(err) => {
            warn!(error = %err, "unparseable calendar document; treating as no events");
            return Vec::new();
        }
    };

    calendar
        .components
        .iter()
        .filter(|component| component.name == "VEVENT")
        .filter_map(|vevent| {
            let uid = vevent.find_prop("UID")?.val.to_string();

            let start_prop = vevent.find_prop("DTSTART")?;
            let start = to_utc(DatePerhapsTime::try_from(start_prop).ok()?);
            let end = vevent
                .find_prop("DTEND")
                .and_then(|prop| DatePerhapsTime::try_from(prop).ok())
                .map(to_utc)
                .unwrap_or(start + Duration::hours(1));

            let title = vevent
                .find_prop("SUMMARY")
                .map(|p| p.val.to_string())
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "Untitled event".to_string());

            Some(CanonicalEvent {
                event_id: uid,
                title,
                description: vevent.find_prop("DESCRIPTION").map(|p| p.val.to_string()),
                location: vevent.find_prop("LOCATION").map(|p| p.val.to_string()),
                start,
                end,
                html_link: vevent.find_prop("URL").map(|p| p.val.to_string()),
            })
        })
        .collect()
}

/// Normalize an ICS date-or-datetime into UTC. Floating times and unknown
/// timezone ids are treated as UTC.
fn to_utc(value: DatePerhapsTime) -> DateTime<Utc> {
    match value {
        DatePerhapsTime::Date(date) => {
            date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc()).unwrap_or_else(Utc::now)
        }
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => dt,
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => naive.and_utc(),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            match tzid.parse::<chrono_tz::Tz>() {
                Ok(tz) => match date_time.and_local_timezone(tz).single() {
                    Some(zoned) => zoned.with_timezone(&Utc),
                    None => date_time.and_utc(),
                },
                Err(_) => {
                    warn!(tzid, "unknown timezone id; treating as UTC");
                    date_time.and_utc()
                }
            }
        }
    }
}

/// Pull the display name (X-WR-CALNAME) from a calendar document.
fn calendar_display_name(content: &str) -> Option<String> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).ok()?;
    calendar
        .properties
        .iter()
        .find(|prop| prop.name == "X-WR-CALNAME")
        .map(|prop| prop.val.to_string())
        .filter(|name| !name.trim().is_empty())
}

#[derive(Debug, Deserialize)]
struct CalDavTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

impl CalDavTokenResponse {
    fn into_credential(self, fallback_refresh: Option<String>) -> Credential {
        let expires_at = self.expires_in.map(|secs| Utc::now() + Duration::seconds(secs));
        Credential::new(self.access_token, self.refresh_token.or(fallback_refresh), expires_at)
    }
}
