//! Domain data types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ChimeError;

pub mod event;
pub mod notification;
pub mod report;
pub mod user;

pub use event::{CachedEvent, CanonicalEvent};
pub use notification::{NotificationSettings, Reminder, SendOutcome, SentNotification};
pub use report::{NotifyReport, Statistics, SyncReport};
pub use user::User;

/// Calendar provider kinds supported by the adapters.
///
/// Services never branch on this except when selecting an adapter instance;
/// everywhere else it is an opaque component of identity keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Google,
    CalDav,
}

impl ProviderKind {
    /// Stable string form used in storage and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::CalDav => "caldav",
        }
    }

    /// All known kinds, in adapter-selection order.
    pub fn all() -> [ProviderKind; 2] {
        [Self::Google, Self::CalDav]
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ChimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Self::Google),
            "caldav" => Ok(Self::CalDav),
            other => Err(ChimeError::InvalidInput(format!("unknown provider: {other}"))),
        }
    }
}

/// OAuth credential pair held for one calendar connection.
///
/// The secrets are opaque to everything except the provider adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Access-token expiry. `None` means the provider did not report one;
    /// such credentials are treated as non-expiring until rejected.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self { access_token: access_token.into(), refresh_token, expires_at }
    }

    /// Whether the access token has expired as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }
}

/// Best-effort calendar metadata returned by `calendar_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarInfo {
    pub id: String,
    pub name: String,
}

/// One user's link to one provider.
///
/// At most one connection exists per (user, provider); saving a new one
/// replaces every field of the old row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConnection {
    pub user_id: i64,
    pub provider: ProviderKind,
    pub credential: Credential,
    pub calendar_id: Option<String>,
    pub calendar_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CalendarConnection {
    /// Connection with a fresh credential, timestamps set to `now`.
    pub fn new(
        user_id: i64,
        provider: ProviderKind,
        credential: Credential,
        calendar_id: Option<String>,
        calendar_name: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            provider,
            credential,
            calendar_id,
            calendar_name,
            created_at: now,
            updated_at: now,
        }
    }

    /// Same connection carrying a refreshed credential.
    pub fn with_credential(mut self, credential: Credential, now: DateTime<Utc>) -> Self {
        self.credential = credential;
        self.updated_at = now;
        self
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn provider_kind_round_trips_through_str() {
        for kind in ProviderKind::all() {
            assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_provider_is_invalid_input() {
        let err = "outlook".parse::<ProviderKind>().unwrap_err();
        assert!(matches!(err, ChimeError::InvalidInput(_)));
    }

    #[test]
    fn credential_expiry() {
        let now = Utc::now();
        let live = Credential::new("tok", None, Some(now + Duration::minutes(10)));
        let dead = Credential::new("tok", None, Some(now - Duration::minutes(10)));
        let unknown = Credential::new("tok", None, None);

        assert!(!live.is_expired(now));
        assert!(dead.is_expired(now));
        assert!(!unknown.is_expired(now));
    }
}
