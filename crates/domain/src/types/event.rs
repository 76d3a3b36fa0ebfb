//! Canonical calendar event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ProviderKind;

/// Provider-agnostic event record produced by every adapter.
///
/// `(provider, event_id, start)` is the identity of one notifiable
/// occurrence — not `event_id` alone, because a recurring series reuses its
/// id across instances. Timestamps are UTC-normalized by the adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    /// Provider-native identifier, opaque and unique within a calendar.
    pub event_id: String,
    pub title: String,
    /// Full description as delivered by the provider; display layers
    /// truncate, storage never does.
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Deep link back to the provider's UI, when one exists.
    pub html_link: Option<String>,
}

/// A canonical event as held in the local cache, tagged with the provider it
/// was mirrored from. The notifier consumes these; it never sees a raw
/// provider payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEvent {
    pub provider: ProviderKind,
    #[serde(flatten)]
    pub event: CanonicalEvent,
}

impl CachedEvent {
    pub fn new(provider: ProviderKind, event: CanonicalEvent) -> Self {
        Self { provider, event }
    }
}
