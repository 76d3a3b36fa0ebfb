//! Reminder and delivery-tracking types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::CachedEvent;
use super::ProviderKind;
use crate::constants::{
    DEFAULT_LEAD_MINUTES, DESCRIPTION_PREVIEW_CHARS, MAX_LEAD_MINUTES, MIN_LEAD_MINUTES,
};

/// Per-user notification preferences. Created lazily with defaults on first
/// read; mutated only by explicit user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Minutes before event start at which to remind.
    pub lead_minutes: u32,
    pub enabled: bool,
}

impl NotificationSettings {
    /// Lead time clamped into the supported range. Out-of-range stored
    /// values (e.g. from an older deployment) degrade gracefully instead of
    /// widening or collapsing the due window.
    pub fn effective_lead_minutes(&self) -> u32 {
        self.lead_minutes.clamp(MIN_LEAD_MINUTES, MAX_LEAD_MINUTES)
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self { lead_minutes: DEFAULT_LEAD_MINUTES, enabled: true }
    }
}

/// Content of one reminder, ready for rendering by the outbound sender.
///
/// The core owns no message strings; the sender renders this against its
/// message catalog in the recipient's language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub provider: ProviderKind,
    pub event_id: String,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub location: Option<String>,
    /// Description truncated for display; the cache keeps the full text.
    pub description: Option<String>,
    pub html_link: Option<String>,
}

impl Reminder {
    /// Build a reminder from a cached event, truncating the description to
    /// the display preview length.
    pub fn from_event(cached: &CachedEvent) -> Self {
        let event = &cached.event;
        Self {
            provider: cached.provider,
            event_id: event.event_id.clone(),
            title: event.title.clone(),
            starts_at: event.start,
            location: event.location.clone(),
            description: event.description.as_deref().map(truncate_preview),
            html_link: event.html_link.clone(),
        }
    }
}

fn truncate_preview(text: &str) -> String {
    if text.chars().count() <= DESCRIPTION_PREVIEW_CHARS {
        return text.to_string();
    }
    let mut preview: String = text.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
    preview.push_str("...");
    preview
}

/// Outcome of one delivery attempt, as classified by the outbound sender.
///
/// Permanent recipient-side failures are *successful outcomes* of the
/// attempt: retrying cannot help, so the notifier records them as sent.
/// Transient failures surface as errors instead and are never recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendOutcome {
    Delivered,
    /// The recipient blocked the bot.
    RecipientBlocked,
    /// The recipient's account is gone (deactivated, or never started the
    /// bot so no chat exists).
    RecipientGone,
}

impl SendOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Ledger entry recording that a reminder for one occurrence went out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentNotification {
    pub user_id: i64,
    pub provider: ProviderKind,
    pub event_id: String,
    pub event_start: DateTime<Utc>,
    pub notified_at: DateTime<Utc>,
}
