//! Telegram Bot API sender implementation.
//!
//! Maps Bot API failures onto the delivery taxonomy: a recipient that
//! blocked the bot or no longer exists is a permanent outcome, rate limits
//! and server errors are transient, and anything else surfaces as an
//! internal error.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chime_core::ports::{MessageSender, SettingsStore, UserRepository};
use chime_domain::constants::{DEFAULT_LANGUAGE, HTTP_TIMEOUT_SECS};
use chime_domain::{ChimeError, Reminder, Result, SendOutcome};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

use super::messages;
use crate::errors::InfraError;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const BOT_TOKEN_KEY: &str = "telegram_bot_token";

/// Telegram Bot API implementation of MessageSender.
pub struct TelegramSender {
    http: Client,
    settings: Arc<dyn SettingsStore>,
    users: Arc<dyn UserRepository>,
    api_base: String,
}

impl TelegramSender {
    /// Create a sender against the production Bot API.
    pub fn new(settings: Arc<dyn SettingsStore>, users: Arc<dyn UserRepository>) -> Self {
        Self { http: Client::new(), settings, users, api_base: TELEGRAM_API_BASE.to_string() }
    }

    /// Create a sender against a custom API base (tests).
    pub fn with_api_base(
        settings: Arc<dyn SettingsStore>,
        users: Arc<dyn UserRepository>,
        api_base: impl Into<String>,
    ) -> Self {
        Self { http: Client::new(), settings, users, api_base: api_base.into() }
    }

    async fn bot_token(&self) -> Result<String> {
        match self.settings.get(BOT_TOKEN_KEY).await? {
            Some(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(ChimeError::Config(format!("{BOT_TOKEN_KEY} is not set"))),
        }
    }

    async fn user_language(&self, user_id: i64) -> String {
        match self.users.get(user_id).await {
            Ok(Some(user)) => user.language,
            Ok(None) => DEFAULT_LANGUAGE.to_string(),
            Err(err) => {
                warn!(user_id, error = %err, "failed to load user language; using default");
                DEFAULT_LANGUAGE.to_string()
            }
        }
    }

    fn render_reminder(reminder: &Reminder, language: &str) -> String {
        let start_time = reminder.starts_at.format("%d.%m.%Y %H:%M").to_string();
        messages::render(
            "event_notification",
            language,
            &[
                ("title", reminder.title.as_str()),
                ("start_time", start_time.as_str()),
                ("location", reminder.location.as_deref().unwrap_or("-")),
                ("description", reminder.description.as_deref().unwrap_or("-")),
            ],
        )
    }
}

#[async_trait]
impl MessageSender for TelegramSender {
    async fn ensure_configured(&self) -> Result<()> {
        self.bot_token().await.map(|_| ())
    }

    #[instrument(skip(self, reminder), fields(event_id = %reminder.event_id))]
    async fn send_reminder(&self, user_id: i64, reminder: &Reminder) -> Result<SendOutcome> {
        let token = self.bot_token().await?;
        let language = self.user_language(user_id).await;
        let text = Self::render_reminder(reminder, &language);

        let url = format!("{}/bot{}/sendMessage", self.api_base, token);

        let response = self
            .http
            .post(&url)
            .timeout(StdDuration::from_secs(HTTP_TIMEOUT_SECS))
            .json(&json!({ "chat_id": user_id, "text": text }))
            .send()
            .await
            .map_err(InfraError::from)?;

        let status = response.status();
        if status.is_success() {
            debug!(user_id, "reminder delivered");
            return Ok(SendOutcome::Delivered);
        }

        let api_error: TelegramApiError = response.json().await.unwrap_or_default();
        let description = api_error.description.to_lowercase();

        match status.as_u16() {
            403 if description.contains("blocked by the user") => {
                Ok(SendOutcome::RecipientBlocked)
            }
            403 if description.contains("user is deactivated") => Ok(SendOutcome::RecipientGone),
            400 if description.contains("chat not found")
                || description.contains("chat_id is empty") =>
            {
                // Never started the bot, so no chat exists to deliver into.
                Ok(SendOutcome::RecipientGone)
            }
            429 => Err(ChimeError::TransientFetch(format!(
                "Telegram rate limit: {}",
                api_error.description
            ))),
            500..=599 => Err(ChimeError::TransientFetch(format!(
                "Telegram API error ({status}): {}",
                api_error.description
            ))),
            _ => Err(ChimeError::Internal(format!(
                "Telegram API error ({status}): {}",
                api_error.description
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TelegramApiError {
    #[serde(default)]
    description: String,
}
