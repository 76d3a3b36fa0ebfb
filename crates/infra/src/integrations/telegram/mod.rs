//! Telegram outbound messaging.

pub mod client;
pub mod messages;

pub use client::TelegramSender;
