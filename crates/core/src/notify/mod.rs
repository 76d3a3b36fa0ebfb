//! Notifier: event cache + dedup ledger → outbound reminders.

pub mod service;

pub use service::NotifyService;
