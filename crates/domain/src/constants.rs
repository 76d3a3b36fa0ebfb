//! Domain constants shared across crates.

/// Default reminder lead time, minutes before event start.
pub const DEFAULT_LEAD_MINUTES: u32 = 15;

/// Smallest configurable lead time.
pub const MIN_LEAD_MINUTES: u32 = 5;

/// Largest configurable lead time.
pub const MAX_LEAD_MINUTES: u32 = 120;

/// How far back a synchronizer pass looks, in days.
pub const SYNC_LOOK_BACK_DAYS: i64 = 30;

/// How far ahead a synchronizer pass looks, in days.
pub const SYNC_LOOK_AHEAD_DAYS: i64 = 90;

/// Cached events older than this many days past their start are pruned.
pub const RETENTION_DAYS: i64 = 7;

/// Per-connection cap on events fetched in one pass.
pub const MAX_EVENTS_PER_SYNC: u32 = 250;

/// Default synchronizer cadence (cron, every hour at minute 0).
pub const DEFAULT_SYNC_CRON: &str = "0 0 * * * *";

/// Default notifier cadence (cron, every 5 minutes). Must stay finer than
/// [`MIN_LEAD_MINUTES`] or due windows can be skipped between passes.
pub const DEFAULT_NOTIFY_CRON: &str = "0 */5 * * * *";

/// Bounded timeout for outbound HTTP calls, seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 15;

/// Timeout applied to a single scheduled job execution, seconds.
pub const JOB_TIMEOUT_SECS: u64 = 300;

/// Reminder descriptions are truncated to this many characters for display.
/// Storage keeps the full text.
pub const DESCRIPTION_PREVIEW_CHARS: usize = 200;

/// Languages the message catalog ships translations for.
pub const SUPPORTED_LANGUAGES: [&str; 3] = ["en", "ru", "es"];

/// Fallback language when a user's preference is unknown or unsupported.
pub const DEFAULT_LANGUAGE: &str = "en";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_bounds_are_sane() {
        assert!(MIN_LEAD_MINUTES <= DEFAULT_LEAD_MINUTES);
        assert!(DEFAULT_LEAD_MINUTES <= MAX_LEAD_MINUTES);
    }

    #[test]
    fn retention_is_inside_look_back() {
        // Pruning further out than the fetch window would resurrect events
        // on the next pass.
        assert!(RETENTION_DAYS <= SYNC_LOOK_BACK_DAYS);
    }
}
