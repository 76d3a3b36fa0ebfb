//! Scheduling infrastructure for the two background passes.
//!
//! Cron-based schedulers with explicit lifecycle management:
//! - Explicit start/stop
//! - Join handles for spawned tasks
//! - Cancellation token support
//! - Timeout wrapping on all async operations
//!
//! Both passes are also callable on demand through the admin surface; the
//! schedulers add cadence, nothing else.

pub mod error;
pub mod notify_scheduler;
pub mod sync_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use notify_scheduler::{NotifyScheduler, NotifySchedulerConfig};
pub use sync_scheduler::{SyncScheduler, SyncSchedulerConfig};
