//! Cron scheduler driving the notifier pass.
//!
//! The notifier cadence must stay finer than the smallest configurable
//! lead time, otherwise due windows can open and close between passes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chime_core::NotifyService;
use chime_domain::constants::{DEFAULT_NOTIFY_CRON, JOB_TIMEOUT_SECS};
use chime_domain::ChimeError;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Configuration for the notify scheduler.
#[derive(Debug, Clone)]
pub struct NotifySchedulerConfig {
    /// Cron expression describing the execution schedule.
    pub cron_expression: String,
    /// Timeout applied to a single pass execution.
    pub job_timeout: Duration,
    /// Timeout for starting the underlying scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
    /// Timeout for awaiting the monitor task join handle.
    pub join_timeout: Duration,
}

impl Default for NotifySchedulerConfig {
    fn default() -> Self {
        Self {
            cron_expression: DEFAULT_NOTIFY_CRON.into(),
            job_timeout: Duration::from_secs(JOB_TIMEOUT_SECS),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Notifier scheduler with explicit lifecycle management.
pub struct NotifyScheduler {
    scheduler: Option<JobScheduler>,
    config: NotifySchedulerConfig,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
    service: Arc<NotifyService>,
}

impl NotifyScheduler {
    /// Create a scheduler with the default configuration and a custom cron.
    pub fn new(cron_expression: String, service: Arc<NotifyService>) -> Self {
        let config = NotifySchedulerConfig { cron_expression, ..Default::default() };
        Self::with_config(config, service)
    }

    /// Create a scheduler with a custom configuration.
    pub fn with_config(config: NotifySchedulerConfig, service: Arc<NotifyService>) -> Self {
        Self {
            scheduler: None,
            config,
            monitor_handle: None,
            cancellation: CancellationToken::new(),
            service,
        }
    }

    /// Start the scheduler, spawning the monitoring task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler_instance = self.build_scheduler().await?;
        let start_timeout = self.config.start_timeout;

        tokio::time::timeout(start_timeout, scheduler_instance.start())
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: start_timeout.as_secs() })?
            .map_err(|source| SchedulerError::StartFailed(source.to_string()))?;

        self.scheduler = Some(scheduler_instance);

        let cancel = self.cancellation.clone();
        let handle = tokio::spawn(async move {
            cancel.cancelled().await;
            debug!("notify scheduler monitor cancelled");
        });
        self.monitor_handle = Some(handle);

        info!(cron = %self.config.cron_expression, "notify scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for the monitor task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        let mut scheduler = match self.scheduler.take() {
            Some(scheduler) => scheduler,
            None => return Err(SchedulerError::NotRunning),
        };

        let stop_timeout = self.config.stop_timeout;
        tokio::time::timeout(stop_timeout, async move { scheduler.shutdown().await })
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: stop_timeout.as_secs() })?
            .map_err(|source| SchedulerError::StopFailed(source.to_string()))?;

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|err| SchedulerError::TaskJoinFailed(err.to_string()))?;
        }

        info!("notify scheduler stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    /// Returns true when a scheduler instance is active.
    pub fn is_running(&self) -> bool {
        self.scheduler.is_some()
    }

    async fn build_scheduler(&self) -> SchedulerResult<JobScheduler> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|source| SchedulerError::CreationFailed(source.to_string()))?;

        let cron_expr = self.config.cron_expression.clone();
        let service = Arc::clone(&self.service);
        let job_timeout = self.config.job_timeout;

        let job_definition = Job::new_async(cron_expr.as_str(), move |_id, _lock| {
            let service = Arc::clone(&service);

            Box::pin(async move {
                let started = Instant::now();

                match tokio::time::timeout(job_timeout, service.run_notify()).await {
                    Ok(Ok(report)) => {
                        debug!(
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            sent = report.reminders_sent,
                            failures = report.send_failures,
                            "scheduled notify pass finished"
                        );
                    }
                    // An unconfigured bot token means every pass would be a
                    // no-op; keep it at warn so the operator notices without
                    // an error storm.
                    Ok(Err(ChimeError::Config(msg))) => {
                        warn!(reason = %msg, "notify pass skipped: not configured");
                    }
                    Ok(Err(err)) => {
                        error!(error = %err, "scheduled notify pass failed");
                    }
                    Err(_) => {
                        warn!(
                            timeout_secs = job_timeout.as_secs(),
                            "scheduled notify pass timed out"
                        );
                    }
                }
            })
        })
        .map_err(|source| SchedulerError::JobRegistrationFailed(source.to_string()))?;

        let job_id = job_definition.guid();
        scheduler
            .add(job_definition)
            .await
            .map_err(|source| SchedulerError::JobRegistrationFailed(source.to_string()))?;

        debug!(cron = %self.config.cron_expression, job_id = %job_id, "registered notify job");
        Ok(scheduler)
    }
}

impl Drop for NotifyScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("NotifyScheduler dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}
