//! Chime - calendar notification bot service.
//!
//! Boots the wired context, starts the two pass schedulers, and serves the
//! operational HTTP surface until shutdown.

use std::sync::Arc;

use chime_api::utils::logging::init_tracing;
use chime_api::{router, AppContext};
use chime_infra::{NotifyScheduler, SyncScheduler};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before reading any configuration.
    match dotenvy::dotenv() {
        Ok(path) => println!("Loaded .env from: {}", path.display()),
        Err(_) => println!("No .env file found, using process environment"),
    }

    init_tracing();

    let config = chime_infra::config::load()?;
    let ctx = Arc::new(AppContext::new(config.clone())?);

    let mut sync_scheduler =
        SyncScheduler::new(config.scheduler.sync_cron.clone(), Arc::clone(&ctx.sync_service));
    let mut notify_scheduler = NotifyScheduler::new(
        config.scheduler.notify_cron.clone(),
        Arc::clone(&ctx.notify_service),
    );

    if config.scheduler.enabled {
        sync_scheduler.start().await?;
        notify_scheduler.start().await?;
    } else {
        warn!("background scheduling disabled; passes run only via manual triggers");
    }

    let app = router(Arc::clone(&ctx));
    let listener = tokio::net::TcpListener::bind(&config.admin.bind_addr).await?;
    info!(addr = %config.admin.bind_addr, "admin surface listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    if sync_scheduler.is_running() {
        if let Err(err) = sync_scheduler.stop().await {
            error!(error = %err, "failed to stop sync scheduler");
        }
    }
    if notify_scheduler.is_running() {
        if let Err(err) = notify_scheduler.stop().await {
            error!(error = %err, "failed to stop notify scheduler");
        }
    }

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
