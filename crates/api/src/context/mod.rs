//! Application context (dependency injection).
//!
//! Everything downstream receives its collaborators from here at
//! construction time; there is no ambient global state.

use std::sync::Arc;

use chime_core::ports::{
    ConnectionRepository, EventCacheRepository, MessageSender, NotificationSettingsRepository,
    SentNotificationLedger, SettingsStore, StatisticsRepository, UserRepository,
};
use chime_core::{NotifyService, SyncService};
use chime_domain::{Config, Result};
use chime_infra::integrations::calendar::providers::create_all;
use chime_infra::{
    DbManager, SqliteConnectionRepository, SqliteEventCacheRepository,
    SqliteNotificationSettingsRepository, SqliteSentNotificationLedger, SqliteSettingsStore,
    SqliteStatisticsRepository, SqliteUserRepository, TelegramSender,
};
use tracing::info;

/// Shared application context holding the wired service graph.
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub users: Arc<dyn UserRepository>,
    pub connections: Arc<dyn ConnectionRepository>,
    pub events: Arc<dyn EventCacheRepository>,
    pub ledger: Arc<dyn SentNotificationLedger>,
    pub notification_settings: Arc<dyn NotificationSettingsRepository>,
    pub system_settings: Arc<dyn SettingsStore>,
    pub statistics: Arc<dyn StatisticsRepository>,
    pub sync_service: Arc<SyncService>,
    pub notify_service: Arc<NotifyService>,
}

impl AppContext {
    /// Build the full dependency graph from configuration: open the
    /// database, apply migrations, construct repositories, adapters, and
    /// the two pass services.
    pub fn new(config: Config) -> Result<Self> {
        let db =
            Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
        db.run_migrations()?;

        let pool = db.pool();

        let users: Arc<dyn UserRepository> =
            Arc::new(SqliteUserRepository::new(Arc::clone(&pool)));
        let connections: Arc<dyn ConnectionRepository> =
            Arc::new(SqliteConnectionRepository::new(Arc::clone(&pool)));
        let events: Arc<dyn EventCacheRepository> =
            Arc::new(SqliteEventCacheRepository::new(Arc::clone(&pool)));
        let ledger: Arc<dyn SentNotificationLedger> =
            Arc::new(SqliteSentNotificationLedger::new(Arc::clone(&pool)));
        let notification_settings: Arc<dyn NotificationSettingsRepository> =
            Arc::new(SqliteNotificationSettingsRepository::new(Arc::clone(&pool)));
        let system_settings: Arc<dyn SettingsStore> =
            Arc::new(SqliteSettingsStore::new(Arc::clone(&pool)));
        let statistics: Arc<dyn StatisticsRepository> =
            Arc::new(SqliteStatisticsRepository::new(pool));

        let providers = create_all(&system_settings);

        let sender: Arc<dyn MessageSender> = Arc::new(TelegramSender::new(
            Arc::clone(&system_settings),
            Arc::clone(&users),
        ));

        let sync_service = Arc::new(SyncService::new(
            providers,
            Arc::clone(&connections),
            Arc::clone(&events),
            Arc::clone(&ledger),
        ));

        let notify_service = Arc::new(NotifyService::new(
            Arc::clone(&connections),
            Arc::clone(&events),
            Arc::clone(&ledger),
            Arc::clone(&notification_settings),
            Arc::clone(&sender),
        ));

        info!(db_path = %config.database.path, "application context initialised");

        Ok(Self {
            config,
            db,
            users,
            connections,
            events,
            ledger,
            notification_settings,
            system_settings,
            statistics,
            sync_service,
            notify_service,
        })
    }
}

#[cfg(test)]
mod tests {
    use chime_domain::{AdminConfig, DatabaseConfig, SchedulerConfig};
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn context_wires_a_working_graph() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            database: DatabaseConfig {
                path: temp.path().join("chime.db").display().to_string(),
                pool_size: 2,
            },
            scheduler: SchedulerConfig::default(),
            admin: AdminConfig { bind_addr: "127.0.0.1:0".into() },
        };

        let ctx = AppContext::new(config).expect("context builds");
        ctx.db.health_check().expect("database is reachable");

        // An empty world syncs nothing and is not an error.
        let report = ctx.sync_service.run_sync().await.expect("sync pass runs");
        assert_eq!(report.users_seen, 0);
    }
}
