use std::sync::Arc;

use mission_agent::{build_gateways, ControllerSettings, MissionControl};
use mission_core::config::{AppConfig, ConfigError, LoadOptions};
use mission_core::errors::ApplicationError;
use mission_db::{connect, migrations, DbPool, SqlLocalStateRepository};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub control: MissionControl,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("orchestration setup failed: {0}")]
    Application(#[from] ApplicationError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let gateways = build_gateways(&config)?;
    let persistence = Arc::new(SqlLocalStateRepository::new(db_pool.clone()));
    let control =
        MissionControl::new(gateways, persistence, ControllerSettings::from_config(&config))?;

    let restored = control.restore("bootstrap").await?;
    info!(
        event_name = "system.bootstrap.analysis_restored",
        correlation_id = "bootstrap",
        restored = restored.is_some(),
        backend = ?config.analysis.backend,
        "orchestration ready"
    );

    Ok(Application { config, db_pool, control })
}

#[cfg(test)]
mod tests {
    use mission_core::config::{ConfigOverrides, LoadOptions};
    use mission_core::flows::StrategyMode;

    use crate::bootstrap::bootstrap;

    fn overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_rejects_non_sqlite_database_urls() {
        let result = bootstrap(overrides("postgres://localhost/mission")).await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("database.url"));
    }

    #[tokio::test]
    async fn bootstrap_migrates_and_starts_idle() {
        let app = bootstrap(overrides("sqlite::memory:")).await.expect("bootstrap should succeed");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'local_state'",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("local_state table should exist after bootstrap");
        assert_eq!(table_count, 1);

        let state = app.control.state().await;
        assert_eq!(state.strategy_mode, StrategyMode::Idle);
        assert!(state.active_analysis.is_none());

        app.db_pool.close().await;
    }
}
