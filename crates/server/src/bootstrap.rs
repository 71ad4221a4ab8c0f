use std::sync::Arc;

use docgate_core::bulk::BulkApprovalCoordinator;
use docgate_core::config::{AppConfig, ConfigError, LoadOptions};
use docgate_core::workflow::ApprovalWorkflow;
use docgate_db::{connect, migrations, DbPool, SqlApprovalStore, SqlTrackingStore};
use docgate_notify::batcher::{BatcherSettings, NotificationBatcher};
use docgate_notify::channel::{DeliveryChannel, NoopChannel, WebhookChannel};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub workflow: Arc<ApprovalWorkflow>,
    pub coordinator: Arc<BulkApprovalCoordinator>,
    pub batcher: Arc<NotificationBatcher>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
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

    let approvals = Arc::new(SqlApprovalStore::new(db_pool.clone()));
    let tracking = Arc::new(SqlTrackingStore::new(db_pool.clone()));
    let workflow =
        Arc::new(ApprovalWorkflow::new(approvals, tracking, config.workflow.settings()));
    let coordinator = Arc::new(BulkApprovalCoordinator::new(workflow.clone()));

    let channel: Arc<dyn DeliveryChannel> = match &config.notify.webhook_url {
        Some(url) => {
            let secret = config
                .notify
                .webhook_secret
                .as_ref()
                .map(|secret| secret.expose_secret().to_owned());
            Arc::new(WebhookChannel::new(url.clone(), secret))
        }
        None => Arc::new(NoopChannel),
    };
    info!(
        event_name = "system.bootstrap.notify_channel",
        correlation_id = "bootstrap",
        channel = if config.notify.webhook_url.is_some() { "webhook" } else { "noop" },
        "notification channel initialized"
    );

    let batcher = Arc::new(NotificationBatcher::new(
        channel,
        BatcherSettings {
            window_hours: config.notify.batch_window_hours,
            portal_base_url: config.notify.portal_base_url.clone(),
        },
    ));

    Ok(Application { config, db_pool, workflow, coordinator, batcher })
}

#[cfg(test)]
mod tests {
    use docgate_core::config::{ConfigOverrides, LoadOptions};
    use docgate_core::domain::approval::{ApprovalStatus, Priority};
    use docgate_core::domain::decision::{Decision, DecisionAction};
    use docgate_core::workflow::CreateApprovalInput;

    use super::bootstrap;

    fn memory_options() -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn integration_smoke_covers_startup_and_the_decision_path() {
        let app = bootstrap(memory_options()).await.expect("bootstrap");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('approval_request', 'tracking_record')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("baseline tables present after bootstrap");
        assert_eq!(table_count, 2);

        let request = app
            .workflow
            .create(CreateApprovalInput {
                ticket: "TK-1001".to_owned(),
                document_type: "stored_procedure".to_owned(),
                object_name: "usp_LoadOrders".to_owned(),
                schema_name: "dbo".to_owned(),
                document_path: "docs/dbo.usp_LoadOrders.docx".to_owned(),
                change_type: "new".to_owned(),
                requested_by: "pipeline".to_owned(),
                priority: Priority::High,
                sla_hours: None,
                ai_enhanced: true,
                content: Some("Purpose: loads orders".to_owned()),
            })
            .await
            .expect("create through sql store");

        let updated = app
            .workflow
            .decide(&request.id, Decision::new("reviewer@corp", DecisionAction::Approve))
            .await
            .expect("approve through sql store");
        assert_eq!(updated.status, ApprovalStatus::Approved);

        let history = app.workflow.history(&request.id).await.expect("history");
        assert_eq!(history.len(), 1);

        app.db_pool.close().await;
    }
}
