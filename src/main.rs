use std::sync::Arc;

use anyhow::Context;
use migration::Migrator;
use sea_orm_migration::MigratorTrait;
use tokio_util::sync::CancellationToken;

use doctrack::config::ConfigLoader;
use doctrack::dispatcher::Dispatcher;
use doctrack::events::EventBus;
use doctrack::notify::{LoggingNotifier, Notifier, RelayNotifier};
use doctrack::repositories::{EmailLogRepository, ReminderJobRepository, RequirementRepository};
use doctrack::scheduler::ReminderScheduler;
use doctrack::server::{run_server, AppState};
use doctrack::{db, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::new()
        .load()
        .context("failed to load configuration")?;
    telemetry::init_tracing(&config).context("failed to initialize tracing")?;

    if let Ok(redacted) = config.redacted_json() {
        tracing::info!(config = %redacted, "configuration loaded");
    }

    let db = db::init_pool(&config).await?;
    Migrator::up(&db, None)
        .await
        .context("failed to run database migrations")?;

    let notifier: Arc<dyn Notifier> = if config.notifier.relay_url.is_some() {
        Arc::new(RelayNotifier::new(&config.notifier)?)
    } else {
        tracing::warn!("no mail relay configured; notifications are logged only");
        Arc::new(LoggingNotifier)
    };

    let events = EventBus::default();
    let requirements = RequirementRepository::new(db.clone(), events.clone());
    let jobs = ReminderJobRepository::new(db.clone(), events.clone());
    let email_log = EmailLogRepository::new(db.clone());
    let scheduler = ReminderScheduler::new(requirements.clone(), jobs.clone(), &config.sweep);
    let dispatcher = Arc::new(Dispatcher::new(
        requirements.clone(),
        jobs,
        email_log.clone(),
        notifier,
        config.sweep.clone(),
        config.escalation_recipients.clone(),
    ));

    let shutdown = CancellationToken::new();
    let sweep_handle = tokio::spawn(dispatcher.clone().run(shutdown.clone()));

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            signal_token.cancel();
        }
    });

    let state = AppState {
        db,
        config: Arc::new(config),
        events,
        requirements,
        scheduler,
        dispatcher,
        email_log,
    };
    let result = run_server(state, shutdown.clone()).await;

    shutdown.cancel();
    let _ = sweep_handle.await;
    result
}
