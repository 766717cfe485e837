use analytics_worker::{
    app, config,
    jobs::{
        run_job, Job, JobScheduler, ProcessQueueJob, PurgeExpiredJob, ResetQueueJob,
        UpdateHistoryJob,
    },
    middleware,
    services::{
        HistorySnapshotter, HttpAllowListSource, HttpRebuildTrigger, PipelineSettings,
        QueueProcessor,
    },
};
use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use domain::services::{NoopRebuildTrigger, RebuildTrigger, RecordStore};
use persistence::repositories::PgRecordStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "Telemetry analytics aggregation worker")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP surface and run the scheduled jobs in-process
    Serve,
    /// Run a single job invocation and exit
    Run {
        #[arg(value_enum)]
        task: Task,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Task {
    ProcessQueue,
    ResetQueue,
    UpdateHistory,
    PurgeExpired,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Arc::new(config::Config::load()?);

    middleware::logging::init_logging(&config.logging);
    middleware::init_metrics()?;

    info!("Starting analytics worker v{}", env!("CARGO_PKG_VERSION"));

    let db_config: persistence::db::DatabaseConfig = (&config.database).into();
    let pool = persistence::db::create_pool(&db_config).await?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    let store: Arc<dyn RecordStore> = Arc::new(PgRecordStore::new(pool.clone()));
    let settings = PipelineSettings::from(&config.pipeline);

    let rebuild: Arc<dyn RebuildTrigger> = if config.endpoints.rebuild_hook_url.is_empty() {
        Arc::new(NoopRebuildTrigger)
    } else {
        Arc::new(HttpRebuildTrigger::new(
            config.endpoints.rebuild_hook_url.clone(),
            config.endpoints.http_timeout_secs,
        )?)
    };

    let processor = QueueProcessor::new(
        Arc::clone(&store),
        Arc::new(HttpAllowListSource::new(&config.endpoints)?),
        rebuild,
        settings.clone(),
    );
    let snapshotter = HistorySnapshotter::new(Arc::clone(&store), settings);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Run { task } => {
            let job: Box<dyn Job> = match task {
                Task::ProcessQueue => Box::new(ProcessQueueJob::new(
                    processor,
                    config.schedule.process_queue_minutes,
                )),
                Task::ResetQueue => Box::new(ResetQueueJob::new(processor)),
                Task::UpdateHistory => Box::new(UpdateHistoryJob::new(
                    snapshotter,
                    config.schedule.update_history_minutes,
                )),
                Task::PurgeExpired => Box::new(PurgeExpiredJob::new(
                    store,
                    config.schedule.purge_expired_minutes,
                )),
            };

            if !run_job(job.as_ref()).await {
                bail!("Job {} failed", job.name());
            }
        }
        Command::Serve => {
            let mut scheduler = JobScheduler::new();
            scheduler.register(ProcessQueueJob::new(
                processor.clone(),
                config.schedule.process_queue_minutes,
            ));
            scheduler.register(ResetQueueJob::new(processor));
            scheduler.register(UpdateHistoryJob::new(
                snapshotter,
                config.schedule.update_history_minutes,
            ));
            scheduler.register(PurgeExpiredJob::new(
                Arc::clone(&store),
                config.schedule.purge_expired_minutes,
            ));
            scheduler.start();

            let app = app::create_app(Arc::clone(&config), store, Some(pool));

            let addr = config.socket_addr()?;
            info!("Server listening on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            scheduler.shutdown();
            scheduler.wait_for_shutdown(Duration::from_secs(30)).await;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
