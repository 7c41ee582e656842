//! OJS - Application Entry Point

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bollard::Docker;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ojs::config::Config;
use ojs::db;
use ojs::judge::{DockerSandbox, JudgePipeline, LanguageRegistry};
use ojs::metrics::MetricsServer;
use ojs::mq::{StreamConsumer, SubmissionCreatedProducer};
use ojs::services::{AuthService, SubmissionService};
use ojs::worker::Dispatcher;

#[derive(Parser)]
#[command(name = "ojs", about = "Online judge backend", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the submission judge worker
    Worker {
        /// Path to the YAML configuration file
        #[arg(long)]
        config_file_path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ojs=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Worker { config_file_path } => run_worker(&config_file_path).await,
    }
}

async fn run_worker(config_file_path: &std::path::Path) -> anyhow::Result<()> {
    tracing::info!("Starting OJS worker...");

    let config = Config::load(config_file_path)?;

    // Database
    tracing::info!("Connecting to database...");
    let pool = db::connect(&config.database).await?;

    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    // Message queue
    tracing::info!("Connecting to message queue...");
    let redis_config = deadpool_redis::Config::from_url(&config.mq.url);
    let redis_pool = redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1))?;

    // Docker
    tracing::info!("Connecting to Docker...");
    let docker = Docker::connect_with_socket_defaults()?;
    let docker_version = docker.version().await?;
    tracing::info!(
        "Connected to Docker version: {}",
        docker_version.version.unwrap_or_default()
    );

    // Components
    let auth = Arc::new(AuthService::new(&config.auth));
    let producer = Arc::new(SubmissionCreatedProducer::new(
        redis_pool.clone(),
        config.mq.stream.clone(),
    ));
    let submission_service = Arc::new(SubmissionService::new(
        pool.clone(),
        auth.clone(),
        producer.clone(),
    ));

    let registry = Arc::new(LanguageRegistry::from_config(&config.judge));
    let sandbox = Arc::new(DockerSandbox::new(docker));
    let pipeline = Arc::new(JudgePipeline::new(
        registry,
        sandbox,
        config.judge.workdir_root.clone(),
    ));

    tracing::info!("Preparing language images...");
    pipeline.prepare_images(config.judge.pull_image_at_startup).await?;

    // The worker session is established once; a failure here is a
    // misconfiguration and aborts startup
    Dispatcher::authenticate_worker(&pool, &auth, &config.worker).await?;

    // Shutdown signal
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_on_signal = shutdown.clone();

    tokio::spawn(async move {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        tracing::info!("Shutdown signal received, finishing current message...");
        shutdown_on_signal.store(true, Ordering::SeqCst);
    });

    // Metrics endpoint
    let metrics_port = config.metrics.port;
    tokio::spawn(async move {
        if let Err(e) = MetricsServer::run(metrics_port).await {
            tracing::error!("Metrics server error: {}", e);
        }
    });

    // Consume until shutdown
    let consumer_name = format!(
        "ojs_worker_{}",
        uuid::Uuid::new_v4().to_string().split('-').next().unwrap()
    );
    let consumer = StreamConsumer::new(redis_pool, &config.mq, consumer_name);

    let dispatcher = Dispatcher::new(consumer, submission_service, pipeline, pool, shutdown);

    tracing::info!("OJS worker ready");
    dispatcher.run().await?;

    tracing::info!("OJS worker shutdown complete");
    Ok(())
}
