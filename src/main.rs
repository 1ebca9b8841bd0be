use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

use job_intake::api::health::health_config;
use job_intake::api::job::handlers::{job_config, AppJobService, IntakeLimits};
use job_intake::api::job::JobService;
use job_intake::api::validation;
use job_intake::cli::{Cli, Command};
use job_intake::config::Config;
use job_intake::db;
use job_intake::db::storage::PgStorage;
use job_intake::engine::NoopEngine;
use job_intake::shutdown::ShutdownCoordinator;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env().expect("Failed to load configuration");

    std::fs::create_dir_all(&config.log_dir).expect("Failed to create logs directory");
    init_logging(&config.log_dir);

    let pool = db::connection::get_connection(&config.database_url, config.max_db_connections)
        .await
        .expect("Failed to connect to database");

    if let Some(Command::Migrate) = cli.command {
        db::migrations::run_migrations(&pool)
            .await
            .expect("Failed to run database migrations");
        return Ok(());
    }

    info!("Starting job-intake service");
    info!("  - Bind address: {}", config.bind_addr);
    info!("  - Max payload size: {} bytes", config.max_payload_size);
    info!("  - Max database connections: {}", config.max_db_connections);
    info!(
        "  - Max concurrent dispatches: {}",
        config.max_concurrent_dispatches
    );

    // Auto-migrate on startup
    db::migrations::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let storage = Arc::new(PgStorage::new(pool.clone()));
    let engine = Arc::new(NoopEngine);
    let service: Arc<AppJobService> = Arc::new(JobService::new(
        storage,
        engine,
        config.max_concurrent_dispatches,
    ));

    let server_pool = pool.clone();
    let service_data = web::Data::from(service.clone());
    let max_payload_size = config.max_payload_size;

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(server_pool.clone()))
            .app_data(service_data.clone())
            .app_data(web::Data::new(IntakeLimits { max_payload_size }))
            .app_data(validation::json_config())
            .configure(health_config)
            .configure(job_config)
    });

    info!("Server starting on http://{}", config.bind_addr);

    let server = server.bind(config.bind_addr.as_str())?.run();
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    let coordinator = ShutdownCoordinator::new(server_handle, server_task, service, pool);
    coordinator.wait_for_shutdown().await
}

/// File-based logging with daily rotation plus console output. Files are
/// split by level under the configured log directory.
fn init_logging(log_dir: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    let info_file = tracing_appender::rolling::daily(log_dir, "info.log");
    let error_file = tracing_appender::rolling::daily(log_dir, "error.log");

    let info_layer = tracing_subscriber::fmt::layer()
        .with_writer(info_file)
        .with_ansi(false)
        .with_filter(LevelFilter::INFO);

    let error_layer = tracing_subscriber::fmt::layer()
        .with_writer(error_file)
        .with_ansi(false)
        .with_filter(LevelFilter::ERROR);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(info_layer)
        .with(error_layer)
        .init();
}
