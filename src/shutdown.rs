use std::sync::Arc;

use actix_web::dev::ServerHandle;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::api::job::handlers::AppJobService;

/// Orchestrates graceful shutdown: stop accepting requests, let in-flight
/// detached dispatches finish, then close the database pool.
pub struct ShutdownCoordinator {
    server_handle: ServerHandle,
    server_task: JoinHandle<Result<(), std::io::Error>>,
    service: Arc<AppJobService>,
    pool: PgPool,
}

impl ShutdownCoordinator {
    pub fn new(
        server_handle: ServerHandle,
        server_task: JoinHandle<Result<(), std::io::Error>>,
        service: Arc<AppJobService>,
        pool: PgPool,
    ) -> Self {
        Self {
            server_handle,
            server_task,
            service,
            pool,
        }
    }

    /// Block until CTRL+C or SIGTERM, then run the shutdown sequence.
    pub async fn wait_for_shutdown(self) -> Result<(), std::io::Error> {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to install CTRL+C signal handler: {:?}", e);
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => error!("Failed to install SIGTERM signal handler: {:?}", e),
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received CTRL+C signal, initiating graceful shutdown...");
            }
            _ = terminate => {
                info!("Received SIGTERM signal, initiating graceful shutdown...");
            }
        }

        self.shutdown().await
    }

    async fn shutdown(self) -> Result<(), std::io::Error> {
        info!("Stopping HTTP server (no longer accepting new requests)...");
        self.server_handle.stop(true).await;

        info!("Draining in-flight detached dispatches...");
        self.service.drain_dispatches().await;

        match self.server_task.await {
            Ok(Ok(_)) => info!("HTTP server shut down"),
            Ok(Err(e)) => error!("HTTP server encountered error during shutdown: {:?}", e),
            Err(e) => error!("HTTP server task panicked: {:?}", e),
        }

        info!("Closing database connection pool...");
        self.pool.close().await;

        info!("Graceful shutdown completed");
        Ok(())
    }
}
