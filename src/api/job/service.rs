use std::sync::Arc;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use futures_util::Stream;
use tracing::{error, warn};

use crate::api::job::assembler;
use crate::api::job::dto::{AsyncSubmitResponse, JobChunk, NotifyRequest, SyncSubmitResponse};
use crate::api::job::models::{JobInfo, SubmitMode};
use crate::api::validation::ErrorResponse;
use crate::db::storage::Storage;
use crate::engine::ExecutionEngine;
use crate::worker::Dispatcher;

/// Submission pipeline errors, translated to protocol responses once, at
/// the facade boundary.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A chunk arrived with an empty plugin pipeline.
    #[error("plugin set must not be empty")]
    PluginSetEmpty,

    /// The stream ended before a single chunk arrived.
    #[error("submission contains no chunks")]
    EmptySubmission,

    /// A chunk could not be decoded.
    #[error("malformed chunk: {0}")]
    Malformed(String),

    /// The stream failed before its clean end.
    #[error("stream transport error: {0}")]
    Transport(String),

    /// A chunk decoded but failed field validation.
    #[error("invalid chunk: {0}")]
    Validation(String),

    /// The submission body grew past the configured intake cap.
    #[error("submission payload exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// Reconciliation (or a poll) found no job for the identifier.
    #[error("job {0} not found")]
    JobNotFound(i64),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Synchronous execution failed.
    #[error("job execution failed: {0}")]
    Execution(String),

    /// Entry point defined by the protocol surface but not implemented
    /// by this service.
    #[error("{0} is not supported")]
    Unsupported(&'static str),
}

impl ServiceError {
    /// Stable machine-readable code surfaced in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::PluginSetEmpty => "plugin_set_empty",
            ServiceError::EmptySubmission => "empty_submission",
            ServiceError::Malformed(_) => "bad_chunk",
            ServiceError::Transport(_) => "transport_error",
            ServiceError::Validation(_) => "invalid_chunk",
            ServiceError::PayloadTooLarge(_) => "payload_too_large",
            ServiceError::JobNotFound(_) => "job_not_found",
            ServiceError::Database(_) => "database_error",
            ServiceError::Execution(_) => "execution_failed",
            ServiceError::Unsupported(_) => "unsupported",
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::PluginSetEmpty
            | ServiceError::EmptySubmission
            | ServiceError::Malformed(_)
            | ServiceError::Transport(_)
            | ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServiceError::JobNotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Database(_) | ServiceError::Execution(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServiceError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Storage details stay in the logs; clients get a generic body.
        let message = match self {
            ServiceError::Database(e) => {
                error!("Database error: {}", e);
                "Database error occurred".to_string()
            }
            other => {
                warn!("Request failed: {}", other);
                other.to_string()
            }
        };
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: message,
            fields: serde_json::json!({ "code": self.code() }),
        })
    }
}

/// Submission service facade: sequences assembly, persistence,
/// reconciliation and dispatch, and owns the sync/async contract.
///
/// Collaborators are injected so the pipeline is testable without
/// process-global state.
pub struct JobService<S, E> {
    storage: Arc<S>,
    engine: Arc<E>,
    dispatcher: Dispatcher<S, E>,
}

impl<S, E> JobService<S, E>
where
    S: Storage,
    E: ExecutionEngine,
{
    pub fn new(storage: Arc<S>, engine: Arc<E>, max_concurrent_dispatches: usize) -> Self {
        let dispatcher = Dispatcher::new(storage.clone(), engine.clone(), max_concurrent_dispatches);
        Self {
            storage,
            engine,
            dispatcher,
        }
    }

    /// Asynchronous submission: assemble, persist, reconcile, then fire
    /// the execution trigger detached and acknowledge immediately.
    ///
    /// Durable acceptance is the only guarantee given to the caller;
    /// execution outcome is observed later via the poll endpoint.
    pub async fn submit_async<C>(&self, chunks: C) -> Result<AsyncSubmitResponse, ServiceError>
    where
        C: Stream<Item = Result<JobChunk, ServiceError>> + Unpin,
    {
        let mut info = assembler::assemble(SubmitMode::Async, chunks)
            .await
            .map_err(|e| {
                error!("AsyncSubmit: failed to receive job stream: {}", e);
                e
            })?;

        self.persistence(&mut info).await.map_err(|e| {
            error!("AsyncSubmit: failed to persist job: {}", e);
            e
        })?;

        let info = self.reload_job_info(info.job.id).await.map_err(|e| {
            error!("AsyncSubmit: failed to reload job: {}", e);
            e
        })?;

        let id = info.job.id;
        self.dispatcher.spawn(info);

        Ok(AsyncSubmitResponse { id })
    }

    /// Synchronous submission: same intake, but execution runs on the
    /// request path and its status and result are returned to the caller.
    pub async fn submit_sync<C>(&self, chunks: C) -> Result<SyncSubmitResponse, ServiceError>
    where
        C: Stream<Item = Result<JobChunk, ServiceError>> + Unpin,
    {
        let mut info = assembler::assemble(SubmitMode::Sync, chunks)
            .await
            .map_err(|e| {
                error!("SyncSubmit: failed to receive job stream: {}", e);
                e
            })?;

        self.persistence(&mut info).await.map_err(|e| {
            error!("SyncSubmit: failed to persist job: {}", e);
            e
        })?;

        let mut info = self.reload_job_info(info.job.id).await.map_err(|e| {
            error!("SyncSubmit: failed to reload job: {}", e);
            e
        })?;

        self.engine.start_job(&mut info).await.map_err(|e| {
            error!("SyncSubmit: execution of job {} failed: {}", info.job.id, e);
            ServiceError::Execution(e.to_string())
        })?;

        Ok(SyncSubmitResponse {
            id: info.job.id,
            status: info.job.status.clone(),
            result: info.job.result.clone(),
        })
    }

    /// Completion-notification entry point. Defined by the protocol
    /// surface, deliberately unimplemented here.
    pub fn notify(&self, _req: &NotifyRequest) -> Result<(), ServiceError> {
        Err(ServiceError::Unsupported("async completion notification"))
    }

    /// Canonical job plus tasks, for the poll endpoint.
    pub async fn get_job(&self, id: i64) -> Result<JobInfo, ServiceError> {
        self.reload_job_info(id).await
    }

    /// Wait for in-flight detached dispatches; part of graceful shutdown.
    pub async fn drain_dispatches(&self) {
        self.dispatcher.drain().await;
    }

    /// Commit the assembled aggregate as a single transaction. At most
    /// one write attempt per submission.
    async fn persistence(&self, info: &mut JobInfo) -> Result<(), ServiceError> {
        self.storage.persist(info).await?;
        Ok(())
    }

    /// Re-read the just-persisted job and tasks so dispatch and the
    /// response see storage-assigned identifiers and defaults, not the
    /// client-supplied aggregate.
    async fn reload_job_info(&self, id: i64) -> Result<JobInfo, ServiceError> {
        let job = self
            .storage
            .find_job(id)
            .await?
            .ok_or(ServiceError::JobNotFound(id))?;
        let tasks = self.storage.list_tasks(id).await?;
        Ok(JobInfo { job, tasks })
    }
}
