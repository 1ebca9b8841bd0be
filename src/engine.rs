use async_trait::async_trait;
use tracing::info;

use crate::api::job::models::JobInfo;
use crate::db::models::JobStatus;

/// Error returned by the execution engine.
#[derive(Debug, thiserror::Error)]
#[error("execution engine error: {0}")]
pub struct EngineError(pub String);

/// The external execution engine that runs a job's tasks against plugins.
///
/// This crate only triggers execution; everything after `start_job` is the
/// engine's concern. Synchronous submissions await the call and read the
/// status and result the engine wrote into the aggregate; asynchronous
/// submissions fire it from a detached task.
#[async_trait]
pub trait ExecutionEngine: Send + Sync + 'static {
    async fn start_job(&self, info: &mut JobInfo) -> Result<(), EngineError>;
}

/// Stand-in engine used until the real engine client is wired in. Marks
/// the job running and returns.
pub struct NoopEngine;

#[async_trait]
impl ExecutionEngine for NoopEngine {
    async fn start_job(&self, info: &mut JobInfo) -> Result<(), EngineError> {
        info.job.status = JobStatus::Running.as_str().to_string();
        info!(
            "Engine stub accepted job {} ({} tasks, entry plugin {:?})",
            info.job.id,
            info.tasks.len(),
            info.job.first_plugin()
        );
        Ok(())
    }
}
