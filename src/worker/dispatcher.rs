use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::api::job::models::JobInfo;
use crate::db::models::JobStatus;
use crate::db::storage::Storage;
use crate::engine::ExecutionEngine;

/// Runs the execution trigger for asynchronous submissions.
///
/// One detached task per submission, bounded by a semaphore. The request
/// path never awaits the outcome; a failed trigger is logged with job
/// context and recorded as `dispatch_failed` so polling callers can see
/// it instead of it vanishing.
pub struct Dispatcher<S, E> {
    storage: Arc<S>,
    engine: Arc<E>,
    permits: Arc<Semaphore>,
    inflight: Mutex<Vec<JoinHandle<()>>>,
}

impl<S, E> Dispatcher<S, E>
where
    S: Storage,
    E: ExecutionEngine,
{
    pub fn new(storage: Arc<S>, engine: Arc<E>, max_concurrent: usize) -> Self {
        Self {
            storage,
            engine,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            inflight: Mutex::new(Vec::new()),
        }
    }

    /// Fire the execution trigger for a reconciled job and return
    /// immediately. The spawned task owns the aggregate outright.
    pub fn spawn(&self, mut info: JobInfo) {
        let storage = self.storage.clone();
        let engine = self.engine.clone();
        let permits = self.permits.clone();
        let job_id = info.job.id;

        let handle = tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                // Semaphore closes only during shutdown.
                Err(_) => return,
            };

            if let Err(e) = engine.start_job(&mut info).await {
                error!("Detached dispatch of job {} failed: {}", job_id, e);
                if let Err(e) = storage
                    .update_job_status(job_id, JobStatus::DispatchFailed)
                    .await
                {
                    error!("Failed to record dispatch failure for job {}: {}", job_id, e);
                }
            }
        });

        let mut inflight = self.lock_inflight();
        inflight.retain(|h| !h.is_finished());
        inflight.push(handle);
    }

    /// Wait for every in-flight detached dispatch to finish. Used during
    /// graceful shutdown.
    pub async fn drain(&self) {
        let handles: Vec<JoinHandle<()>> = self.lock_inflight().drain(..).collect();
        if handles.is_empty() {
            return;
        }
        info!("Waiting for {} in-flight dispatches", handles.len());
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Dispatch task panicked: {:?}", e);
            }
        }
        info!("All in-flight dispatches finished");
    }

    fn lock_inflight(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        match self.inflight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
