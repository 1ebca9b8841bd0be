use async_trait::async_trait;
use sqlx::PgPool;

use crate::api::job::models::JobInfo;
use crate::db::job_repository::JobRepository;
use crate::db::models::{Job, JobStatus, Task};
use crate::db::task_repository::TaskRepository;

/// Persistence seam for the submission pipeline.
///
/// The service depends on this trait instead of the concrete repositories
/// so tests can substitute an in-memory double and assert on the exact
/// storage interactions.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Durably store the job and all of its tasks as one atomic unit.
    ///
    /// Assigns the job's identifier, stamps it onto every task and writes
    /// the generated task identifiers back into the aggregate. Either
    /// everything commits or nothing does.
    async fn persist(&self, info: &mut JobInfo) -> Result<(), sqlx::Error>;

    async fn find_job(&self, id: i64) -> Result<Option<Job>, sqlx::Error>;

    /// A job's tasks in shard order.
    async fn list_tasks(&self, job_id: i64) -> Result<Vec<Task>, sqlx::Error>;

    async fn update_job_status(&self, id: i64, status: JobStatus) -> Result<(), sqlx::Error>;
}

/// PostgreSQL-backed [`Storage`] built on the row repositories.
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn persist(&self, info: &mut JobInfo) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // Saving the job first is what assigns its identifier.
        JobRepository::save(&mut tx, &mut info.job).await?;
        for task in info.tasks.iter_mut() {
            task.job_id = info.job.id;
        }
        TaskRepository::batch_save(&mut tx, &mut info.tasks).await?;

        // Dropping the transaction without commit rolls everything back,
        // so a failed batch save leaves no job row behind.
        tx.commit().await
    }

    async fn find_job(&self, id: i64) -> Result<Option<Job>, sqlx::Error> {
        JobRepository::find_by_id(&self.pool, id).await
    }

    async fn list_tasks(&self, job_id: i64) -> Result<Vec<Task>, sqlx::Error> {
        TaskRepository::list_by_job(&self.pool, job_id).await
    }

    async fn update_job_status(&self, id: i64, status: JobStatus) -> Result<(), sqlx::Error> {
        JobRepository::update_status(&self.pool, id, status.as_str()).await
    }
}
