use sqlx::{PgConnection, PgExecutor};
use tracing::debug;

use crate::db::models::Job;

/// Repository for job rows.
///
/// Writes take a `&mut PgConnection` so they can run inside a caller-owned
/// transaction; reads accept any executor.
pub struct JobRepository;

impl JobRepository {
    /// Insert the job if it has no identifier yet, otherwise update the
    /// existing row. On insert the storage-assigned id is written back
    /// into `job`.
    pub async fn save(conn: &mut PgConnection, job: &mut Job) -> Result<(), sqlx::Error> {
        if job.id == 0 {
            let (id,): (i64,) = sqlx::query_as(
                r#"
                INSERT INTO jobs
                    (name, plugin_set, label, source, task_exception_operation,
                     "type", is_async, is_notify, size, status, result)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                RETURNING id
                "#,
            )
            .bind(&job.name)
            .bind(&job.plugin_set)
            .bind(&job.label)
            .bind(&job.source)
            .bind(job.task_exception_operation)
            .bind(job.job_type)
            .bind(job.is_async)
            .bind(job.is_notify)
            .bind(job.size)
            .bind(&job.status)
            .bind(&job.result)
            .fetch_one(&mut *conn)
            .await?;

            job.id = id;
            debug!("Inserted job {} ({})", job.id, job.name);
        } else {
            sqlx::query(
                r#"
                UPDATE jobs
                SET name = $2, plugin_set = $3, label = $4, source = $5,
                    task_exception_operation = $6, "type" = $7, is_async = $8,
                    is_notify = $9, size = $10, status = $11, result = $12,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(job.id)
            .bind(&job.name)
            .bind(&job.plugin_set)
            .bind(&job.label)
            .bind(&job.source)
            .bind(job.task_exception_operation)
            .bind(job.job_type)
            .bind(job.is_async)
            .bind(job.is_notify)
            .bind(job.size)
            .bind(&job.status)
            .bind(&job.result)
            .execute(&mut *conn)
            .await?;

            debug!("Updated job {}", job.id);
        }
        Ok(())
    }

    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: i64,
    ) -> Result<Option<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn update_status(
        executor: impl PgExecutor<'_>,
        id: i64,
        status: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE jobs SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(executor)
            .await?;
        Ok(())
    }
}
