use sqlx::{PgConnection, PgExecutor};
use tracing::debug;

use crate::db::models::Task;

/// Repository for task rows.
pub struct TaskRepository;

impl TaskRepository {
    /// Insert all tasks in a single multi-row statement. Storage-assigned
    /// identifiers are written back into the slice in order.
    ///
    /// Callers run this inside the same transaction as the job save so a
    /// job is never visible without its tasks.
    pub async fn batch_save(conn: &mut PgConnection, tasks: &mut [Task]) -> Result<(), sqlx::Error> {
        if tasks.is_empty() {
            debug!("Batch save called with no tasks");
            return Ok(());
        }

        let mut query =
            String::from("INSERT INTO tasks (job_id, sharding, name, input, plugin, status) VALUES ");
        for i in 0..tasks.len() {
            if i > 0 {
                query.push_str(", ");
            }
            let base = i * 6;
            query.push_str(&format!(
                "(${}, ${}, ${}, ${}, ${}, ${})",
                base + 1,
                base + 2,
                base + 3,
                base + 4,
                base + 5,
                base + 6
            ));
        }
        query.push_str(" RETURNING id");

        let mut q = sqlx::query_scalar::<_, i64>(&query);
        for task in tasks.iter() {
            q = q
                .bind(task.job_id)
                .bind(task.sharding)
                .bind(&task.name)
                .bind(task.input.as_slice())
                .bind(&task.plugin)
                .bind(&task.status);
        }

        let ids = q.fetch_all(&mut *conn).await?;
        for (task, id) in tasks.iter_mut().zip(ids) {
            task.id = id;
        }

        debug!("Batch inserted {} tasks", tasks.len());
        Ok(())
    }

    /// List a job's tasks in shard order.
    pub async fn list_by_job(
        executor: impl PgExecutor<'_>,
        job_id: i64,
    ) -> Result<Vec<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE job_id = $1 ORDER BY sharding ASC")
            .bind(job_id)
            .fetch_all(executor)
            .await
    }
}
