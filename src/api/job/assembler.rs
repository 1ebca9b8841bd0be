use futures_util::{Stream, StreamExt};
use tracing::warn;
use validator::Validate;

use crate::api::job::dto::JobChunk;
use crate::api::job::models::{JobInfo, SubmitMode};
use crate::api::job::service::ServiceError;
use crate::db::models::{Job, JobStatus, Task, TaskStatus};

/// Consume the chunk stream and build the in-memory aggregate.
///
/// The first chunk's envelope initializes the job; a later chunk whose
/// envelope diverges is logged and otherwise ignored, the first chunk
/// stays authoritative. Every chunk, including the first, contributes
/// exactly one task bound to the first plugin of the pipeline.
///
/// No storage access happens here; any failure aborts the submission
/// before a single row is written.
pub async fn assemble<C>(mode: SubmitMode, mut chunks: C) -> Result<JobInfo, ServiceError>
where
    C: Stream<Item = Result<JobChunk, ServiceError>> + Unpin,
{
    let mut job: Option<Job> = None;
    let mut job_name = String::new();
    let mut first_plugin = String::new();
    let mut tasks: Vec<Task> = Vec::new();
    let mut sharding: i32 = 0;

    while let Some(item) = chunks.next().await {
        let chunk = item?;

        if chunk.plugin_set.is_empty() {
            return Err(ServiceError::PluginSetEmpty);
        }

        if let Some(existing) = &job {
            if chunk.name != existing.name || chunk.plugin_set.join(",") != existing.plugin_set {
                warn!(
                    "Chunk {} of job '{}' carries divergent metadata; the first chunk's envelope stays authoritative",
                    sharding, existing.name
                );
            }
        } else {
            // Only the first chunk's envelope makes it into the job, so
            // only the first chunk gets envelope validation.
            chunk
                .validate()
                .map_err(|e| ServiceError::Validation(e.to_string()))?;
            job_name = chunk.name.clone();
            first_plugin = chunk.plugin_set[0].clone();
            job = Some(job_from_chunk(mode, &chunk));
        }

        tasks.push(Task {
            id: 0,
            job_id: 0,
            sharding,
            name: format!("{}-{}", job_name, sharding),
            input: chunk.data.into_bytes(),
            plugin: first_plugin.clone(),
            status: TaskStatus::Pending.as_str().to_string(),
            output: None,
            created_at: None,
            updated_at: None,
        });
        sharding += 1;
    }

    // A stream that ends before its first chunk would otherwise produce a
    // job with no metadata at all; reject it outright.
    let mut job = job.ok_or(ServiceError::EmptySubmission)?;
    job.size = tasks.len() as i32;

    Ok(JobInfo { job, tasks })
}

fn job_from_chunk(mode: SubmitMode, chunk: &JobChunk) -> Job {
    let is_async = mode == SubmitMode::Async;
    Job {
        id: 0,
        name: chunk.name.clone(),
        plugin_set: chunk.plugin_set.join(","),
        label: chunk.label.clone(),
        source: chunk.source.clone(),
        task_exception_operation: chunk.task_exception_operation,
        // Type and notify flag only apply to the asynchronous protocol.
        job_type: if is_async { chunk.job_type } else { 0 },
        is_async,
        is_notify: is_async && chunk.is_notify,
        size: 0,
        status: JobStatus::Pending.as_str().to_string(),
        result: None,
        created_at: None,
        updated_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn chunk(name: &str, plugins: &[&str], data: &str) -> JobChunk {
        JobChunk {
            name: name.to_string(),
            plugin_set: plugins.iter().map(|p| p.to_string()).collect(),
            label: "lbl".to_string(),
            source: "src".to_string(),
            task_exception_operation: 1,
            data: data.to_string(),
            job_type: 7,
            is_notify: true,
        }
    }

    fn stream_of(chunks: Vec<JobChunk>) -> impl Stream<Item = Result<JobChunk, ServiceError>> + Unpin
    {
        stream::iter(chunks.into_iter().map(Ok).collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn three_chunks_build_three_dense_shards() {
        let chunks = stream_of(vec![
            chunk("job1", &["p1", "p2"], "a"),
            chunk("job1", &["p1", "p2"], "b"),
            chunk("job1", &["p1", "p2"], "c"),
        ]);

        let info = assemble(SubmitMode::Sync, chunks).await.expect("assembles");

        assert_eq!(info.job.size, 3);
        assert_eq!(info.job.plugin_set, "p1,p2");
        assert_eq!(info.tasks.len(), 3);
        for (i, task) in info.tasks.iter().enumerate() {
            assert_eq!(task.sharding, i as i32);
            assert_eq!(task.name, format!("job1-{}", i));
            assert_eq!(task.plugin, "p1");
        }
        assert_eq!(
            info.tasks.iter().map(|t| t.input.clone()).collect::<Vec<_>>(),
            vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]
        );
    }

    #[tokio::test]
    async fn sync_mode_clears_async_only_fields() {
        let info = assemble(SubmitMode::Sync, stream_of(vec![chunk("j", &["p1"], "a")]))
            .await
            .expect("assembles");
        assert!(!info.job.is_async);
        assert!(!info.job.is_notify);
        assert_eq!(info.job.job_type, 0);
    }

    #[tokio::test]
    async fn async_mode_keeps_type_and_notify() {
        let info = assemble(SubmitMode::Async, stream_of(vec![chunk("j", &["p1"], "a")]))
            .await
            .expect("assembles");
        assert!(info.job.is_async);
        assert!(info.job.is_notify);
        assert_eq!(info.job.job_type, 7);
    }

    #[tokio::test]
    async fn empty_plugin_set_on_any_chunk_aborts() {
        let chunks = stream_of(vec![chunk("j", &["p1"], "a"), chunk("j", &[], "b")]);
        match assemble(SubmitMode::Sync, chunks).await {
            Err(ServiceError::PluginSetEmpty) => {}
            other => panic!("expected plugin set error, got {:?}", other.map(|i| i.job.name)),
        }
    }

    #[tokio::test]
    async fn empty_stream_is_rejected() {
        match assemble(SubmitMode::Async, stream_of(vec![])).await {
            Err(ServiceError::EmptySubmission) => {}
            other => panic!("expected empty submission, got {:?}", other.map(|i| i.job.name)),
        }
    }

    #[tokio::test]
    async fn transport_error_aborts_assembly() {
        let items: Vec<Result<JobChunk, ServiceError>> = vec![
            Ok(chunk("j", &["p1"], "a")),
            Err(ServiceError::Transport("reset".to_string())),
        ];
        match assemble(SubmitMode::Sync, stream::iter(items)).await {
            Err(ServiceError::Transport(_)) => {}
            other => panic!("expected transport error, got {:?}", other.map(|i| i.job.name)),
        }
    }

    #[tokio::test]
    async fn later_chunk_metadata_is_ignored() {
        let chunks = stream_of(vec![
            chunk("first", &["p1"], "a"),
            chunk("second", &["px", "py"], "b"),
        ]);
        let info = assemble(SubmitMode::Sync, chunks).await.expect("assembles");

        assert_eq!(info.job.name, "first");
        assert_eq!(info.job.plugin_set, "p1");
        // The divergent chunk still contributes a task, named and bound
        // from the first chunk's envelope.
        assert_eq!(info.tasks[1].name, "first-1");
        assert_eq!(info.tasks[1].plugin, "p1");
    }

    #[tokio::test]
    async fn later_chunk_envelope_is_not_validated() {
        // The second chunk's name is ignored anyway, so an invalid one
        // must not abort the submission.
        let chunks = stream_of(vec![
            chunk("job1", &["p1"], "a"),
            chunk(&"x".repeat(65), &["p1"], "b"),
        ]);
        let info = assemble(SubmitMode::Sync, chunks).await.expect("assembles");

        assert_eq!(info.job.name, "job1");
        assert_eq!(info.tasks.len(), 2);
        assert_eq!(info.tasks[1].name, "job1-1");
    }

    #[tokio::test]
    async fn overlong_name_fails_validation() {
        let long = "x".repeat(65);
        match assemble(SubmitMode::Sync, stream_of(vec![chunk(&long, &["p1"], "a")])).await {
            Err(ServiceError::Validation(_)) => {}
            other => panic!("expected validation error, got {:?}", other.map(|i| i.job.name)),
        }
    }
}
