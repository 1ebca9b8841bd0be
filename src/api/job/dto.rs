use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::job::models::JobInfo;
use crate::db::models::Task;

/// One message of the chunked submission stream, framed as a JSON object
/// per line of the request body.
///
/// The first chunk's envelope fields (everything except `data`) are
/// authoritative for the job; later chunks only contribute their payload.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct JobChunk {
    #[validate(length(min = 1, max = 64, message = "Name must be between 1 and 64 characters"))]
    pub name: String,
    /// Ordered plugin pipeline. Must be non-empty on every chunk.
    pub plugin_set: Vec<String>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub task_exception_operation: i32,
    /// Payload of the task this chunk becomes.
    pub data: String,
    /// Job type identifier. Only meaningful for asynchronous submissions.
    #[serde(rename = "type", default)]
    pub job_type: i32,
    /// Request a completion notification. Only meaningful for
    /// asynchronous submissions.
    #[serde(default)]
    pub is_notify: bool,
}

#[derive(Debug, Serialize)]
pub struct AsyncSubmitResponse {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct SyncSubmitResponse {
    pub id: i64,
    pub status: String,
    pub result: Option<String>,
}

/// Completion notice pushed back by the execution engine. The endpoint
/// accepting it is deliberately unimplemented in this service.
#[derive(Debug, Deserialize, Validate)]
pub struct NotifyRequest {
    #[validate(range(min = 1, message = "job_id must be positive"))]
    pub job_id: i64,
    pub status: String,
    #[serde(default)]
    pub result: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskView {
    pub id: i64,
    pub sharding: i32,
    pub name: String,
    pub plugin: String,
    pub status: String,
}

impl From<&Task> for TaskView {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            sharding: task.sharding,
            name: task.name.clone(),
            plugin: task.plugin.clone(),
            status: task.status.clone(),
        }
    }
}

/// Canonical job state for the poll endpoint.
#[derive(Debug, Serialize)]
pub struct JobDetailResponse {
    pub id: i64,
    pub name: String,
    pub status: String,
    pub is_async: bool,
    pub size: i32,
    pub result: Option<String>,
    pub tasks: Vec<TaskView>,
}

impl From<&JobInfo> for JobDetailResponse {
    fn from(info: &JobInfo) -> Self {
        Self {
            id: info.job.id,
            name: info.job.name.clone(),
            status: info.job.status.clone(),
            is_async: info.job.is_async,
            size: info.job.size,
            result: info.job.result.clone(),
            tasks: info.tasks.iter().map(TaskView::from).collect(),
        }
    }
}
