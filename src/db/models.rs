use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Job lifecycle states. Stored as lowercase text in the `status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
    /// The detached execution trigger for an asynchronous job failed.
    /// Recorded so polling callers can observe the failure.
    DispatchFailed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
            JobStatus::DispatchFailed => "dispatch_failed",
        }
    }
}

/// Task lifecycle states, stored the same way as [`JobStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
        }
    }
}

/// A submitted unit of work. `id == 0` means the job has not been
/// persisted yet; storage assigns the identifier on first save.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: i64,
    pub name: String,
    /// Ordered plugin pipeline, serialized as a comma-delimited string.
    pub plugin_set: String,
    pub label: String,
    pub source: String,
    pub task_exception_operation: i32,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub job_type: i32,
    pub is_async: bool,
    pub is_notify: bool,
    /// Number of tasks assembled for this job.
    pub size: i32,
    pub status: String,
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDateTime>,
}

impl Job {
    /// First element of the plugin pipeline, the plugin every task is
    /// bound to at ingestion time.
    pub fn first_plugin(&self) -> Option<&str> {
        self.plugin_set.split(',').next().filter(|p| !p.is_empty())
    }
}

/// One shard of a job's work. Shard indices are dense, zero-based and
/// follow stream arrival order.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Task {
    pub id: i64,
    pub job_id: i64,
    pub sharding: i32,
    pub name: String,
    pub input: Vec<u8>,
    pub plugin: String,
    pub status: String,
    pub output: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDateTime>,
}
