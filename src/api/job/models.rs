use crate::db::models::{Job, Task};

/// Which submission entry point a job arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// Caller blocks until execution completes.
    Sync,
    /// Caller is acknowledged on durable acceptance; execution is detached.
    Async,
}

/// In-memory pairing of a job with its ordered task list.
///
/// Never persisted as such; it lives for the duration of one submission
/// request plus the reconciliation read that follows persistence.
#[derive(Debug, Clone)]
pub struct JobInfo {
    pub job: Job,
    pub tasks: Vec<Task>,
}
