//! Job lifecycle types.

use aap_api::{JobKind, JobRecord};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a launched job or workflow job.
///
/// `Successful`, `Failed`, `Error` and `Canceled` are terminal. Statuses the
/// platform adds in future releases land in `Unknown` and are treated as
/// still in progress.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Created,
    Pending,
    Waiting,
    Running,
    Successful,
    Failed,
    Error,
    Canceled,
    Unknown(String),
}

impl JobStatus {
    /// Parse the raw status string reported by the platform.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "new" => JobStatus::Created,
            "pending" => JobStatus::Pending,
            "waiting" => JobStatus::Waiting,
            "running" => JobStatus::Running,
            "successful" => JobStatus::Successful,
            "failed" => JobStatus::Failed,
            "error" => JobStatus::Error,
            "canceled" => JobStatus::Canceled,
            other => JobStatus::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Created => "new",
            JobStatus::Pending => "pending",
            JobStatus::Waiting => "waiting",
            JobStatus::Running => "running",
            JobStatus::Successful => "successful",
            JobStatus::Failed => "failed",
            JobStatus::Error => "error",
            JobStatus::Canceled => "canceled",
            JobStatus::Unknown(raw) => raw,
        }
    }

    /// Whether the remote execution can no longer change status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Successful | JobStatus::Failed | JobStatus::Error | JobStatus::Canceled
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Successful)
    }
}

impl From<String> for JobStatus {
    fn from(raw: String) -> Self {
        JobStatus::parse(&raw)
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A launched job, as returned by [`JobWaiter::launch`](crate::waiter::JobWaiter::launch).
#[derive(Debug, Clone, PartialEq)]
pub struct JobHandle {
    pub kind: JobKind,
    pub id: i64,
    pub status: JobStatus,
    /// Record returned by the launch request.
    pub record: JobRecord,
    /// Fields that were provided but that the template does not prompt for.
    pub warnings: Vec<String>,
}

impl JobHandle {
    pub fn from_record(kind: JobKind, record: JobRecord) -> Self {
        Self {
            kind,
            id: record.id,
            status: JobStatus::parse(&record.status),
            record,
            warnings: Vec::new(),
        }
    }
}

/// How a wait ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Waiting is disabled; no poll was made.
    Skipped,
    /// The job reached a terminal status.
    Finished(JobStatus),
    /// The job disappeared from the platform while being polled.
    NotFound,
}
