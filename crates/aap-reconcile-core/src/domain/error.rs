//! Reconciliation error taxonomy.

use std::time::Duration;

use aap_api::FacadeError;

use super::job::JobStatus;
use super::state::ResourceSnapshot;

/// Errors surfaced to the host by reconcilers and the job waiter.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Declared attributes are invalid; nothing was sent to the platform.
    #[error("invalid attribute {attribute}: {reason}")]
    Validation { attribute: String, reason: String },

    /// The remote object is confirmed absent.
    #[error("remote object not found: {what}")]
    NotFound { what: String },

    /// Retryable failure that outlived its retry budget.
    #[error("transient failure after {attempts} attempt(s): {reason}")]
    Transient { attempts: u32, reason: String },

    /// An immutable attribute was changed.
    #[error("cannot change {attribute}: {reason}")]
    Conflict { attribute: String, reason: String },

    #[error("job {job_id} still {last_status} after {waited:?}")]
    Timeout {
        job_id: i64,
        waited: Duration,
        last_status: JobStatus,
    },

    #[error("wait for job {job_id} was cancelled")]
    Cancelled { job_id: i64 },

    #[error("fatal: {0}")]
    Fatal(String),

    /// The remote object exists but the operation did not finish.
    ///
    /// `state` holds everything learned before the failure, including the
    /// remote id, so the host can keep tracking the object.
    #[error("{} {} created but not settled: {source}", .state.kind, .state.id)]
    Incomplete {
        state: Box<ResourceSnapshot>,
        #[source]
        source: Box<ReconcileError>,
    },
}

impl ReconcileError {
    pub fn validation(attribute: &str, reason: impl Into<String>) -> Self {
        ReconcileError::Validation {
            attribute: attribute.to_string(),
            reason: reason.into(),
        }
    }

    pub fn conflict(attribute: &str, reason: impl Into<String>) -> Self {
        ReconcileError::Conflict {
            attribute: attribute.to_string(),
            reason: reason.into(),
        }
    }

    /// Wrap `self` with the partial state of an object that already exists.
    pub fn incomplete(self, state: ResourceSnapshot) -> Self {
        ReconcileError::Incomplete {
            state: Box::new(state),
            source: Box::new(self),
        }
    }

    /// Remote id carried by the error, if any.
    pub fn remote_id(&self) -> Option<i64> {
        match self {
            ReconcileError::Timeout { job_id, .. } | ReconcileError::Cancelled { job_id } => {
                Some(*job_id)
            }
            ReconcileError::Incomplete { state, .. } => Some(state.id),
            _ => None,
        }
    }

    /// Whether the host may retry the same operation later.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReconcileError::Transient { .. } | ReconcileError::Timeout { .. } => true,
            ReconcileError::Incomplete { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

impl From<FacadeError> for ReconcileError {
    fn from(err: FacadeError) -> Self {
        match err {
            FacadeError::NotFound { path } => ReconcileError::NotFound { what: path },
            err if err.is_transient() => ReconcileError::Transient {
                attempts: 1,
                reason: err.to_string(),
            },
            FacadeError::InvalidLookup(reason) => ReconcileError::Validation {
                attribute: "lookup".into(),
                reason,
            },
            FacadeError::InvalidConfig(reason) => ReconcileError::Validation {
                attribute: "connection".into(),
                reason,
            },
            other => ReconcileError::Fatal(other.to_string()),
        }
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;
