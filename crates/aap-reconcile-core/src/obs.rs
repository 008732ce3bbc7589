//! Structured observability hooks for job and resource lifecycle events.
//!
//! This module provides:
//! - A job-scoped tracing span via `job_span`
//! - Emission functions for launch, poll, finish, timeout and drift events
//!
//! Events are emitted at `info!` level except poll failures and timeouts,
//! which are warnings. Filtering follows `RUST_LOG` (see [`crate::telemetry`]).

use std::time::Duration;

use aap_api::JobKind;
use tracing::{debug, info, warn};

use crate::domain::JobStatus;

/// Span covering the wait on one job.
///
/// Attach it with [`tracing::Instrument`] rather than entering it, since
/// the wait suspends between polls.
///
/// # Example
///
/// ```ignore
/// waiter.poll(..).instrument(job_span(JobKind::Job, 42)).await;
/// // every event emitted inside carries kind = job, job_id = 42
/// ```
pub fn job_span(kind: JobKind, job_id: i64) -> tracing::Span {
    tracing::info_span!("aap.job", kind = %kind, job_id = job_id)
}

/// Emit event: a job was launched from a template.
pub fn emit_job_launched(kind: JobKind, template_id: i64, job_id: i64) {
    info!(
        event = "job.launched",
        kind = %kind,
        template_id = template_id,
        job_id = job_id,
    );
}

/// Emit event: a launch field was provided that the template does not prompt for.
pub fn emit_launch_warning(kind: JobKind, template_id: i64, field: &str) {
    warn!(
        event = "job.launch_field_ignored",
        kind = %kind,
        template_id = template_id,
        field = %field,
    );
}

/// Emit event: one successful poll.
pub fn emit_job_polled(job_id: i64, attempt: u32, status: &JobStatus) {
    debug!(event = "job.polled", job_id = job_id, attempt = attempt, status = %status);
}

/// Emit event: a poll failed transiently and will be retried.
pub fn emit_poll_failed(job_id: i64, consecutive_failures: u32, error: &dyn std::fmt::Display) {
    warn!(
        event = "job.poll_failed",
        job_id = job_id,
        consecutive_failures = consecutive_failures,
        error = %error,
    );
}

/// Emit event: the job reached a terminal status.
pub fn emit_job_finished(job_id: i64, status: &JobStatus, polls: u32) {
    info!(
        event = "job.finished",
        job_id = job_id,
        status = %status,
        polls = polls,
        success = status.is_success(),
    );
}

/// Emit event: the wait deadline passed before the job finished.
pub fn emit_wait_timed_out(job_id: i64, waited: Duration, last_status: &JobStatus) {
    warn!(
        event = "job.wait_timed_out",
        job_id = job_id,
        waited_ms = waited.as_millis() as u64,
        last_status = %last_status,
    );
}

/// Emit event: observed attributes diverge from the applied ones.
pub fn emit_drift_detected(kind: &str, id: i64, attributes: &[String]) {
    info!(
        event = "resource.drift_detected",
        kind = %kind,
        id = id,
        attributes = %attributes.join(","),
    );
}

/// Emit event: a tracked remote object no longer exists.
pub fn emit_resource_absent(kind: &str, id: i64) {
    info!(event = "resource.absent", kind = %kind, id = id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn test_job_span_create() {
        let span = job_span(JobKind::WorkflowJob, 3);
        let _entered = span.enter();
    }

    #[traced_test]
    #[test]
    fn test_launch_event_carries_ids() {
        emit_job_launched(JobKind::Job, 7, 42);
        assert!(logs_contain("job.launched"));
        assert!(logs_contain("template_id=7"));
        assert!(logs_contain("job_id=42"));
    }

    #[traced_test]
    #[test]
    fn test_timeout_event_is_a_warning() {
        emit_wait_timed_out(9, Duration::from_secs(120), &JobStatus::Running);
        assert!(logs_contain("WARN"));
        assert!(logs_contain("waited_ms=120000"));
        assert!(logs_contain("last_status=running"));
    }

    #[traced_test]
    #[test]
    fn test_drift_event_lists_attributes() {
        emit_drift_detected("inventory", 3, &["name".to_string(), "variables".to_string()]);
        assert!(logs_contain("resource.drift_detected"));
        assert!(logs_contain("attributes=name,variables"));
    }

    #[traced_test]
    #[test]
    fn test_events_inside_job_span_carry_job_id() {
        let span = job_span(JobKind::Job, 11);
        let _entered = span.enter();
        emit_job_polled(11, 1, &JobStatus::Pending);
        assert!(logs_contain("aap.job"));
        assert!(logs_contain("status=pending"));
    }
}
