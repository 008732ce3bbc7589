//! Job waiter: launch a template and poll the resulting job to completion.
//!
//! The wait is a single loop: poll, classify, sleep. The sleep races the
//! caller's cancellation token and the deadline, so neither is observed
//! late. A poll still in flight at the deadline is abandoned and the wait
//! times out; cancellation never aborts a poll, it only stops further
//! iterations.

use std::sync::Arc;
use std::time::Duration;

use aap_api::{FacadeError, JobKind, LaunchRequest, RemoteFacade};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::domain::{JobHandle, JobStatus, ReconcileError, Result, WaitOutcome};
use crate::obs;

/// Configuration for waiting on a launched job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitConfig {
    /// Poll until the job finishes; when `false` the waiter returns at once.
    pub wait_for_completion: bool,
    /// Delay between polls.
    pub poll_interval: Duration,
    /// Overall deadline measured from the first poll.
    pub timeout: Duration,
    /// Consecutive transient poll failures tolerated before giving up.
    pub max_poll_failures: u32,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            wait_for_completion: false,
            poll_interval: Duration::from_secs(2),
            timeout: Duration::from_secs(120),
            max_poll_failures: 3,
        }
    }
}

impl WaitConfig {
    /// Default settings with waiting enabled.
    pub fn waiting() -> Self {
        Self {
            wait_for_completion: true,
            ..Self::default()
        }
    }

    pub fn with_wait_for_completion(mut self, wait: bool) -> Self {
        self.wait_for_completion = wait;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_poll_failures(mut self, max: u32) -> Self {
        self.max_poll_failures = max;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(ReconcileError::validation(
                "poll_interval",
                "must be greater than zero",
            ));
        }
        if self.wait_for_completion && self.timeout.is_zero() {
            return Err(ReconcileError::validation(
                "wait_for_completion_timeout_seconds",
                "must be greater than zero when waiting for completion",
            ));
        }
        if self.wait_for_completion && self.deadline_from(Instant::now()).is_none() {
            return Err(timeout_out_of_range());
        }
        Ok(())
    }

    /// Deadline of a wait starting at `started`, `None` if it cannot be represented.
    fn deadline_from(&self, started: Instant) -> Option<Instant> {
        started.checked_add(self.timeout)
    }
}

fn timeout_out_of_range() -> ReconcileError {
    ReconcileError::validation(
        "wait_for_completion_timeout_seconds",
        "is too large to schedule",
    )
}

/// Launches jobs and waits for them through a shared facade.
#[derive(Clone)]
pub struct JobWaiter {
    facade: Arc<dyn RemoteFacade>,
}

impl JobWaiter {
    pub fn new(facade: Arc<dyn RemoteFacade>) -> Self {
        Self { facade }
    }

    /// Validate `request` against the template's launch prompts and launch it.
    ///
    /// Every field the template asks for at launch must be provided; if any
    /// is missing nothing is launched. Provided fields the template does not
    /// prompt for are recorded in [`JobHandle::warnings`] and the launch
    /// goes ahead.
    pub async fn launch(
        &self,
        kind: JobKind,
        template_id: i64,
        request: &LaunchRequest,
    ) -> Result<JobHandle> {
        let prompts = self.facade.launch_config(kind, template_id).await?;

        let mut missing = Vec::new();
        let mut warnings = Vec::new();
        for (field, asked) in prompts.prompts() {
            match (asked, request.provides(field)) {
                (true, false) => missing.push(field),
                (false, true) => {
                    obs::emit_launch_warning(kind, template_id, field);
                    warnings.push(field.to_string());
                }
                _ => {}
            }
        }
        if !missing.is_empty() {
            return Err(ReconcileError::Validation {
                attribute: missing.join(", "),
                reason: format!("{} template {template_id} requires it at launch", kind.name()),
            });
        }

        let record = self.facade.launch(kind, template_id, request).await?;
        obs::emit_job_launched(kind, template_id, record.id);

        let mut handle = JobHandle::from_record(kind, record);
        handle.warnings = warnings;
        Ok(handle)
    }

    /// Wait for a launched job according to `config`.
    ///
    /// Returns `Skipped` without polling when waiting is disabled.
    /// Otherwise polls immediately and then every `poll_interval` until the
    /// job is terminal, disappears, the deadline passes or `cancel` fires.
    pub async fn wait_until_complete(
        &self,
        handle: &JobHandle,
        config: &WaitConfig,
        cancel: &CancellationToken,
    ) -> Result<WaitOutcome> {
        if !config.wait_for_completion {
            return Ok(WaitOutcome::Skipped);
        }
        config.validate()?;

        self.poll_until_settled(handle, config, cancel)
            .instrument(obs::job_span(handle.kind, handle.id))
            .await
    }

    async fn poll_until_settled(
        &self,
        handle: &JobHandle,
        config: &WaitConfig,
        cancel: &CancellationToken,
    ) -> Result<WaitOutcome> {
        let started = Instant::now();
        let deadline = config
            .deadline_from(started)
            .ok_or_else(timeout_out_of_range)?;
        let mut last_status = handle.status.clone();
        let mut consecutive_failures: u32 = 0;
        let mut polls: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(ReconcileError::Cancelled { job_id: handle.id });
            }

            polls += 1;
            let poll = tokio::time::timeout_at(
                deadline,
                self.facade.get_job(handle.kind, handle.id),
            );
            let Ok(polled) = poll.await else {
                return Err(timed_out(handle.id, started, last_status));
            };
            match polled {
                Ok(record) => {
                    consecutive_failures = 0;
                    let status = JobStatus::parse(&record.status);
                    obs::emit_job_polled(handle.id, polls, &status);
                    if status.is_terminal() {
                        obs::emit_job_finished(handle.id, &status, polls);
                        return Ok(WaitOutcome::Finished(status));
                    }
                    last_status = status;
                }
                Err(err) if err.is_not_found() => {
                    obs::emit_resource_absent(handle.kind.name(), handle.id);
                    return Ok(WaitOutcome::NotFound);
                }
                Err(err) if err.is_transient() => {
                    consecutive_failures += 1;
                    if consecutive_failures > config.max_poll_failures {
                        return Err(ReconcileError::Transient {
                            attempts: consecutive_failures,
                            reason: err.to_string(),
                        });
                    }
                    obs::emit_poll_failed(handle.id, consecutive_failures, &err);
                }
                Err(err) => return Err(fatal_poll_error(handle.id, err)),
            }

            // an interval too large to schedule just runs into the deadline
            let wake = Instant::now()
                .checked_add(config.poll_interval)
                .map_or(deadline, |next| next.min(deadline));
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(ReconcileError::Cancelled { job_id: handle.id });
                }
                _ = tokio::time::sleep_until(wake) => {}
            }

            if Instant::now() >= deadline {
                return Err(timed_out(handle.id, started, last_status));
            }
        }
    }
}

fn timed_out(job_id: i64, started: Instant, last_status: JobStatus) -> ReconcileError {
    let waited = started.elapsed();
    obs::emit_wait_timed_out(job_id, waited, &last_status);
    ReconcileError::Timeout {
        job_id,
        waited,
        last_status,
    }
}

fn fatal_poll_error(job_id: i64, err: FacadeError) -> ReconcileError {
    match ReconcileError::from(err) {
        ReconcileError::Fatal(reason) => {
            ReconcileError::Fatal(format!("polling job {job_id}: {reason}"))
        }
        other => other,
    }
}
