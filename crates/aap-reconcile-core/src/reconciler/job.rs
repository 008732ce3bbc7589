//! Reconciler for jobs and workflow jobs.
//!
//! A job is launched, not configured: creating one launches its template,
//! and changing any launch parameter launches a new job. The template and
//! inventory of a launched job can never change, so changing either is a
//! conflict. Jobs are never deleted on the platform; deleting one only ends
//! tracking.

use std::collections::BTreeMap;
use std::sync::Arc;

use aap_api::{JobKind, JobRecord, LaunchRequest, RemoteFacade};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::compare::ManagedValue;
use crate::domain::{ReconcileError, ResourceState, Result, WaitOutcome};
use crate::obs;
use crate::reconciler::drift::DriftCheck;
use crate::reconciler::{ReadOutcome, Reconciler};
use crate::waiter::{JobWaiter, WaitConfig};

/// Declared attributes of a job or workflow job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobAttributes {
    /// Template to launch. Immutable once launched.
    pub template_id: i64,
    /// Inventory override. Immutable once launched.
    #[serde(default)]
    pub inventory_id: Option<i64>,
    #[serde(default)]
    pub extra_vars: Option<ManagedValue>,
    #[serde(default)]
    pub limit: Option<ManagedValue>,
    #[serde(default)]
    pub job_tags: Option<ManagedValue>,
    #[serde(default)]
    pub skip_tags: Option<ManagedValue>,
    #[serde(default)]
    pub diff_mode: Option<bool>,
    #[serde(default)]
    pub verbosity: Option<i64>,
    #[serde(default)]
    pub execution_environment_id: Option<i64>,
    #[serde(default)]
    pub forks: Option<i64>,
    #[serde(default)]
    pub job_slice_count: Option<i64>,
    #[serde(default)]
    pub timeout: Option<i64>,
    #[serde(default)]
    pub instance_groups: Vec<i64>,
    #[serde(default)]
    pub credentials: Vec<i64>,
    #[serde(default)]
    pub labels: Vec<i64>,
    /// Arbitrary values; any change relaunches the job.
    #[serde(default)]
    pub triggers: BTreeMap<String, String>,
    #[serde(default)]
    pub wait: WaitConfig,
    /// Launch fields the platform accepted but ignored. Set by the reconciler.
    #[serde(default)]
    pub ignored_fields: Vec<String>,
}

impl JobAttributes {
    pub fn new(template_id: i64) -> Self {
        Self {
            template_id,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.template_id <= 0 {
            return Err(ReconcileError::validation(
                "template_id",
                "must be a positive id",
            ));
        }
        if matches!(self.inventory_id, Some(id) if id <= 0) {
            return Err(ReconcileError::validation(
                "inventory_id",
                "must be a positive id",
            ));
        }
        self.wait.validate()
    }

    /// Body of the launch request.
    pub fn launch_request(&self) -> LaunchRequest {
        let text = |value: &Option<ManagedValue>| value.as_ref().map(|v| v.raw_text().to_string());
        LaunchRequest {
            inventory: self.inventory_id,
            extra_vars: text(&self.extra_vars),
            limit: text(&self.limit),
            job_tags: text(&self.job_tags),
            skip_tags: text(&self.skip_tags),
            diff_mode: self.diff_mode,
            verbosity: self.verbosity,
            execution_environment: self.execution_environment_id,
            forks: self.forks,
            job_slice_count: self.job_slice_count,
            timeout: self.timeout,
            instance_groups: self.instance_groups.clone(),
            credentials: self.credentials.clone(),
            labels: self.labels.clone(),
        }
    }

    /// First immutable attribute that differs from `other`.
    fn immutable_change(&self, other: &JobAttributes) -> Option<&'static str> {
        if self.template_id != other.template_id {
            Some("template_id")
        } else if self.inventory_id != other.inventory_id {
            Some("inventory_id")
        } else {
            None
        }
    }

    /// Whether relaunching is needed to go from `self` to `other`.
    fn needs_relaunch(&self, other: &JobAttributes) -> bool {
        let text_differs = |a: &Option<ManagedValue>, b: &Option<ManagedValue>| match (a, b) {
            (Some(a), Some(b)) => !a.semantic_eq(b),
            (None, None) => false,
            _ => true,
        };

        text_differs(&self.extra_vars, &other.extra_vars)
            || text_differs(&self.limit, &other.limit)
            || text_differs(&self.job_tags, &other.job_tags)
            || text_differs(&self.skip_tags, &other.skip_tags)
            || self.diff_mode != other.diff_mode
            || self.verbosity != other.verbosity
            || self.execution_environment_id != other.execution_environment_id
            || self.forks != other.forks
            || self.job_slice_count != other.job_slice_count
            || self.timeout != other.timeout
            || self.instance_groups != other.instance_groups
            || self.credentials != other.credentials
            || self.labels != other.labels
            || self.triggers != other.triggers
    }
}

/// Reconciles jobs (`JobKind::Job`) or workflow jobs (`JobKind::WorkflowJob`).
#[derive(Clone)]
pub struct JobReconciler {
    kind: JobKind,
    facade: Arc<dyn RemoteFacade>,
    waiter: JobWaiter,
}

impl JobReconciler {
    pub fn new(kind: JobKind, facade: Arc<dyn RemoteFacade>) -> Self {
        Self {
            kind,
            waiter: JobWaiter::new(facade.clone()),
            facade,
        }
    }

    pub fn jobs(facade: Arc<dyn RemoteFacade>) -> Self {
        Self::new(JobKind::Job, facade)
    }

    pub fn workflow_jobs(facade: Arc<dyn RemoteFacade>) -> Self {
        Self::new(JobKind::WorkflowJob, facade)
    }

    /// Launch `declared` and wait for it as configured.
    async fn launch(
        &self,
        declared: &JobAttributes,
        cancel: &CancellationToken,
    ) -> Result<ResourceState<JobAttributes>> {
        declared.validate()?;

        let handle = self
            .waiter
            .launch(self.kind, declared.template_id, &declared.launch_request())
            .await?;

        let mut attributes = declared.clone();
        attributes.ignored_fields = handle.record.ignored_field_names();
        let mut state = ResourceState::new(handle.id, handle.record.url.clone(), attributes)
            .with_status(handle.status.as_str());

        match self
            .waiter
            .wait_until_complete(&handle, &declared.wait, cancel)
            .await
        {
            Ok(WaitOutcome::Skipped) => {}
            Ok(WaitOutcome::Finished(status)) => state.status = Some(status.to_string()),
            Ok(WaitOutcome::NotFound) => {
                let err = ReconcileError::NotFound {
                    what: format!("{} {}", self.kind, handle.id),
                };
                return Err(err.incomplete(state.snapshot(self.kind.name())));
            }
            Err(err) => {
                if let Some(status) = last_status(&err) {
                    state.status = Some(status);
                }
                return Err(err.incomplete(state.snapshot(self.kind.name())));
            }
        }

        info!(
            kind = %self.kind,
            id = state.id,
            status = state.status.as_deref().unwrap_or_default(),
            "Job reconciled"
        );
        Ok(state)
    }

    fn observe(
        &self,
        state: &ResourceState<JobAttributes>,
        record: JobRecord,
    ) -> ReadOutcome<JobAttributes> {
        let applied = &state.attributes;
        let mut check = DriftCheck::new();

        let mut observed = applied.clone();
        observed.template_id = match record.template_for(self.kind) {
            Some(template) => check.exact("template_id", &applied.template_id, template),
            None => applied.template_id,
        };
        if applied.inventory_id.is_some() {
            observed.inventory_id =
                check.exact_opt("inventory_id", applied.inventory_id.as_ref(), record.inventory);
        }
        observed.extra_vars = check.text(
            "extra_vars",
            applied.extra_vars.as_ref(),
            record.extra_vars.as_deref(),
        );
        observed.limit = check.text("limit", applied.limit.as_ref(), record.limit.as_deref());
        observed.job_tags = check.text(
            "job_tags",
            applied.job_tags.as_ref(),
            record.job_tags.as_deref(),
        );
        observed.skip_tags = check.text(
            "skip_tags",
            applied.skip_tags.as_ref(),
            record.skip_tags.as_deref(),
        );

        let drift = check.finish(self.kind.name(), record.id);
        let state = ResourceState {
            id: record.id,
            url: if record.url.is_empty() {
                state.url.clone()
            } else {
                record.url
            },
            attributes: observed,
            status: Some(record.status),
        };
        ReadOutcome::Found { state, drift }
    }
}

/// Last status reported by a wait that ended in error.
fn last_status(err: &ReconcileError) -> Option<String> {
    match err {
        ReconcileError::Timeout { last_status, .. } => Some(last_status.to_string()),
        _ => None,
    }
}

#[async_trait]
impl Reconciler for JobReconciler {
    type Attributes = JobAttributes;

    fn kind(&self) -> &'static str {
        self.kind.name()
    }

    async fn create(
        &self,
        declared: &JobAttributes,
        cancel: &CancellationToken,
    ) -> Result<ResourceState<JobAttributes>> {
        self.launch(declared, cancel).await
    }

    async fn read(
        &self,
        state: &ResourceState<JobAttributes>,
    ) -> Result<ReadOutcome<JobAttributes>> {
        match self.facade.get_job(self.kind, state.id).await {
            Ok(record) => Ok(self.observe(state, record)),
            Err(err) if err.is_not_found() => {
                obs::emit_resource_absent(self.kind.name(), state.id);
                Ok(ReadOutcome::Absent)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update(
        &self,
        state: &ResourceState<JobAttributes>,
        declared: &JobAttributes,
        cancel: &CancellationToken,
    ) -> Result<ResourceState<JobAttributes>> {
        if let Some(attribute) = state.attributes.immutable_change(declared) {
            return Err(ReconcileError::conflict(
                attribute,
                format!("{} {} was already launched with a different value", self.kind, state.id),
            ));
        }

        if state.attributes.needs_relaunch(declared) {
            debug!(kind = %self.kind, previous = state.id, "Launch parameters changed, relaunching");
            return self.launch(declared, cancel).await;
        }

        declared.validate()?;
        let mut attributes = declared.clone();
        attributes.ignored_fields = state.attributes.ignored_fields.clone();
        Ok(ResourceState {
            attributes,
            ..state.clone()
        })
    }

    async fn delete(&self, state: &ResourceState<JobAttributes>) -> Result<()> {
        debug!(kind = %self.kind, id = state.id, "Job left on the platform, tracking ended");
        Ok(())
    }
}
