//! In-memory fake of the platform (testing only)
//!
//! `MemoryFacade` satisfies the [`RemoteFacade`] contract without any
//! network. Job status progressions are scripted per template: every
//! `get_job` call consumes one [`PollStep`] from the launched job's script.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::FacadeError;
use crate::facade::RemoteFacade;
use crate::lookup::Lookup;
use crate::models::{
    InventoryRecord, InventoryRequest, JobKind, JobRecord, LaunchConfig, LaunchRequest,
    OrganizationRecord, TemplateRecord,
};
use crate::FacadeResult;

/// One scripted answer to a `get_job` poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep {
    /// The job reports this raw status.
    Status(String),
    /// The poll fails with a transport error.
    TransportFailure,
    /// The poll fails with this HTTP status.
    HttpFailure(u16),
    /// The job has been deleted out-of-band; this and every later poll is a 404.
    Gone,
    /// The poll is accepted but never answered.
    Hang,
}

impl PollStep {
    pub fn status(raw: &str) -> Self {
        PollStep::Status(raw.to_string())
    }
}

#[derive(Debug)]
struct FakeJob {
    record: JobRecord,
    script: VecDeque<PollStep>,
    polls: usize,
}

#[derive(Debug, Default)]
struct FakeState {
    next_id: i64,
    organizations: Vec<OrganizationRecord>,
    templates: HashMap<(JobKind, i64), (TemplateRecord, LaunchConfig)>,
    scripts: HashMap<(JobKind, i64), VecDeque<Vec<PollStep>>>,
    jobs: HashMap<(JobKind, i64), FakeJob>,
    inventories: HashMap<i64, InventoryRecord>,
    launches: Vec<(JobKind, i64, LaunchRequest)>,
    inventory_writes: usize,
}

impl FakeState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn organization_name(&self, id: i64) -> Option<&str> {
        self.organizations
            .iter()
            .find(|o| o.id == id)
            .map(|o| o.name.as_str())
    }
}

/// In-memory platform backed by `HashMap`s behind a `Mutex`.
#[derive(Debug, Default)]
pub struct MemoryFacade {
    state: Mutex<FakeState>,
}

impl MemoryFacade {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register an organization and return its id.
    pub fn add_organization(&self, name: &str) -> i64 {
        let mut state = self.lock();
        let id = state.allocate_id();
        state.organizations.push(OrganizationRecord {
            id,
            name: name.to_string(),
            url: format!("/api/v2/organizations/{id}/"),
        });
        id
    }

    /// Register a template with its launch prompts and return its id.
    pub fn add_template(&self, kind: JobKind, name: &str, prompts: LaunchConfig) -> i64 {
        let mut state = self.lock();
        let id = state.allocate_id();
        let record = TemplateRecord {
            id,
            name: name.to_string(),
            url: format!("/api/v2/{}/{id}/", kind.template_collection()),
            organization: None,
        };
        state.templates.insert((kind, id), (record, prompts));
        id
    }

    /// Queue the poll script for the next job launched from a template.
    pub fn script_next_launch(&self, kind: JobKind, template_id: i64, steps: Vec<PollStep>) {
        self.lock()
            .scripts
            .entry((kind, template_id))
            .or_default()
            .push_back(steps);
    }

    /// Number of `get_job` calls that reached a job.
    pub fn poll_count(&self, kind: JobKind, job_id: i64) -> usize {
        self.lock()
            .jobs
            .get(&(kind, job_id))
            .map(|job| job.polls)
            .unwrap_or(0)
    }

    /// Every launch request received, in order.
    pub fn launches(&self) -> Vec<(JobKind, i64, LaunchRequest)> {
        self.lock().launches.clone()
    }

    /// Number of inventory create/update/delete calls.
    pub fn inventory_writes(&self) -> usize {
        self.lock().inventory_writes
    }

    /// Delete a job behind the reconciler's back.
    pub fn remove_job(&self, kind: JobKind, job_id: i64) {
        self.lock().jobs.remove(&(kind, job_id));
    }

    /// Delete an inventory behind the reconciler's back.
    pub fn remove_inventory(&self, id: i64) {
        self.lock().inventories.remove(&id);
    }

    /// Overwrite an inventory behind the reconciler's back.
    pub fn edit_inventory<F>(&self, id: i64, edit: F)
    where
        F: FnOnce(&mut InventoryRecord),
    {
        if let Some(record) = self.lock().inventories.get_mut(&id) {
            edit(record);
        }
    }

    /// Overwrite a job record behind the reconciler's back.
    pub fn edit_job<F>(&self, kind: JobKind, job_id: i64, edit: F)
    where
        F: FnOnce(&mut JobRecord),
    {
        if let Some(job) = self.lock().jobs.get_mut(&(kind, job_id)) {
            edit(&mut job.record);
        }
    }
}

fn not_found(path: String) -> FacadeError {
    FacadeError::NotFound { path }
}

#[async_trait]
impl RemoteFacade for MemoryFacade {
    async fn get_organization(&self, lookup: &Lookup) -> FacadeResult<OrganizationRecord> {
        let path = lookup.path("organizations")?;
        let state = self.lock();
        state
            .organizations
            .iter()
            .find(|org| match lookup {
                Lookup::Id { id } => org.id == *id,
                Lookup::Name { name } => &org.name == name,
                Lookup::ScopedName { .. } => false,
            })
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    async fn get_inventory(&self, lookup: &Lookup) -> FacadeResult<InventoryRecord> {
        let path = lookup.path("inventories")?;
        let state = self.lock();
        state
            .inventories
            .values()
            .find(|inv| match lookup {
                Lookup::Id { id } => inv.id == *id,
                Lookup::Name { .. } => false,
                Lookup::ScopedName { name, organization } => {
                    &inv.name == name
                        && state.organization_name(inv.organization) == Some(organization.as_str())
                }
            })
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    async fn create_inventory(&self, request: &InventoryRequest) -> FacadeResult<InventoryRecord> {
        let mut state = self.lock();
        state.inventory_writes += 1;
        if state.organization_name(request.organization).is_none() {
            return Err(FacadeError::Status {
                status: 400,
                body: format!("organization {} does not exist", request.organization),
            });
        }
        let id = state.allocate_id();
        let record = InventoryRecord {
            id,
            url: format!("/api/v2/inventories/{id}/"),
            name: request.name.clone(),
            description: request.description.clone().unwrap_or_default(),
            organization: request.organization,
            variables: request.variables.clone().unwrap_or_default(),
        };
        state.inventories.insert(id, record.clone());
        Ok(record)
    }

    async fn update_inventory(
        &self,
        id: i64,
        request: &InventoryRequest,
    ) -> FacadeResult<InventoryRecord> {
        let mut state = self.lock();
        state.inventory_writes += 1;
        let record = state
            .inventories
            .get_mut(&id)
            .ok_or_else(|| not_found(format!("inventories/{id}/")))?;
        record.name = request.name.clone();
        record.organization = request.organization;
        record.description = request.description.clone().unwrap_or_default();
        record.variables = request.variables.clone().unwrap_or_default();
        Ok(record.clone())
    }

    async fn delete_inventory(&self, id: i64) -> FacadeResult<()> {
        let mut state = self.lock();
        state.inventory_writes += 1;
        state
            .inventories
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found(format!("inventories/{id}/")))
    }

    async fn get_template(&self, kind: JobKind, lookup: &Lookup) -> FacadeResult<TemplateRecord> {
        let path = lookup.path(kind.template_collection())?;
        let state = self.lock();
        state
            .templates
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, (record, _))| record)
            .find(|record| match lookup {
                Lookup::Id { id } => record.id == *id,
                Lookup::Name { name } | Lookup::ScopedName { name, .. } => &record.name == name,
            })
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    async fn launch_config(&self, kind: JobKind, template_id: i64) -> FacadeResult<LaunchConfig> {
        self.lock()
            .templates
            .get(&(kind, template_id))
            .map(|(_, prompts)| prompts.clone())
            .ok_or_else(|| {
                not_found(format!(
                    "{}/{template_id}/launch/",
                    kind.template_collection()
                ))
            })
    }

    async fn launch(
        &self,
        kind: JobKind,
        template_id: i64,
        request: &LaunchRequest,
    ) -> FacadeResult<JobRecord> {
        let mut state = self.lock();
        if !state.templates.contains_key(&(kind, template_id)) {
            return Err(not_found(format!(
                "{}/{template_id}/launch/",
                kind.template_collection()
            )));
        }
        state.launches.push((kind, template_id, request.clone()));

        let id = state.allocate_id();
        let script = state
            .scripts
            .get_mut(&(kind, template_id))
            .and_then(|queue| queue.pop_front())
            .unwrap_or_default();
        let record = JobRecord {
            id,
            url: format!("/api/v2/{}/{id}/", kind.job_collection()),
            status: "pending".to_string(),
            job_type: (kind == JobKind::Job).then(|| "run".to_string()),
            job_template: (kind == JobKind::Job).then_some(template_id),
            workflow_job_template: (kind == JobKind::WorkflowJob).then_some(template_id),
            inventory: request.inventory,
            extra_vars: request.extra_vars.clone(),
            limit: request.limit.clone(),
            job_tags: request.job_tags.clone(),
            skip_tags: request.skip_tags.clone(),
            created: Some(Utc::now()),
            finished: None,
            ignored_fields: serde_json::Map::new(),
        };
        state.jobs.insert(
            (kind, id),
            FakeJob {
                record: record.clone(),
                script: script.into(),
                polls: 0,
            },
        );
        Ok(record)
    }

    async fn get_job(&self, kind: JobKind, id: i64) -> FacadeResult<JobRecord> {
        match self.poll_job(kind, id) {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }
}

impl MemoryFacade {
    /// Consume one script step; `None` means this poll never answers.
    fn poll_job(&self, kind: JobKind, id: i64) -> Option<FacadeResult<JobRecord>> {
        let path = format!("{}/{id}/", kind.job_collection());
        let mut state = self.lock();
        let Some(job) = state.jobs.get_mut(&(kind, id)) else {
            return Some(Err(not_found(path)));
        };
        job.polls += 1;

        let result = match job.script.pop_front() {
            None => Ok(job.record.clone()),
            Some(PollStep::Status(status)) => {
                if matches!(
                    status.as_str(),
                    "successful" | "failed" | "error" | "canceled"
                ) {
                    job.record.finished = Some(Utc::now());
                }
                job.record.status = status;
                Ok(job.record.clone())
            }
            Some(PollStep::TransportFailure) => {
                Err(FacadeError::Transport("connection reset by peer".into()))
            }
            Some(PollStep::HttpFailure(status)) => Err(FacadeError::Status {
                status,
                body: "scripted failure".into(),
            }),
            Some(PollStep::Gone) => {
                state.jobs.remove(&(kind, id));
                Err(not_found(path))
            }
            Some(PollStep::Hang) => return None,
        };
        Some(result)
    }
}
