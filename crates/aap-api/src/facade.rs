//! The facade trait consumed by the reconcilers.
//!
//! Implementations must be stateless with respect to individual resources
//! (or synchronize internally) so one facade can be shared by every
//! reconciler through an `Arc<dyn RemoteFacade>`.

use async_trait::async_trait;

use crate::lookup::Lookup;
use crate::models::{
    InventoryRecord, InventoryRequest, JobKind, JobRecord, LaunchConfig, LaunchRequest,
    OrganizationRecord, TemplateRecord,
};
use crate::FacadeResult;

/// Typed access to the platform objects the reconcilers manage.
///
/// Guarantees:
/// - A missing object is always reported as `FacadeError::NotFound`.
/// - `launch` issues exactly one request and returns the created job.
#[async_trait]
pub trait RemoteFacade: Send + Sync {
    /// Look up an organization by id or name.
    async fn get_organization(&self, lookup: &Lookup) -> FacadeResult<OrganizationRecord>;

    /// Look up an inventory by id or `name++organization`.
    async fn get_inventory(&self, lookup: &Lookup) -> FacadeResult<InventoryRecord>;

    /// Create an inventory.
    async fn create_inventory(&self, request: &InventoryRequest) -> FacadeResult<InventoryRecord>;

    /// Replace the mutable fields of an existing inventory.
    async fn update_inventory(
        &self,
        id: i64,
        request: &InventoryRequest,
    ) -> FacadeResult<InventoryRecord>;

    /// Delete an inventory. Returns `NotFound` if it is already gone.
    async fn delete_inventory(&self, id: i64) -> FacadeResult<()>;

    /// Look up a job template or workflow job template.
    async fn get_template(&self, kind: JobKind, lookup: &Lookup) -> FacadeResult<TemplateRecord>;

    /// Read the launch prompts of a template.
    async fn launch_config(&self, kind: JobKind, template_id: i64) -> FacadeResult<LaunchConfig>;

    /// Launch a template, returning the newly created job.
    async fn launch(
        &self,
        kind: JobKind,
        template_id: i64,
        request: &LaunchRequest,
    ) -> FacadeResult<JobRecord>;

    /// Fetch the current state of a launched job.
    async fn get_job(&self, kind: JobKind, id: i64) -> FacadeResult<JobRecord>;
}
