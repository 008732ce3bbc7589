//! Resource reconcilers.
//!
//! One reconciler per managed object type. Each owns the create/read/
//! update/delete flow for its type against a shared [`RemoteFacade`] and
//! decides drift with the semantic comparator.
//!
//! [`RemoteFacade`]: aap_api::RemoteFacade

pub mod drift;
pub mod inventory;
pub mod job;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::{DriftRecord, ResourceState, Result};

pub use inventory::{InventoryAttributes, InventoryReconciler};
pub use job::{JobAttributes, JobReconciler};

/// Result of reading a tracked object back from the platform.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome<A> {
    /// The object exists. `state.attributes` holds the observed values, with
    /// semantically equal text kept as previously applied.
    Found {
        state: ResourceState<A>,
        drift: DriftRecord,
    },
    /// The object no longer exists; the host should stop tracking it.
    Absent,
}

impl<A> ReadOutcome<A> {
    pub fn is_absent(&self) -> bool {
        matches!(self, ReadOutcome::Absent)
    }
}

/// Create/read/update/delete flow for one kind of remote object.
///
/// Guarantees:
/// - Declared attributes are validated before any request is sent.
/// - Once the platform assigns a remote id, every error path carries it
///   (`ReconcileError::Incomplete`), so the host never loses track of it.
/// - `read` reports a missing object as `ReadOutcome::Absent`, never as an error.
/// - `delete` of an object that is already gone succeeds.
/// - Changing an immutable attribute in `update` is `ReconcileError::Conflict`
///   and leaves the tracked state untouched.
#[async_trait]
pub trait Reconciler: Send + Sync {
    type Attributes: Clone + Send + Sync;

    /// Name of the object type, used in logs and errors.
    fn kind(&self) -> &'static str;

    async fn create(
        &self,
        declared: &Self::Attributes,
        cancel: &CancellationToken,
    ) -> Result<ResourceState<Self::Attributes>>;

    async fn read(
        &self,
        state: &ResourceState<Self::Attributes>,
    ) -> Result<ReadOutcome<Self::Attributes>>;

    async fn update(
        &self,
        state: &ResourceState<Self::Attributes>,
        declared: &Self::Attributes,
        cancel: &CancellationToken,
    ) -> Result<ResourceState<Self::Attributes>>;

    async fn delete(&self, state: &ResourceState<Self::Attributes>) -> Result<()>;
}
