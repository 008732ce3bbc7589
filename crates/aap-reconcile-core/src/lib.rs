//! aap-reconcile-core: reconciliation of declared automation objects
//!
//! ## Layer 1 - Core
//!
//! Sits on top of the [`aap_api::RemoteFacade`] and provides:
//!
//! - `compare`: semantic equality of JSON/YAML/text attribute values
//! - `waiter`: launch a template and poll the job until it settles
//! - `reconciler`: create/read/update/delete per object type, with drift detection
//! - `obs` / `telemetry`: structured lifecycle events and subscriber setup

pub mod compare;
pub mod domain;
pub mod obs;
pub mod reconciler;
pub mod telemetry;
pub mod waiter;

pub use compare::{semantic_equal, ManagedValue, ValueFormat};
pub use domain::{
    DriftRecord, JobHandle, JobStatus, ReconcileError, ResourceSnapshot, ResourceState, Result,
    WaitOutcome,
};
pub use reconciler::{
    InventoryAttributes, InventoryReconciler, JobAttributes, JobReconciler, ReadOutcome,
    Reconciler,
};
pub use telemetry::{init_tracing, LogFormat, LogSettings};
pub use waiter::{JobWaiter, WaitConfig};

pub use tokio_util::sync::CancellationToken;
