//! Domain types for reconciliation.
//!
//! - `JobStatus` / `JobHandle` / `WaitOutcome`: lifecycle of a launched job
//! - `ResourceState`: what the host persists for one remote object
//! - `DriftRecord`: attributes that changed out-of-band
//! - `ReconcileError`: the error taxonomy surfaced to the host

pub mod error;
pub mod job;
pub mod state;

pub use error::{ReconcileError, Result};
pub use job::{JobHandle, JobStatus, WaitOutcome};
pub use state::{DriftRecord, ResourceSnapshot, ResourceState};
