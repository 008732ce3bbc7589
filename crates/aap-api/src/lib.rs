//! aap-api: Remote Client Facade for the Automation Platform
//!
//! This crate is the only place that talks to the platform's REST API.
//! Everything above it works against the [`RemoteFacade`] trait.
//!
//! ## Layer 0 - Remote Client Facade
//!
//! Focus: typed requests and responses, version-dependent path resolution
//! done once at connect time, and an error taxonomy that lets callers tell
//! "absent" from "try again" from "give up".
//!
//! ## Key Components
//!
//! - `RemoteFacade`: async trait over organizations, inventories, templates and jobs
//! - `HttpFacade`: `reqwest` implementation, created with `HttpFacade::connect`
//! - `ApiLayout`: base path strategy (`/api/v2/` vs `/api/controller/v2/`)
//! - `Lookup`: id or named-URL (`name++organization`) lookups
//! - `fakes::MemoryFacade`: scripted in-memory facade for tests

mod config;
mod error;
pub mod facade;
pub mod fakes;
mod http;
mod layout;
mod lookup;
pub mod models;

pub use config::{Auth, ConnectionConfig, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use error::FacadeError;
pub use facade::RemoteFacade;
pub use http::HttpFacade;
pub use layout::ApiLayout;
pub use lookup::Lookup;
pub use models::{
    InventoryRecord, InventoryRequest, JobKind, JobRecord, LaunchConfig, LaunchRequest,
    OrganizationRecord, TemplateRecord,
};

/// Result type for facade operations
pub type FacadeResult<T> = std::result::Result<T, FacadeError>;
