//! API base path strategy.
//!
//! Platform releases behind the unified gateway serve the controller API
//! under `/api/controller/v2/`; older releases serve it under `/api/v2/`.
//! The layout is detected once from the `/api/` discovery document and then
//! held by the client for its whole lifetime.

use serde::{Deserialize, Serialize};

/// Where the controller API lives on a given platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiLayout {
    /// Standalone controller: `/api/v2/`.
    Legacy,
    /// Gateway-fronted platform: `/api/controller/v2/`.
    Gateway,
}

impl ApiLayout {
    /// Base path relative to the host root, without a leading slash.
    pub fn base_path(&self) -> &'static str {
        match self {
            ApiLayout::Legacy => "api/v2/",
            ApiLayout::Gateway => "api/controller/v2/",
        }
    }

    /// Pick a layout from the body of `GET /api/`.
    ///
    /// A gateway advertises its component APIs under `apis`; only the
    /// presence of a `controller` entry selects the gateway layout.
    pub fn from_discovery(body: &serde_json::Value) -> Self {
        let advertises_controller = body
            .get("apis")
            .and_then(|apis| apis.get("controller"))
            .is_some_and(|entry| !entry.is_null());

        if advertises_controller {
            ApiLayout::Gateway
        } else {
            ApiLayout::Legacy
        }
    }

    /// Join a collection-relative path onto the base path.
    pub fn resolve(&self, relative: &str) -> String {
        format!("{}{}", self.base_path(), relative.trim_start_matches('/'))
    }
}
