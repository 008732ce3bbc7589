//! Tracked resource state and drift records.

use serde::{Deserialize, Serialize};

/// Local mirror of one remote object.
///
/// Produced by a reconciler, persisted by the host between operations and
/// handed back on the next one. Once `id` is set it always names the same
/// remote object; an operation that ends up tracking a different object
/// returns a new state rather than rewriting this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState<A> {
    /// Remote id.
    pub id: i64,
    /// Canonical URL of the remote object.
    #[serde(default)]
    pub url: String,
    /// Attributes as last applied.
    pub attributes: A,
    /// Last observed status, for objects that have one.
    #[serde(default)]
    pub status: Option<String>,
}

impl<A> ResourceState<A> {
    pub fn new(id: i64, url: impl Into<String>, attributes: A) -> Self {
        Self {
            id,
            url: url.into(),
            attributes,
            status: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Type-erased summary carried by [`ReconcileError::Incomplete`](super::ReconcileError::Incomplete).
    pub fn snapshot(&self, kind: &str) -> ResourceSnapshot {
        ResourceSnapshot {
            kind: kind.to_string(),
            id: self.id,
            status: self.status.clone(),
        }
    }

    /// Rebuild tracked state from a snapshot and the attributes the host declared.
    pub fn from_snapshot(snapshot: &ResourceSnapshot, attributes: A) -> Self {
        Self {
            id: snapshot.id,
            url: String::new(),
            attributes,
            status: snapshot.status.clone(),
        }
    }
}

/// Identity of a remote object, independent of its attribute type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub kind: String,
    pub id: i64,
    pub status: Option<String>,
}

/// Attributes whose observed value no longer matches the applied one.
///
/// Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriftRecord {
    pub attributes: Vec<String>,
}

impl DriftRecord {
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn push(&mut self, attribute: &str) {
        self.attributes.push(attribute.to_string());
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.attributes.iter().any(|a| a == attribute)
    }
}
