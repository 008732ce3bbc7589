//! Reconciler for inventories.

use std::sync::Arc;

use aap_api::{InventoryRecord, InventoryRequest, Lookup, RemoteFacade};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::compare::ManagedValue;
use crate::domain::{ReconcileError, ResourceState, Result};
use crate::obs;
use crate::reconciler::drift::DriftCheck;
use crate::reconciler::{ReadOutcome, Reconciler};

const KIND: &str = "inventory";

/// Declared attributes of an inventory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryAttributes {
    pub name: String,
    /// Owning organization id. Takes precedence over `organization_name`.
    #[serde(default)]
    pub organization: Option<i64>,
    /// Owning organization, resolved to an id before any write.
    #[serde(default)]
    pub organization_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Inventory variables as JSON or YAML text.
    #[serde(default)]
    pub variables: Option<ManagedValue>,
}

impl InventoryAttributes {
    pub fn new(name: &str, organization: i64) -> Self {
        Self {
            name: name.to_string(),
            organization: Some(organization),
            ..Self::default()
        }
    }

    pub fn in_organization_named(name: &str, organization_name: &str) -> Self {
        Self {
            name: name.to_string(),
            organization_name: Some(organization_name.to_string()),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_variables(mut self, variables: &str) -> Self {
        self.variables = Some(ManagedValue::new(variables));
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ReconcileError::validation("name", "must not be empty"));
        }
        match (self.organization, self.organization_name.as_deref()) {
            (Some(id), _) if id <= 0 => Err(ReconcileError::validation(
                "organization",
                "must be a positive id",
            )),
            (Some(_), _) => Ok(()),
            (None, Some(name)) if !name.trim().is_empty() => Ok(()),
            _ => Err(ReconcileError::validation(
                "organization",
                "either organization or organization_name is required",
            )),
        }
    }

    fn request(&self, organization: i64) -> InventoryRequest {
        InventoryRequest {
            name: self.name.clone(),
            organization,
            description: self.description.clone(),
            variables: self
                .variables
                .as_ref()
                .map(|v| v.raw_text().to_string()),
        }
    }
}

/// Reconciles inventories.
#[derive(Clone)]
pub struct InventoryReconciler {
    facade: Arc<dyn RemoteFacade>,
}

impl InventoryReconciler {
    pub fn new(facade: Arc<dyn RemoteFacade>) -> Self {
        Self { facade }
    }

    /// Validate `declared` and resolve its organization id.
    async fn prepare(&self, declared: &InventoryAttributes) -> Result<i64> {
        declared.validate()?;
        if let Some(id) = declared.organization {
            return Ok(id);
        }

        let name = declared.organization_name.as_deref().unwrap_or_default();
        match self.facade.get_organization(&Lookup::name(name)).await {
            Ok(org) => {
                debug!(organization = %name, id = org.id, "Resolved organization");
                Ok(org.id)
            }
            Err(err) if err.is_not_found() => Err(ReconcileError::validation(
                "organization_name",
                format!("no organization named {name:?}"),
            )),
            Err(err) => Err(err.into()),
        }
    }

    fn tracked(
        declared: &InventoryAttributes,
        organization: i64,
        record: InventoryRecord,
    ) -> ResourceState<InventoryAttributes> {
        let mut attributes = declared.clone();
        attributes.organization = Some(organization);
        ResourceState::new(record.id, record.url, attributes)
    }

    fn observe(
        state: &ResourceState<InventoryAttributes>,
        record: InventoryRecord,
    ) -> ReadOutcome<InventoryAttributes> {
        let applied = &state.attributes;
        let mut check = DriftCheck::new();

        let observed = InventoryAttributes {
            name: check.exact("name", &applied.name, record.name),
            organization: check.exact_opt(
                "organization",
                applied.organization.as_ref(),
                Some(record.organization),
            ),
            organization_name: applied.organization_name.clone(),
            description: check.exact_opt(
                "description",
                applied.description.as_ref(),
                Some(record.description),
            ),
            variables: check.text(
                "variables",
                applied.variables.as_ref(),
                Some(record.variables.as_str()),
            ),
        };

        let drift = check.finish(KIND, record.id);
        let url = if record.url.is_empty() {
            state.url.clone()
        } else {
            record.url
        };
        ReadOutcome::Found {
            state: ResourceState::new(record.id, url, observed),
            drift,
        }
    }
}

#[async_trait]
impl Reconciler for InventoryReconciler {
    type Attributes = InventoryAttributes;

    fn kind(&self) -> &'static str {
        KIND
    }

    async fn create(
        &self,
        declared: &InventoryAttributes,
        _cancel: &CancellationToken,
    ) -> Result<ResourceState<InventoryAttributes>> {
        let organization = self.prepare(declared).await?;
        let record = self
            .facade
            .create_inventory(&declared.request(organization))
            .await?;
        info!(id = record.id, name = %record.name, "Inventory created");
        Ok(Self::tracked(declared, organization, record))
    }

    async fn read(
        &self,
        state: &ResourceState<InventoryAttributes>,
    ) -> Result<ReadOutcome<InventoryAttributes>> {
        match self.facade.get_inventory(&Lookup::id(state.id)).await {
            Ok(record) => Ok(Self::observe(state, record)),
            Err(err) if err.is_not_found() => {
                obs::emit_resource_absent(KIND, state.id);
                Ok(ReadOutcome::Absent)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update(
        &self,
        state: &ResourceState<InventoryAttributes>,
        declared: &InventoryAttributes,
        _cancel: &CancellationToken,
    ) -> Result<ResourceState<InventoryAttributes>> {
        let organization = self.prepare(declared).await?;
        let record = self
            .facade
            .update_inventory(state.id, &declared.request(organization))
            .await?;
        info!(id = record.id, "Inventory updated");
        Ok(Self::tracked(declared, organization, record))
    }

    async fn delete(&self, state: &ResourceState<InventoryAttributes>) -> Result<()> {
        match self.facade.delete_inventory(state.id).await {
            Ok(()) => {
                info!(id = state.id, "Inventory deleted");
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                debug!(id = state.id, "Inventory already absent");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_name_and_organization() {
        assert!(InventoryAttributes::new("web", 1).validate().is_ok());
        assert!(InventoryAttributes::in_organization_named("web", "Default")
            .validate()
            .is_ok());
        assert!(InventoryAttributes::new(" ", 1).validate().is_err());
        assert!(InventoryAttributes::new("web", 0).validate().is_err());

        let orphan = InventoryAttributes {
            name: "web".into(),
            ..Default::default()
        };
        assert!(matches!(
            orphan.validate(),
            Err(ReconcileError::Validation { ref attribute, .. }) if attribute == "organization"
        ));
    }

    #[test]
    fn test_request_omits_undeclared_fields() {
        let request = InventoryAttributes::new("web", 2)
            .with_variables("env: prod\n")
            .request(2);
        assert_eq!(request.description, None);
        assert_eq!(request.variables.as_deref(), Some("env: prod\n"));
    }
}
