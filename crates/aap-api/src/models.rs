//! Typed request and response bodies for the platform API.
//!
//! Only the fields the reconcilers read or write are modelled; everything
//! else in a response is ignored by serde.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which family of executable object a job belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Launched from a job template.
    Job,
    /// Launched from a workflow job template.
    WorkflowJob,
}

impl JobKind {
    /// Collection holding the templates this kind is launched from.
    pub fn template_collection(&self) -> &'static str {
        match self {
            JobKind::Job => "job_templates",
            JobKind::WorkflowJob => "workflow_job_templates",
        }
    }

    /// Collection holding launched jobs of this kind.
    pub fn job_collection(&self) -> &'static str {
        match self {
            JobKind::Job => "jobs",
            JobKind::WorkflowJob => "workflow_jobs",
        }
    }

    /// Human-readable name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::Job => "job",
            JobKind::WorkflowJob => "workflow_job",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A launched job or workflow job as reported by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: i64,

    #[serde(default)]
    pub url: String,

    /// Raw status string (`new`, `pending`, `running`, ...).
    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub job_type: Option<String>,

    /// Job template of a job, or the template a sliced workflow job was
    /// split from.
    #[serde(default)]
    pub job_template: Option<i64>,

    #[serde(default)]
    pub workflow_job_template: Option<i64>,

    #[serde(default)]
    pub inventory: Option<i64>,

    #[serde(default)]
    pub extra_vars: Option<String>,

    #[serde(default)]
    pub limit: Option<String>,

    #[serde(default)]
    pub job_tags: Option<String>,

    #[serde(default)]
    pub skip_tags: Option<String>,

    #[serde(default)]
    pub created: Option<DateTime<Utc>>,

    #[serde(default)]
    pub finished: Option<DateTime<Utc>>,

    /// Launch parameters the platform accepted but did not apply.
    #[serde(default)]
    pub ignored_fields: serde_json::Map<String, serde_json::Value>,
}

impl JobRecord {
    /// Template a job of `kind` was launched from.
    pub fn template_for(&self, kind: JobKind) -> Option<i64> {
        match kind {
            JobKind::Job => self.job_template,
            JobKind::WorkflowJob => self.workflow_job_template,
        }
    }

    /// Launching template, whichever key the platform filled in.
    ///
    /// A workflow job may carry both keys; its own template wins.
    pub fn template(&self) -> Option<i64> {
        self.workflow_job_template.or(self.job_template)
    }

    /// Names of ignored launch fields, mapped to declared attribute names and sorted.
    pub fn ignored_field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .ignored_fields
            .keys()
            .map(|key| match key.as_str() {
                "execution_environment" => "execution_environment_id".to_string(),
                other => other.to_string(),
            })
            .collect();
        names.sort();
        names
    }
}

/// Launch prompts of a template (`GET <template>/launch/`).
///
/// Each flag says whether the template accepts (and then requires) the
/// matching field at launch time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    pub ask_variables_on_launch: bool,
    pub ask_tags_on_launch: bool,
    pub ask_skip_tags_on_launch: bool,
    pub ask_job_type_on_launch: bool,
    pub ask_limit_on_launch: bool,
    pub ask_inventory_on_launch: bool,
    pub ask_credential_on_launch: bool,
    pub ask_execution_environment_on_launch: bool,
    pub ask_labels_on_launch: bool,
    pub ask_forks_on_launch: bool,
    pub ask_diff_mode_on_launch: bool,
    pub ask_verbosity_on_launch: bool,
    pub ask_instance_groups_on_launch: bool,
    pub ask_timeout_on_launch: bool,
    pub ask_job_slice_count_on_launch: bool,
}

impl LaunchConfig {
    /// Pair every promptable attribute name with its ask-on-launch flag.
    pub fn prompts(&self) -> [(&'static str, bool); 14] {
        [
            ("extra_vars", self.ask_variables_on_launch),
            ("job_tags", self.ask_tags_on_launch),
            ("skip_tags", self.ask_skip_tags_on_launch),
            ("diff_mode", self.ask_diff_mode_on_launch),
            ("limit", self.ask_limit_on_launch),
            ("inventory_id", self.ask_inventory_on_launch),
            ("credentials", self.ask_credential_on_launch),
            ("execution_environment", self.ask_execution_environment_on_launch),
            ("labels", self.ask_labels_on_launch),
            ("forks", self.ask_forks_on_launch),
            ("verbosity", self.ask_verbosity_on_launch),
            ("instance_groups", self.ask_instance_groups_on_launch),
            ("timeout", self.ask_timeout_on_launch),
            ("job_slice_count", self.ask_job_slice_count_on_launch),
        ]
    }
}

/// Body of `POST <template>/launch/`.
///
/// Unset fields are omitted from the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaunchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_vars: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbosity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_environment: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forks: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_slice_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instance_groups: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credentials: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<i64>,
}

impl LaunchRequest {
    /// Whether the attribute named as in [`LaunchConfig::prompts`] is set.
    pub fn provides(&self, attribute: &str) -> bool {
        match attribute {
            "extra_vars" => self.extra_vars.is_some(),
            "job_tags" => self.job_tags.is_some(),
            "skip_tags" => self.skip_tags.is_some(),
            "diff_mode" => self.diff_mode.is_some(),
            "limit" => self.limit.is_some(),
            "inventory_id" => self.inventory.is_some(),
            "credentials" => !self.credentials.is_empty(),
            "execution_environment" => self.execution_environment.is_some(),
            "labels" => !self.labels.is_empty(),
            "forks" => self.forks.is_some(),
            "verbosity" => self.verbosity.is_some(),
            "instance_groups" => !self.instance_groups.is_empty(),
            "timeout" => self.timeout.is_some(),
            "job_slice_count" => self.job_slice_count.is_some(),
            _ => false,
        }
    }
}

/// An inventory as reported by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: i64,
    #[serde(default)]
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub organization: i64,
    #[serde(default)]
    pub variables: String,
}

/// Body for creating or replacing an inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRequest {
    pub name: String,
    pub organization: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<String>,
}

/// An organization as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// A job template or workflow job template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub organization: Option<i64>,
}
