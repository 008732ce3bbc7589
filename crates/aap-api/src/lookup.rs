//! Object lookups by id or by named URL.
//!
//! The platform addresses objects either as `<collection>/<id>/` or through
//! a named URL, `<collection>/<name>++<organization>/` for organization
//! scoped objects and `<collection>/<name>/` for organizations themselves.
//! An id always wins over a name.

use serde::{Deserialize, Serialize};

use crate::error::FacadeError;
use crate::FacadeResult;

/// How to address a single remote object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Lookup {
    Id { id: i64 },
    Name { name: String },
    ScopedName { name: String, organization: String },
}

impl Lookup {
    pub fn id(id: i64) -> Self {
        Lookup::Id { id }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Lookup::Name { name: name.into() }
    }

    pub fn scoped(name: impl Into<String>, organization: impl Into<String>) -> Self {
        Lookup::ScopedName {
            name: name.into(),
            organization: organization.into(),
        }
    }

    /// Render the path of this object relative to the API base.
    pub fn path(&self, collection: &str) -> FacadeResult<String> {
        match self {
            Lookup::Id { id } if *id > 0 => Ok(format!("{collection}/{id}/")),
            Lookup::Id { id } => Err(FacadeError::InvalidLookup(format!(
                "id must be positive, got {id}"
            ))),
            Lookup::Name { name } if !name.trim().is_empty() => {
                Ok(format!("{collection}/{name}/"))
            }
            Lookup::ScopedName { name, organization }
                if !name.trim().is_empty() && !organization.trim().is_empty() =>
            {
                Ok(format!("{collection}/{name}++{organization}/"))
            }
            Lookup::Name { .. } => Err(FacadeError::InvalidLookup("name required".into())),
            Lookup::ScopedName { .. } => Err(FacadeError::InvalidLookup(
                "name and organization_name required".into(),
            )),
        }
    }
}

impl std::fmt::Display for Lookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lookup::Id { id } => write!(f, "#{id}"),
            Lookup::Name { name } => write!(f, "{name}"),
            Lookup::ScopedName { name, organization } => write!(f, "{name}++{organization}"),
        }
    }
}
