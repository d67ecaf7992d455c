//! Storage scope selection.

use serde::{Deserialize, Serialize};

use crate::error::{PoolError, Result};

/// Which logical tables a store call targets.
///
/// Passed explicitly to every store and orchestrator call — never ambient
/// state. The merged "effective" view (project rows shadowing shared rows
/// with the same normalized key) is computed at read time by store helpers,
/// not persisted and not a scope of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    /// Rows visible to every tenant.
    Shared,
    /// Rows owned by a single tenant.
    Project { tenant: String },
}

impl Scope {
    /// Build a scope from the wire form (`"shared"` / `"project"` + tenant).
    ///
    /// Fails with `InvalidInput` when `project` is requested without a
    /// tenant key.
    pub fn from_parts(kind: &str, tenant: Option<&str>) -> Result<Self> {
        match kind {
            "shared" => Ok(Scope::Shared),
            "project" => match tenant {
                Some(t) if !t.trim().is_empty() => Ok(Scope::Project {
                    tenant: t.trim().to_string(),
                }),
                _ => Err(PoolError::invalid("scope=project requires a tenant key")),
            },
            other => Err(PoolError::invalid(format!("unknown scope: {other}"))),
        }
    }

    /// Tenant key, if this is a project scope.
    pub fn tenant(&self) -> Option<&str> {
        match self {
            Scope::Shared => None,
            Scope::Project { tenant } => Some(tenant),
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, Scope::Shared)
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Shared => write!(f, "shared"),
            Scope::Project { tenant } => write!(f, "project:{tenant}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts() {
        assert_eq!(Scope::from_parts("shared", None).unwrap(), Scope::Shared);
        assert_eq!(
            Scope::from_parts("project", Some("acme")).unwrap(),
            Scope::Project {
                tenant: "acme".to_string()
            }
        );
    }

    #[test]
    fn test_project_without_tenant_is_invalid() {
        assert!(Scope::from_parts("project", None).is_err());
        assert!(Scope::from_parts("project", Some("  ")).is_err());
        assert!(Scope::from_parts("global", None).is_err());
    }
}
