//! Permission table.
//!
//! Immutable after program load, so it is shared across workers without
//! locking. Agent and variable names are case-sensitive; access tags are
//! normalised to `AccessRight` when the script is parsed.

use aicl_ast::{AccessRight, PermissionGrant, SmolStr};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

/// Per-agent, per-variable access grants.
#[derive(Debug, Clone, Default)]
pub struct PermissionTable {
    grants: FxHashMap<SmolStr, PermissionGrant>,
}

impl PermissionTable {
    /// Build the table from a program's permission section.
    pub fn from_grants(permissions: &IndexMap<SmolStr, PermissionGrant>) -> Self {
        Self {
            grants: permissions
                .iter()
                .map(|(agent, grant)| (agent.clone(), grant.clone()))
                .collect(),
        }
    }

    /// Check whether `agent` holds `right` on `variable`. Unknown agents
    /// and variables have no rights.
    pub fn has(&self, agent: &str, variable: &str, right: AccessRight) -> bool {
        self.grants
            .get(agent)
            .is_some_and(|grant| grant.allows(variable, right))
    }

    /// The grant record for an agent, if it has one.
    pub fn grant(&self, agent: &str) -> Option<&PermissionGrant> {
        self.grants.get(agent)
    }
}
