//! Roles and wildcard grants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use applygate_core::{ActorId, ActorRef, DomainError, DomainResult, RoleId};

use crate::actor::SUPER_ADMIN_ROLE;
use crate::code::is_valid_segment;
use crate::pattern::WildcardPattern;

/// An administrative role.
///
/// Roles own a set of directly granted permission codes and a set of wildcard
/// grants; both live in storage (role–permission and role–wildcard tables)
/// and are resolved on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    /// Unique machine code, e.g. `verifier`.
    pub code: String,
    pub name: String,
    /// System roles ship with the portal and cannot be deleted.
    pub is_system: bool,
    pub is_active: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Attribution, stamped by the persistence layer from the ambient actor
    /// context; unset when no context is established.
    pub created_by: Option<ActorRef>,
    pub updated_by: Option<ActorRef>,
    pub deleted_by: Option<ActorRef>,
}

impl Role {
    pub fn new(code: impl Into<String>, name: impl Into<String>, now: DateTime<Utc>) -> DomainResult<Self> {
        let code = code.into();
        if !is_valid_segment(&code) {
            return Err(DomainError::validation(format!(
                "role code '{code}' must be lowercase alphanumeric/underscore"
            )));
        }
        Ok(Self {
            id: RoleId::new(),
            code,
            name: name.into(),
            is_system: false,
            is_active: true,
            deleted_at: None,
            created_at: now,
            updated_at: now,
            created_by: None,
            updated_by: None,
            deleted_by: None,
        })
    }

    pub fn system(code: impl Into<String>, name: impl Into<String>, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut role = Self::new(code, name, now)?;
        role.is_system = true;
        Ok(role)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_super_admin(&self) -> bool {
        self.code == SUPER_ADMIN_ROLE
    }

    /// System roles are undeletable; deleting one is a conflict, not a
    /// forbidden: the actor may be fully authorized and still refused.
    pub fn ensure_deletable(&self) -> DomainResult<()> {
        if self.is_system {
            return Err(DomainError::conflict(format!(
                "role '{}' is a system role and cannot be deleted",
                self.code
            )));
        }
        Ok(())
    }
}

/// A wildcard grant attached to a role. (role, pattern) pairs are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WildcardGrant {
    pub role_id: RoleId,
    pub pattern: WildcardPattern,
    pub description: String,
    pub granted_by: Option<ActorId>,
    pub granted_at: DateTime<Utc>,
}

impl WildcardGrant {
    pub fn new(
        role_id: RoleId,
        pattern: WildcardPattern,
        description: impl Into<String>,
        granted_by: Option<ActorId>,
        granted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            role_id,
            pattern,
            description: description.into(),
            granted_by,
            granted_at,
        }
    }
}
