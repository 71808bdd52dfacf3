//! Actor model: the verified identity behind a request.

use applygate_core::{ActorId, ActorKind, ActorRef};

use crate::grants::GrantedSet;

/// Role code that bypasses all permission checks unconditionally.
pub const SUPER_ADMIN_ROLE: &str = "super_admin";

/// A verified actor, as produced by authentication.
///
/// Only administrators carry a permission set. Applicants and the system
/// actor carry none but still participate in audit attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Admin {
        id: ActorId,
        role_code: String,
        permissions: GrantedSet,
    },
    Applicant {
        id: ActorId,
    },
    System,
}

impl Actor {
    pub fn admin(id: ActorId, role_code: impl Into<String>, permissions: GrantedSet) -> Self {
        Self::Admin {
            id,
            role_code: role_code.into(),
            permissions,
        }
    }

    pub fn applicant(id: ActorId) -> Self {
        Self::Applicant { id }
    }

    pub fn system() -> Self {
        Self::System
    }

    pub fn kind(&self) -> ActorKind {
        match self {
            Self::Admin { .. } => ActorKind::Admin,
            Self::Applicant { .. } => ActorKind::Applicant,
            Self::System => ActorKind::System,
        }
    }

    pub fn id(&self) -> Option<ActorId> {
        match self {
            Self::Admin { id, .. } | Self::Applicant { id } => Some(*id),
            Self::System => None,
        }
    }

    /// Attribution reference for history entries and audit records.
    pub fn actor_ref(&self) -> ActorRef {
        ActorRef {
            id: self.id(),
            kind: self.kind(),
        }
    }

    pub fn permissions(&self) -> Option<&GrantedSet> {
        match self {
            Self::Admin { permissions, .. } => Some(permissions),
            _ => None,
        }
    }

    /// Super-administrator check: the fixed role code, or the full wildcard.
    pub fn is_super_admin(&self) -> bool {
        match self {
            Self::Admin {
                role_code,
                permissions,
                ..
            } => role_code == SUPER_ADMIN_ROLE || permissions.has_full(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn super_admin_by_role_code_or_full_wildcard() {
        let id = ActorId::new();
        assert!(Actor::admin(id, SUPER_ADMIN_ROLE, GrantedSet::default()).is_super_admin());
        assert!(
            Actor::admin(id, "verifier", GrantedSet::parse(["*"]).unwrap()).is_super_admin()
        );
        assert!(!Actor::admin(id, "verifier", GrantedSet::default()).is_super_admin());
        assert!(!Actor::applicant(id).is_super_admin());
        assert!(!Actor::system().is_super_admin());
    }

    #[test]
    fn actor_ref_carries_kind_and_optional_id() {
        let id = ActorId::new();
        let admin_ref = Actor::admin(id, "verifier", GrantedSet::default()).actor_ref();
        assert_eq!(admin_ref.id, Some(id));
        assert_eq!(admin_ref.kind, ActorKind::Admin);

        let system_ref = Actor::system().actor_ref();
        assert_eq!(system_ref.id, None);
        assert_eq!(system_ref.kind, ActorKind::System);
    }
}
