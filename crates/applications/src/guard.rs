//! Transition guard: edge validity plus per-edge actor authority.

use std::sync::LazyLock;

use applygate_auth::{Actor, PermissionCode};
use applygate_core::{ActorId, DomainError, DomainResult};

use crate::status::{ApplicationStatus, is_valid_transition};

static VERIFY: LazyLock<PermissionCode> =
    LazyLock::new(|| PermissionCode::parse("applications.verify").expect("static code"));
static HOLD: LazyLock<PermissionCode> =
    LazyLock::new(|| PermissionCode::parse("applications.hold").expect("static code"));
static SELECT: LazyLock<PermissionCode> =
    LazyLock::new(|| PermissionCode::parse("applications.select").expect("static code"));

/// Who may drive an application across a given edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionAuthority {
    /// The owning applicant, or the system actor.
    OwnerOrSystem,
    /// The system actor, or an administrator holding the given permission.
    AdminOrSystem(PermissionCode),
}

/// Fixed authority table, keyed by the edge being taken.
///
/// Submission and withdrawal belong to the applicant; eligibility verdicts
/// to verification; hold/release and selection outcomes to the respective
/// administrative permissions.
pub fn required_authority(
    from: ApplicationStatus,
    to: ApplicationStatus,
) -> TransitionAuthority {
    use ApplicationStatus::*;
    match (from, to) {
        (_, Submitted) | (_, Withdrawn) => TransitionAuthority::OwnerOrSystem,
        (OnHold, Eligible) => TransitionAuthority::AdminOrSystem(HOLD.clone()),
        (_, Eligible) | (_, NotEligible) => TransitionAuthority::AdminOrSystem(VERIFY.clone()),
        (_, OnHold) => TransitionAuthority::AdminOrSystem(HOLD.clone()),
        (_, ProvisionalSelected) | (_, Rejected) => {
            TransitionAuthority::AdminOrSystem(SELECT.clone())
        }
        // No edges lead into Draft; validity rejects these before authority
        // is consulted, so any permission works here.
        (_, Draft) => TransitionAuthority::AdminOrSystem(VERIFY.clone()),
    }
}

impl TransitionAuthority {
    pub fn permits(&self, actor: &Actor, owner: ActorId) -> bool {
        match (self, actor) {
            (_, Actor::System) => true,
            (TransitionAuthority::OwnerOrSystem, Actor::Applicant { id }) => *id == owner,
            (TransitionAuthority::OwnerOrSystem, _) => false,
            (TransitionAuthority::AdminOrSystem(code), actor @ Actor::Admin { permissions, .. }) => {
                actor.is_super_admin() || permissions.has_permission(code)
            }
            (TransitionAuthority::AdminOrSystem(_), _) => false,
        }
    }
}

/// Validate one transition attempt: the edge must exist in the table and the
/// actor must hold authority over it. Pure; the atomic commit happens in the
/// storage layer afterwards.
pub fn authorize_transition(
    from: ApplicationStatus,
    to: ApplicationStatus,
    actor: &Actor,
    owner: ActorId,
) -> DomainResult<()> {
    if !is_valid_transition(from, to) {
        return Err(DomainError::invalid_transition(format!(
            "'{from}' does not allow '{to}'"
        )));
    }
    let authority = required_authority(from, to);
    if !authority.permits(actor, owner) {
        return Err(DomainError::forbidden(format!(
            "{} actor may not move an application from '{from}' to '{to}'",
            actor.kind()
        )));
    }
    Ok(())
}
