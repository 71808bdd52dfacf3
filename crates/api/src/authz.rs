//! Declarative per-route permission requirements.
//!
//! Routes name *which* permissions gate them here; the decision itself is the
//! auth crate's. Handlers call [`require`] before touching any service.

use std::sync::LazyLock;

use applygate_auth::{Actor, PermissionRequirement, authorize};

pub static ROLES_VIEW: LazyLock<PermissionRequirement> =
    LazyLock::new(|| PermissionRequirement::parse_all(&["roles.view"]).expect("static requirement"));
pub static ROLES_CREATE: LazyLock<PermissionRequirement> = LazyLock::new(|| {
    PermissionRequirement::parse_all(&["roles.create"]).expect("static requirement")
});
pub static ROLES_EDIT: LazyLock<PermissionRequirement> =
    LazyLock::new(|| PermissionRequirement::parse_all(&["roles.edit"]).expect("static requirement"));
pub static ROLES_DELETE: LazyLock<PermissionRequirement> = LazyLock::new(|| {
    PermissionRequirement::parse_all(&["roles.delete"]).expect("static requirement")
});
pub static APPLICATIONS_VIEW: LazyLock<PermissionRequirement> = LazyLock::new(|| {
    PermissionRequirement::parse_all(&["applications.view"]).expect("static requirement")
});
/// Status edges carry their own per-edge authority; this only gates the
/// admin-facing transition endpoint as a whole.
pub static APPLICATIONS_TRANSITION: LazyLock<PermissionRequirement> = LazyLock::new(|| {
    PermissionRequirement::parse_any(&[
        "applications.verify",
        "applications.hold",
        "applications.select",
    ])
    .expect("static requirement")
});

/// Gate a handler: deny before the guarded operation executes.
pub fn require(
    actor: &Actor,
    requirement: &PermissionRequirement,
) -> Result<(), axum::response::Response> {
    authorize(actor, requirement).map_err(crate::errors::domain_error_to_response)
}
