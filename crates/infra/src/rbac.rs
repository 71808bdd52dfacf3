//! Role administration and effective-permission resolution.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use applygate_auth::{
    EffectivePermissions, PermissionCatalog, PermissionCode, Role, WildcardGrant,
    WildcardPattern, current_context, resolve_effective,
};
use applygate_core::{ActorId, DomainError, DomainResult, RoleId};

use crate::audit::{AuditEvent, AuditLog};
use crate::store::RoleStore;

/// The portal's permission catalog.
///
/// Deployments can build their own; this is the default set the admin portal
/// ships with.
pub fn default_permission_catalog() -> DomainResult<PermissionCatalog> {
    let mut builder = PermissionCatalog::builder();
    for (code, description) in [
        ("applications.view", "View applications"),
        ("applications.edit", "Edit application data"),
        ("applications.verify", "Record eligibility verdicts"),
        ("applications.hold", "Place applications on hold and release them"),
        ("applications.select", "Record selection outcomes"),
        ("roles.view", "View roles and their permissions"),
        ("roles.create", "Create roles"),
        ("roles.edit", "Edit roles and grants"),
        ("roles.delete", "Delete roles"),
        ("users.view", "View admin users"),
        ("users.create", "Create admin users"),
        ("masters.districts.view", "View district master data"),
        ("masters.districts.edit", "Edit district master data"),
        ("masters.posts.view", "View post master data"),
        ("masters.posts.edit", "Edit post master data"),
    ] {
        builder.register(code, description)?;
    }
    Ok(builder.build())
}

/// Role/permission service: admin CRUD over roles plus resolution.
///
/// Role and grant mutations are last-writer-wins; there is no optimistic
/// concurrency control on this path (see DESIGN.md).
pub struct RbacService {
    store: Arc<dyn RoleStore>,
    catalog: Arc<PermissionCatalog>,
    audit: Arc<dyn AuditLog>,
}

impl RbacService {
    pub fn new(
        store: Arc<dyn RoleStore>,
        catalog: Arc<PermissionCatalog>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            store,
            catalog,
            audit,
        }
    }

    pub fn catalog(&self) -> &PermissionCatalog {
        &self.catalog
    }

    pub async fn create_role(
        &self,
        code: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Role> {
        let role = Role::new(code, name, now)?;
        let role = self
            .store
            .insert_role(role)
            .await
            .map_err(|e| e.into_domain("role"))?;
        self.emit_audit(
            "role.created",
            role.id.to_string(),
            serde_json::json!({ "code": role.code }),
            now,
        );
        Ok(role)
    }

    pub async fn get_role(&self, id: RoleId) -> DomainResult<Role> {
        self.store
            .get_role(id)
            .await
            .map_err(|e| e.into_domain("role"))?
            .filter(|role| !role.is_deleted())
            .ok_or_else(|| DomainError::not_found("role"))
    }

    pub async fn list_roles(&self) -> DomainResult<Vec<Role>> {
        Ok(self
            .store
            .list_roles()
            .await
            .map_err(|e| e.into_domain("role"))?
            .into_iter()
            .filter(|role| !role.is_deleted())
            .collect())
    }

    /// Rename / (de)activate a role. Last-writer-wins.
    pub async fn update_role(
        &self,
        id: RoleId,
        name: &str,
        is_active: bool,
        now: DateTime<Utc>,
    ) -> DomainResult<Role> {
        let mut role = self.get_role(id).await?;
        role.name = name.to_string();
        role.is_active = is_active;
        role.updated_at = now;
        let role = self
            .store
            .update_role(role)
            .await
            .map_err(|e| e.into_domain("role"))?;
        self.emit_audit(
            "role.updated",
            role.id.to_string(),
            serde_json::json!({ "name": role.name, "is_active": role.is_active }),
            now,
        );
        Ok(role)
    }

    /// Soft-delete a role. System roles and roles still assigned to users are
    /// protected; both failures are conflicts, not authorization errors.
    pub async fn delete_role(&self, id: RoleId, now: DateTime<Utc>) -> DomainResult<()> {
        let role = self.get_role(id).await?;
        role.ensure_deletable()?;

        let assigned = self
            .store
            .assigned_user_count(id)
            .await
            .map_err(|e| e.into_domain("role"))?;
        if assigned > 0 {
            return Err(DomainError::conflict(format!(
                "role '{}' is assigned to {assigned} user(s)",
                role.code
            )));
        }

        self.store
            .soft_delete_role(id, now)
            .await
            .map_err(|e| e.into_domain("role"))?;
        self.emit_audit(
            "role.deleted",
            id.to_string(),
            serde_json::json!({ "code": role.code }),
            now,
        );
        Ok(())
    }

    /// Grant a direct permission. The code must exist in the catalog.
    pub async fn grant_permission(
        &self,
        role_id: RoleId,
        code: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        let code = PermissionCode::parse(code)?;
        if !self.catalog.contains(&code) {
            return Err(DomainError::not_found(format!(
                "permission '{code}' is not registered"
            )));
        }
        self.get_role(role_id).await?;
        self.store
            .grant_permission(role_id, code.clone())
            .await
            .map_err(|e| e.into_domain("role"))?;
        self.emit_audit(
            "role.permission_granted",
            role_id.to_string(),
            serde_json::json!({ "code": code.as_str() }),
            now,
        );
        Ok(())
    }

    pub async fn revoke_permission(
        &self,
        role_id: RoleId,
        code: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        let code = PermissionCode::parse(code)?;
        self.store
            .revoke_permission(role_id, &code)
            .await
            .map_err(|e| e.into_domain("role"))?;
        self.emit_audit(
            "role.permission_revoked",
            role_id.to_string(),
            serde_json::json!({ "code": code.as_str() }),
            now,
        );
        Ok(())
    }

    /// Attach a wildcard grant to a role. The (role, pattern) pair is unique.
    pub async fn grant_wildcard(
        &self,
        role_id: RoleId,
        pattern: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<WildcardGrant> {
        let pattern = WildcardPattern::parse(pattern)?;
        self.get_role(role_id).await?;

        let granted_by = current_context().and_then(|ctx| ctx.actor_id());
        let grant = WildcardGrant::new(role_id, pattern, description, granted_by, now);
        self.store
            .grant_wildcard(grant.clone())
            .await
            .map_err(|e| e.into_domain("role"))?;
        self.emit_audit(
            "role.wildcard_granted",
            role_id.to_string(),
            serde_json::json!({ "pattern": grant.pattern.to_string() }),
            now,
        );
        Ok(grant)
    }

    pub async fn revoke_wildcard(
        &self,
        role_id: RoleId,
        pattern: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        let pattern = WildcardPattern::parse(pattern)?;
        self.store
            .revoke_wildcard(role_id, &pattern)
            .await
            .map_err(|e| e.into_domain("role"))?;
        self.emit_audit(
            "role.wildcard_revoked",
            role_id.to_string(),
            serde_json::json!({ "pattern": pattern.to_string() }),
            now,
        );
        Ok(())
    }

    pub async fn assign_user(&self, role_id: RoleId, user_id: ActorId) -> DomainResult<()> {
        self.get_role(role_id).await?;
        self.store
            .assign_user(role_id, user_id)
            .await
            .map_err(|e| e.into_domain("role"))
    }

    /// Resolve the role's full effective permission set against the active
    /// catalog, at call time.
    pub async fn resolve_effective_permissions(
        &self,
        role_id: RoleId,
    ) -> DomainResult<EffectivePermissions> {
        let role = self.get_role(role_id).await?;

        let direct = self
            .store
            .direct_permissions(role_id)
            .await
            .map_err(|e| e.into_domain("role"))?;
        // Only codes still active in the catalog count as direct grants.
        let direct: Vec<PermissionCode> = direct
            .into_iter()
            .filter(|code| {
                self.catalog
                    .get(code)
                    .is_some_and(|entry| entry.is_active)
            })
            .collect();

        let grants = self
            .store
            .wildcard_grants(role_id)
            .await
            .map_err(|e| e.into_domain("role"))?;

        Ok(resolve_effective(&role, &direct, &grants, &self.catalog))
    }

    fn emit_audit(
        &self,
        action: &str,
        subject: String,
        detail: serde_json::Value,
        now: DateTime<Utc>,
    ) {
        let actor = current_context().map(|ctx| ctx.actor());
        self.audit
            .record(AuditEvent::new(action, actor, subject, detail, now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::TracingAuditLog;
    use crate::store::InMemoryRoleStore;

    fn catalog() -> Arc<PermissionCatalog> {
        let mut builder = PermissionCatalog::builder();
        for code in [
            "masters.districts.view",
            "masters.posts.edit",
            "roles.view",
            "users.view",
        ] {
            builder.register(code, "").unwrap();
        }
        Arc::new(builder.build())
    }

    fn service() -> RbacService {
        RbacService::new(
            Arc::new(InMemoryRoleStore::new()),
            catalog(),
            Arc::new(TracingAuditLog),
        )
    }

    #[tokio::test]
    async fn deleting_a_system_role_is_a_conflict() {
        let svc = service();
        let role = Role::system("super_admin", "Super administrator", Utc::now()).unwrap();
        let role = svc.store.insert_role(role).await.unwrap();

        let err = svc.delete_role(role.id, Utc::now()).await.unwrap_err();
        assert_eq!(err.kind(), "conflict");
    }

    #[tokio::test]
    async fn deleting_an_unassigned_role_succeeds_and_is_soft() {
        let svc = service();
        let role = svc.create_role("verifier", "Verifier", Utc::now()).await.unwrap();

        svc.delete_role(role.id, Utc::now()).await.unwrap();
        assert_eq!(
            svc.get_role(role.id).await.unwrap_err().kind(),
            "not_found"
        );
        // The row still exists underneath, soft-deleted.
        let raw = svc.store.get_role(role.id).await.unwrap().unwrap();
        assert!(raw.is_deleted());
        assert!(!raw.is_active);
    }

    #[tokio::test]
    async fn deleting_a_role_with_assigned_users_is_a_conflict() {
        let svc = service();
        let role = svc.create_role("verifier", "Verifier", Utc::now()).await.unwrap();
        svc.assign_user(role.id, ActorId::new()).await.unwrap();

        let err = svc.delete_role(role.id, Utc::now()).await.unwrap_err();
        assert_eq!(err.kind(), "conflict");
    }

    #[tokio::test]
    async fn granting_an_unregistered_permission_is_not_found() {
        let svc = service();
        let role = svc.create_role("verifier", "Verifier", Utc::now()).await.unwrap();

        let err = svc
            .grant_permission(role.id, "nowhere.view", Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn effective_permissions_mark_wildcard_derived_codes() {
        let svc = service();
        let role = svc.create_role("masters_admin", "Masters admin", Utc::now()).await.unwrap();
        svc.grant_wildcard(role.id, "masters.*", "All master data", Utc::now())
            .await
            .unwrap();

        let resolved = svc.resolve_effective_permissions(role.id).await.unwrap();
        let codes: Vec<&str> = resolved.effective.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["masters.districts.view", "masters.posts.edit"]);
        assert!(resolved.effective.iter().all(|e| {
            matches!(e.source, applygate_auth::PermissionSource::Wildcard(_))
        }));

        // Idempotent with no intervening mutation.
        let again = svc.resolve_effective_permissions(role.id).await.unwrap();
        assert_eq!(resolved, again);
    }

    #[tokio::test]
    async fn duplicate_wildcard_grant_is_a_conflict() {
        let svc = service();
        let role = svc.create_role("verifier", "Verifier", Utc::now()).await.unwrap();
        svc.grant_wildcard(role.id, "masters.*", "", Utc::now()).await.unwrap();

        let err = svc
            .grant_wildcard(role.id, "masters.*", "", Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "conflict");
    }

    #[tokio::test]
    async fn malformed_wildcard_is_a_validation_error() {
        let svc = service();
        let role = svc.create_role("verifier", "Verifier", Utc::now()).await.unwrap();

        let err = svc
            .grant_wildcard(role.id, "masters.*.view", "", Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }
}
