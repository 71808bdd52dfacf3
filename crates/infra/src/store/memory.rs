//! In-memory stores for tests and development.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use applygate_applications::{Application, ApplicationStatus, StatusHistoryEntry};
use applygate_auth::{PermissionCode, Role, WildcardGrant, WildcardPattern, current_context};
use applygate_core::{ActorId, ActorRef, ApplicationId, ExpectedVersion, RoleId};

use super::{ApplicationStore, RoleStore, StoreError};

fn ambient_actor() -> Option<ActorRef> {
    current_context().map(|ctx| ctx.actor())
}

// ─────────────────────────────────────────────────────────────────────────────
// Roles
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct RoleState {
    roles: HashMap<RoleId, Role>,
    direct: HashMap<RoleId, BTreeSet<PermissionCode>>,
    wildcards: HashMap<RoleId, Vec<WildcardGrant>>,
    assignments: HashMap<RoleId, HashSet<ActorId>>,
}

/// In-memory role store.
#[derive(Debug, Default)]
pub struct InMemoryRoleStore {
    inner: RwLock<RoleState>,
}

impl InMemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn insert_role(&self, mut role: Role) -> Result<Role, StoreError> {
        let mut inner = self.inner.write().unwrap();
        if inner.roles.values().any(|r| r.code == role.code) {
            return Err(StoreError::Conflict(format!(
                "role code '{}' already exists",
                role.code
            )));
        }
        role.created_by = ambient_actor();
        inner.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>, StoreError> {
        Ok(self.inner.read().unwrap().roles.get(&id).cloned())
    }

    async fn get_role_by_code(&self, code: &str) -> Result<Option<Role>, StoreError> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .roles
            .values()
            .find(|r| r.code == code)
            .cloned())
    }

    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        let mut roles: Vec<Role> = self.inner.read().unwrap().roles.values().cloned().collect();
        roles.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(roles)
    }

    async fn update_role(&self, mut role: Role) -> Result<Role, StoreError> {
        let mut inner = self.inner.write().unwrap();
        if !inner.roles.contains_key(&role.id) {
            return Err(StoreError::NotFound);
        }
        role.updated_by = ambient_actor();
        inner.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn soft_delete_role(&self, id: RoleId, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        let role = inner.roles.get_mut(&id).ok_or(StoreError::NotFound)?;
        role.deleted_at = Some(now);
        role.is_active = false;
        role.updated_at = now;
        role.deleted_by = ambient_actor();
        Ok(())
    }

    async fn grant_permission(
        &self,
        role_id: RoleId,
        code: PermissionCode,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        if !inner.roles.contains_key(&role_id) {
            return Err(StoreError::NotFound);
        }
        inner.direct.entry(role_id).or_default().insert(code);
        Ok(())
    }

    async fn revoke_permission(
        &self,
        role_id: RoleId,
        code: &PermissionCode,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        if let Some(codes) = inner.direct.get_mut(&role_id) {
            codes.remove(code);
        }
        Ok(())
    }

    async fn direct_permissions(&self, role_id: RoleId) -> Result<Vec<PermissionCode>, StoreError> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .direct
            .get(&role_id)
            .map(|codes| codes.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn grant_wildcard(&self, grant: WildcardGrant) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        if !inner.roles.contains_key(&grant.role_id) {
            return Err(StoreError::NotFound);
        }
        let grants = inner.wildcards.entry(grant.role_id).or_default();
        if grants.iter().any(|g| g.pattern == grant.pattern) {
            return Err(StoreError::Conflict(format!(
                "wildcard '{}' already granted to role",
                grant.pattern
            )));
        }
        grants.push(grant);
        Ok(())
    }

    async fn revoke_wildcard(
        &self,
        role_id: RoleId,
        pattern: &WildcardPattern,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        if let Some(grants) = inner.wildcards.get_mut(&role_id) {
            grants.retain(|g| &g.pattern != pattern);
        }
        Ok(())
    }

    async fn wildcard_grants(&self, role_id: RoleId) -> Result<Vec<WildcardGrant>, StoreError> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .wildcards
            .get(&role_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn assign_user(&self, role_id: RoleId, user_id: ActorId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        if !inner.roles.contains_key(&role_id) {
            return Err(StoreError::NotFound);
        }
        inner.assignments.entry(role_id).or_default().insert(user_id);
        Ok(())
    }

    async fn assigned_user_count(&self, role_id: RoleId) -> Result<u64, StoreError> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .assignments
            .get(&role_id)
            .map(|users| users.len() as u64)
            .unwrap_or(0))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Applications
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ApplicationState {
    applications: HashMap<ApplicationId, Application>,
    history: HashMap<ApplicationId, Vec<StatusHistoryEntry>>,
}

/// In-memory application store.
///
/// A single lock guards both maps, so the status update and the history
/// append commit together; the version check under that lock serializes
/// racing transition attempts.
#[derive(Debug, Default)]
pub struct InMemoryApplicationStore {
    inner: RwLock<ApplicationState>,
}

impl InMemoryApplicationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApplicationStore for InMemoryApplicationStore {
    async fn insert(&self, mut application: Application) -> Result<Application, StoreError> {
        let mut inner = self.inner.write().unwrap();
        if inner.applications.contains_key(&application.id) {
            return Err(StoreError::Conflict("application already exists".into()));
        }
        application.created_by = ambient_actor();
        inner
            .applications
            .insert(application.id, application.clone());
        Ok(application)
    }

    async fn get(&self, id: ApplicationId) -> Result<Option<Application>, StoreError> {
        Ok(self.inner.read().unwrap().applications.get(&id).cloned())
    }

    async fn commit_transition(
        &self,
        id: ApplicationId,
        expected: ExpectedVersion,
        to: ApplicationStatus,
        entry: StatusHistoryEntry,
    ) -> Result<Application, StoreError> {
        let mut inner = self.inner.write().unwrap();
        let application = inner.applications.get_mut(&id).ok_or(StoreError::NotFound)?;
        if !expected.matches(application.version) {
            return Err(StoreError::Conflict(format!(
                "application version changed (expected {expected:?}, now {})",
                application.version
            )));
        }
        application.status = to;
        application.version += 1;
        application.updated_at = entry.recorded_at;
        application.updated_by = ambient_actor();
        let updated = application.clone();
        inner.history.entry(id).or_default().push(entry);
        Ok(updated)
    }

    async fn history(&self, id: ApplicationId) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .history
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use applygate_auth::{ActorContext, run_with_context};
    use applygate_core::ActorKind;

    fn draft() -> Application {
        Application::new(ApplicationId::new(), ActorId::new(), Utc::now())
    }

    fn entry(app: &Application, status: ApplicationStatus) -> StatusHistoryEntry {
        StatusHistoryEntry {
            application_id: app.id,
            status,
            actor: ActorRef::system(),
            recorded_at: Utc::now(),
            note: None,
        }
    }

    #[tokio::test]
    async fn commit_updates_status_and_appends_history_together() {
        let store = InMemoryApplicationStore::new();
        let app = store.insert(draft()).await.unwrap();

        let updated = store
            .commit_transition(
                app.id,
                ExpectedVersion::Exact(app.version),
                ApplicationStatus::Submitted,
                entry(&app, ApplicationStatus::Submitted),
            )
            .await
            .unwrap();

        assert_eq!(updated.status, ApplicationStatus::Submitted);
        assert_eq!(updated.version, app.version + 1);
        let history = store.history(app.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, ApplicationStatus::Submitted);
    }

    #[tokio::test]
    async fn stale_version_conflicts_and_writes_nothing() {
        let store = InMemoryApplicationStore::new();
        let app = store.insert(draft()).await.unwrap();

        store
            .commit_transition(
                app.id,
                ExpectedVersion::Exact(app.version),
                ApplicationStatus::Submitted,
                entry(&app, ApplicationStatus::Submitted),
            )
            .await
            .unwrap();

        let err = store
            .commit_transition(
                app.id,
                ExpectedVersion::Exact(app.version),
                ApplicationStatus::Withdrawn,
                entry(&app, ApplicationStatus::Withdrawn),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let current = store.get(app.id).await.unwrap().unwrap();
        assert_eq!(current.status, ApplicationStatus::Submitted);
        assert_eq!(store.history(app.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn attribution_is_stamped_from_the_ambient_context() {
        let store = InMemoryApplicationStore::new();
        let admin = ActorId::new();

        let app = run_with_context(
            ActorContext::authenticated(admin, ActorKind::Admin),
            store.insert(draft()),
        )
        .await
        .unwrap();

        assert_eq!(app.created_by, Some(ActorRef::new(admin, ActorKind::Admin)));
    }

    #[tokio::test]
    async fn missing_context_leaves_attribution_unset() {
        let store = InMemoryApplicationStore::new();
        let app = store.insert(draft()).await.unwrap();
        assert_eq!(app.created_by, None);
    }

    #[tokio::test]
    async fn duplicate_role_code_conflicts() {
        let store = InMemoryRoleStore::new();
        let role = Role::new("verifier", "Verifier", Utc::now()).unwrap();
        store.insert_role(role).await.unwrap();

        let twin = Role::new("verifier", "Verifier again", Utc::now()).unwrap();
        let err = store.insert_role(twin).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn duplicate_wildcard_pair_conflicts() {
        let store = InMemoryRoleStore::new();
        let role = store
            .insert_role(Role::new("verifier", "Verifier", Utc::now()).unwrap())
            .await
            .unwrap();

        let grant = WildcardGrant::new(
            role.id,
            WildcardPattern::parse("masters.*").unwrap(),
            "All master data",
            None,
            Utc::now(),
        );
        store.grant_wildcard(grant.clone()).await.unwrap();
        let err = store.grant_wildcard(grant).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
