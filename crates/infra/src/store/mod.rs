//! Storage abstractions.
//!
//! Each store ships in two flavours: an in-memory implementation for tests
//! and development, and a Postgres implementation behind the same trait.
//! Store implementations are the persistence hooks of the audit-attribution
//! contract: immediately before insert/update/soft-delete they read the
//! ambient actor context and stamp attribution fields; absence of a context
//! leaves the fields unset and is never an error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use applygate_applications::{Application, ApplicationStatus, StatusHistoryEntry};
use applygate_auth::{PermissionCode, Role, WildcardGrant, WildcardPattern};
use applygate_core::{ActorId, ApplicationId, DomainError, ExpectedVersion, RoleId};

mod memory;
mod postgres;

pub use memory::{InMemoryApplicationStore, InMemoryRoleStore};
pub use postgres::{PostgresApplicationStore, PostgresRoleStore};

/// Storage-level error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Map to the domain taxonomy at the service boundary. Database detail is
    /// logged here and never surfaced.
    pub fn into_domain(self, what: &str) -> DomainError {
        match self {
            StoreError::NotFound => DomainError::not_found(what),
            StoreError::Conflict(msg) => DomainError::conflict(msg),
            StoreError::Database(source) => {
                tracing::error!(error = %source, what, "storage failure");
                DomainError::Internal
            }
        }
    }
}

/// Role, role–permission and role–wildcard storage.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Insert a new role. Duplicate role codes conflict.
    async fn insert_role(&self, role: Role) -> Result<Role, StoreError>;

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>, StoreError>;

    async fn get_role_by_code(&self, code: &str) -> Result<Option<Role>, StoreError>;

    async fn list_roles(&self) -> Result<Vec<Role>, StoreError>;

    /// Last-writer-wins update of the role row.
    async fn update_role(&self, role: Role) -> Result<Role, StoreError>;

    /// Soft-delete: stamps `deleted_at`/`deleted_by`, clears `is_active`.
    async fn soft_delete_role(&self, id: RoleId, now: DateTime<Utc>) -> Result<(), StoreError>;

    /// Grant a direct permission. Idempotent.
    async fn grant_permission(
        &self,
        role_id: RoleId,
        code: PermissionCode,
    ) -> Result<(), StoreError>;

    async fn revoke_permission(
        &self,
        role_id: RoleId,
        code: &PermissionCode,
    ) -> Result<(), StoreError>;

    /// Direct permission codes joined to the role, sorted.
    async fn direct_permissions(&self, role_id: RoleId) -> Result<Vec<PermissionCode>, StoreError>;

    /// Attach a wildcard grant. The (role, pattern) pair is unique; a
    /// duplicate is a conflict.
    async fn grant_wildcard(&self, grant: WildcardGrant) -> Result<(), StoreError>;

    async fn revoke_wildcard(
        &self,
        role_id: RoleId,
        pattern: &WildcardPattern,
    ) -> Result<(), StoreError>;

    async fn wildcard_grants(&self, role_id: RoleId) -> Result<Vec<WildcardGrant>, StoreError>;

    /// Assign a role to a user (admin account provisioning).
    async fn assign_user(&self, role_id: RoleId, user_id: ActorId) -> Result<(), StoreError>;

    /// How many users currently hold the role.
    async fn assigned_user_count(&self, role_id: RoleId) -> Result<u64, StoreError>;
}

/// Application and status-history storage, with the transactional commit
/// primitive the transition guard relies on.
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// Insert a new application, returning it with attribution stamped.
    async fn insert(&self, application: Application) -> Result<Application, StoreError>;

    async fn get(&self, id: ApplicationId) -> Result<Option<Application>, StoreError>;

    /// Atomically update the status and append one history entry; both
    /// commit together or neither does. `expected` serializes racing
    /// attempts: a stale version is a conflict and nothing is written.
    async fn commit_transition(
        &self,
        id: ApplicationId,
        expected: ExpectedVersion,
        to: ApplicationStatus,
        entry: StatusHistoryEntry,
    ) -> Result<Application, StoreError>;

    /// Append-only status history, oldest first.
    async fn history(&self, id: ApplicationId) -> Result<Vec<StatusHistoryEntry>, StoreError>;
}
