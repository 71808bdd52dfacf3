//! Postgres-backed stores.
//!
//! Queries are plain `sqlx::query` with explicit binds; schema lives in
//! `migrations/`. Transition commits run in a transaction with a row lock on
//! the application, so the status update and the history append are atomic
//! and racing attempts serialize behind the lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use applygate_applications::{Application, ApplicationStatus, StatusHistoryEntry};
use applygate_auth::{
    PermissionCode, Role, WildcardGrant, WildcardPattern, current_context,
};
use applygate_core::{ActorId, ActorKind, ActorRef, ApplicationId, ExpectedVersion, RoleId};

use super::{ApplicationStore, RoleStore, StoreError};

fn ambient_actor_columns() -> (Option<Uuid>, Option<String>) {
    match current_context() {
        Some(ctx) => {
            let actor = ctx.actor();
            (
                actor.id.map(|id| *id.as_uuid()),
                Some(actor.kind.to_string()),
            )
        }
        None => (None, None),
    }
}

fn decode_actor_ref(
    id: Option<Uuid>,
    kind: Option<String>,
) -> Result<Option<ActorRef>, sqlx::Error> {
    match kind {
        None => Ok(None),
        Some(kind) => {
            let kind: ActorKind = kind
                .parse()
                .map_err(|e: applygate_core::DomainError| sqlx::Error::Decode(Box::new(e)))?;
            Ok(Some(ActorRef {
                id: id.map(ActorId::from_uuid),
                kind,
            }))
        }
    }
}

fn map_db_error(err: sqlx::Error, conflict_msg: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(conflict_msg.to_string())
        }
        _ => StoreError::Database(err),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Roles
// ─────────────────────────────────────────────────────────────────────────────

/// Postgres role store.
pub struct PostgresRoleStore {
    pool: PgPool,
}

impl PostgresRoleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn role_from_row(row: &PgRow) -> Result<Role, sqlx::Error> {
    Ok(Role {
        id: RoleId::from_uuid(row.try_get("id")?),
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        is_system: row.try_get("is_system")?,
        is_active: row.try_get("is_active")?,
        deleted_at: row.try_get("deleted_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        created_by: decode_actor_ref(
            row.try_get("created_by_id")?,
            row.try_get("created_by_kind")?,
        )?,
        updated_by: decode_actor_ref(
            row.try_get("updated_by_id")?,
            row.try_get("updated_by_kind")?,
        )?,
        deleted_by: decode_actor_ref(
            row.try_get("deleted_by_id")?,
            row.try_get("deleted_by_kind")?,
        )?,
    })
}

const ROLE_COLUMNS: &str = "id, code, name, is_system, is_active, deleted_at, created_at, \
     updated_at, created_by_id, created_by_kind, updated_by_id, updated_by_kind, \
     deleted_by_id, deleted_by_kind";

#[async_trait]
impl RoleStore for PostgresRoleStore {
    async fn insert_role(&self, mut role: Role) -> Result<Role, StoreError> {
        let (by_id, by_kind) = ambient_actor_columns();
        role.created_by = decode_actor_ref(by_id, by_kind.clone())?;

        sqlx::query(
            "INSERT INTO roles (id, code, name, is_system, is_active, created_at, updated_at, \
             created_by_id, created_by_kind) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(role.id.as_uuid())
        .bind(&role.code)
        .bind(&role.name)
        .bind(role.is_system)
        .bind(role.is_active)
        .bind(role.created_at)
        .bind(role.updated_at)
        .bind(by_id)
        .bind(by_kind)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "role code already exists"))?;

        Ok(role)
    }

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(role_from_row).transpose().map_err(Into::into)
    }

    async fn get_role_by_code(&self, code: &str) -> Result<Option<Role>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE code = $1"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(role_from_row).transpose().map_err(Into::into)
    }

    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {ROLE_COLUMNS} FROM roles ORDER BY code"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(role_from_row)
            .collect::<Result<_, _>>()
            .map_err(Into::into)
    }

    async fn update_role(&self, mut role: Role) -> Result<Role, StoreError> {
        let (by_id, by_kind) = ambient_actor_columns();
        role.updated_by = decode_actor_ref(by_id, by_kind.clone())?;

        let result = sqlx::query(
            "UPDATE roles SET name = $2, is_active = $3, updated_at = $4, \
             updated_by_id = $5, updated_by_kind = $6 WHERE id = $1",
        )
        .bind(role.id.as_uuid())
        .bind(&role.name)
        .bind(role.is_active)
        .bind(role.updated_at)
        .bind(by_id)
        .bind(by_kind)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(role)
    }

    async fn soft_delete_role(&self, id: RoleId, now: DateTime<Utc>) -> Result<(), StoreError> {
        let (by_id, by_kind) = ambient_actor_columns();
        let result = sqlx::query(
            "UPDATE roles SET deleted_at = $2, is_active = FALSE, updated_at = $2, \
             deleted_by_id = $3, deleted_by_kind = $4 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_uuid())
        .bind(now)
        .bind(by_id)
        .bind(by_kind)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn grant_permission(
        &self,
        role_id: RoleId,
        code: PermissionCode,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO role_permissions (role_id, code) VALUES ($1, $2) \
             ON CONFLICT (role_id, code) DO NOTHING",
        )
        .bind(role_id.as_uuid())
        .bind(code.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn revoke_permission(
        &self,
        role_id: RoleId,
        code: &PermissionCode,
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1 AND code = $2")
            .bind(role_id.as_uuid())
            .bind(code.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn direct_permissions(&self, role_id: RoleId) -> Result<Vec<PermissionCode>, StoreError> {
        let rows =
            sqlx::query("SELECT code FROM role_permissions WHERE role_id = $1 ORDER BY code")
                .bind(role_id.as_uuid())
                .fetch_all(&self.pool)
                .await?;
        rows.iter()
            .map(|row| {
                let raw: String = row.try_get("code")?;
                PermissionCode::parse(raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))
            })
            .collect::<Result<_, _>>()
            .map_err(Into::into)
    }

    async fn grant_wildcard(&self, grant: WildcardGrant) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO role_wildcards (role_id, pattern, description, granted_by, granted_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(grant.role_id.as_uuid())
        .bind(grant.pattern.to_string())
        .bind(&grant.description)
        .bind(grant.granted_by.map(|id| *id.as_uuid()))
        .bind(grant.granted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "wildcard already granted to role"))?;
        Ok(())
    }

    async fn revoke_wildcard(
        &self,
        role_id: RoleId,
        pattern: &WildcardPattern,
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM role_wildcards WHERE role_id = $1 AND pattern = $2")
            .bind(role_id.as_uuid())
            .bind(pattern.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn wildcard_grants(&self, role_id: RoleId) -> Result<Vec<WildcardGrant>, StoreError> {
        let rows = sqlx::query(
            "SELECT role_id, pattern, description, granted_by, granted_at \
             FROM role_wildcards WHERE role_id = $1 ORDER BY pattern",
        )
        .bind(role_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let raw: String = row.try_get("pattern")?;
                let pattern = WildcardPattern::parse(&raw)
                    .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
                Ok(WildcardGrant {
                    role_id: RoleId::from_uuid(row.try_get("role_id")?),
                    pattern,
                    description: row.try_get("description")?,
                    granted_by: row
                        .try_get::<Option<Uuid>, _>("granted_by")?
                        .map(ActorId::from_uuid),
                    granted_at: row.try_get("granted_at")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(Into::into)
    }

    async fn assign_user(&self, role_id: RoleId, user_id: ActorId) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO role_assignments (role_id, user_id) VALUES ($1, $2) \
             ON CONFLICT (role_id, user_id) DO NOTHING",
        )
        .bind(role_id.as_uuid())
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn assigned_user_count(&self, role_id: RoleId) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM role_assignments WHERE role_id = $1")
            .bind(role_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        let n: i64 = row.try_get("n")?;
        Ok(n as u64)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Applications
// ─────────────────────────────────────────────────────────────────────────────

/// Postgres application store.
pub struct PostgresApplicationStore {
    pool: PgPool,
}

impl PostgresApplicationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const APPLICATION_COLUMNS: &str = "id, applicant_id, status, version, created_at, updated_at, \
     deleted_at, created_by_id, created_by_kind, updated_by_id, updated_by_kind, \
     deleted_by_id, deleted_by_kind";

fn application_from_row(row: &PgRow) -> Result<Application, sqlx::Error> {
    let status_raw: String = row.try_get("status")?;
    let status: ApplicationStatus = status_raw
        .parse()
        .map_err(|e: applygate_core::DomainError| sqlx::Error::Decode(Box::new(e)))?;
    let version: i64 = row.try_get("version")?;

    Ok(Application {
        id: ApplicationId::from_uuid(row.try_get("id")?),
        applicant_id: ActorId::from_uuid(row.try_get("applicant_id")?),
        status,
        version: version as u64,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
        created_by: decode_actor_ref(
            row.try_get("created_by_id")?,
            row.try_get("created_by_kind")?,
        )?,
        updated_by: decode_actor_ref(
            row.try_get("updated_by_id")?,
            row.try_get("updated_by_kind")?,
        )?,
        deleted_by: decode_actor_ref(
            row.try_get("deleted_by_id")?,
            row.try_get("deleted_by_kind")?,
        )?,
    })
}

#[async_trait]
impl ApplicationStore for PostgresApplicationStore {
    async fn insert(&self, mut application: Application) -> Result<Application, StoreError> {
        let (by_id, by_kind) = ambient_actor_columns();
        application.created_by = decode_actor_ref(by_id, by_kind.clone())?;

        sqlx::query(
            "INSERT INTO applications (id, applicant_id, status, version, created_at, \
             updated_at, created_by_id, created_by_kind) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(application.id.as_uuid())
        .bind(application.applicant_id.as_uuid())
        .bind(application.status.to_string())
        .bind(application.version as i64)
        .bind(application.created_at)
        .bind(application.updated_at)
        .bind(by_id)
        .bind(by_kind)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "application already exists"))?;

        Ok(application)
    }

    async fn get(&self, id: ApplicationId) -> Result<Option<Application>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref()
            .map(application_from_row)
            .transpose()
            .map_err(Into::into)
    }

    async fn commit_transition(
        &self,
        id: ApplicationId,
        expected: ExpectedVersion,
        to: ApplicationStatus,
        entry: StatusHistoryEntry,
    ) -> Result<Application, StoreError> {
        let (by_id, by_kind) = ambient_actor_columns();
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent attempts on the same application.
        let row = sqlx::query("SELECT version FROM applications WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound)?;
        let version: i64 = row.try_get("version")?;
        if !expected.matches(version as u64) {
            return Err(StoreError::Conflict(format!(
                "application version changed (expected {expected:?}, now {version})"
            )));
        }

        sqlx::query(
            "UPDATE applications SET status = $2, version = version + 1, updated_at = $3, \
             updated_by_id = $4, updated_by_kind = $5 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(to.to_string())
        .bind(entry.recorded_at)
        .bind(by_id)
        .bind(by_kind)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO application_status_history \
             (application_id, status, actor_id, actor_kind, recorded_at, note) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(entry.application_id.as_uuid())
        .bind(entry.status.to_string())
        .bind(entry.actor.id.map(|id| *id.as_uuid()))
        .bind(entry.actor.kind.to_string())
        .bind(entry.recorded_at)
        .bind(&entry.note)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_one(&mut *tx)
        .await?;
        let application = application_from_row(&row)?;

        tx.commit().await?;
        Ok(application)
    }

    async fn history(&self, id: ApplicationId) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        let rows = sqlx::query(
            "SELECT application_id, status, actor_id, actor_kind, recorded_at, note \
             FROM application_status_history WHERE application_id = $1 ORDER BY recorded_at, id",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let status_raw: String = row.try_get("status")?;
                let status: ApplicationStatus = status_raw
                    .parse()
                    .map_err(|e: applygate_core::DomainError| sqlx::Error::Decode(Box::new(e)))?;
                let kind_raw: String = row.try_get("actor_kind")?;
                let kind: ActorKind = kind_raw
                    .parse()
                    .map_err(|e: applygate_core::DomainError| sqlx::Error::Decode(Box::new(e)))?;
                Ok(StatusHistoryEntry {
                    application_id: ApplicationId::from_uuid(row.try_get("application_id")?),
                    status,
                    actor: ActorRef {
                        id: row
                            .try_get::<Option<Uuid>, _>("actor_id")?
                            .map(ActorId::from_uuid),
                        kind,
                    },
                    recorded_at: row.try_get("recorded_at")?,
                    note: row.try_get("note")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(Into::into)
    }
}
