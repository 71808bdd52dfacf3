//! Role administration endpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use chrono::Utc;
use serde::Deserialize;

use applygate_auth::Actor;
use applygate_core::RoleId;

use crate::app::AppServices;
use crate::authz;
use crate::errors;

pub fn router() -> Router {
    Router::new()
        .route("/roles", get(list_roles).post(create_role))
        .route("/roles/:id", delete(delete_role))
        .route("/roles/:id/permissions", post(grant_permission))
        .route("/roles/:id/wildcards", post(grant_wildcard))
        .route("/roles/:id/effective-permissions", get(effective_permissions))
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct GrantPermissionRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct GrantWildcardRequest {
    pub pattern: String,
    #[serde(default)]
    pub description: String,
}

/// GET /roles
pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&actor, &authz::ROLES_VIEW) {
        return resp;
    }
    match services.rbac.list_roles().await {
        Ok(roles) => (StatusCode::OK, Json(serde_json::json!({ "roles": roles }))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// POST /roles
pub async fn create_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<CreateRoleRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&actor, &authz::ROLES_CREATE) {
        return resp;
    }
    match services.rbac.create_role(&body.code, &body.name, Utc::now()).await {
        Ok(role) => (StatusCode::CREATED, Json(serde_json::json!({ "role": role }))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// DELETE /roles/:id
pub async fn delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<RoleId>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&actor, &authz::ROLES_DELETE) {
        return resp;
    }
    match services.rbac.delete_role(id, Utc::now()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// POST /roles/:id/permissions
pub async fn grant_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<RoleId>,
    Json(body): Json<GrantPermissionRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&actor, &authz::ROLES_EDIT) {
        return resp;
    }
    match services.rbac.grant_permission(id, &body.code, Utc::now()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// POST /roles/:id/wildcards
pub async fn grant_wildcard(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<RoleId>,
    Json(body): Json<GrantWildcardRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&actor, &authz::ROLES_EDIT) {
        return resp;
    }
    match services
        .rbac
        .grant_wildcard(id, &body.pattern, &body.description, Utc::now())
        .await
    {
        Ok(grant) => {
            (StatusCode::CREATED, Json(serde_json::json!({ "grant": grant }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// GET /roles/:id/effective-permissions
pub async fn effective_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<RoleId>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&actor, &authz::ROLES_VIEW) {
        return resp;
    }
    match services.rbac.resolve_effective_permissions(id).await {
        Ok(effective) => {
            (StatusCode::OK, Json(serde_json::json!({ "effective": effective }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}
