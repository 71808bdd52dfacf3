//! Application lifecycle endpoints.
//!
//! Applicant-facing actions (submit, withdraw) are separate routes from the
//! admin transition endpoint; every route ends up in the same guard, which
//! enforces per-edge authority regardless of how the request came in.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;

use applygate_applications::ApplicationStatus;
use applygate_auth::Actor;
use applygate_core::{ActorId, ApplicationId};

use crate::app::AppServices;
use crate::authz;
use crate::errors;

pub fn router() -> Router {
    Router::new()
        .route("/applications", post(create_application))
        .route("/applications/:id", get(get_application))
        .route("/applications/:id/history", get(get_history))
        .route("/applications/:id/submit", post(submit))
        .route("/applications/:id/withdraw", post(withdraw))
        .route("/applications/:id/status", post(change_status))
}

#[derive(Debug, Deserialize)]
pub struct CreateApplicationRequest {
    /// Only honoured for the system actor; applicants always create their own.
    pub applicant_id: Option<ActorId>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub to: ApplicationStatus,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionNote {
    #[serde(default)]
    pub note: Option<String>,
}

/// POST /applications
pub async fn create_application(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<CreateApplicationRequest>,
) -> axum::response::Response {
    let applicant_id = match (&actor, body.applicant_id) {
        (Actor::Applicant { id }, _) => *id,
        (Actor::System, Some(id)) => id,
        _ => {
            return errors::json_error(
                StatusCode::FORBIDDEN,
                "forbidden",
                "only applicants may open applications",
            );
        }
    };
    match services
        .lifecycle
        .create_application(applicant_id, Utc::now())
        .await
    {
        Ok(app) => {
            (StatusCode::CREATED, Json(serde_json::json!({ "application": app }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// GET /applications/:id - the owning applicant, or an admin with view rights.
pub async fn get_application(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<ApplicationId>,
) -> axum::response::Response {
    let app = match services.lifecycle.get(id).await {
        Ok(app) => app,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let owns = matches!(&actor, Actor::Applicant { id } if app.is_owned_by(*id));
    if !owns {
        if let Err(resp) = authz::require(&actor, &authz::APPLICATIONS_VIEW) {
            return resp;
        }
    }
    (StatusCode::OK, Json(serde_json::json!({ "application": app }))).into_response()
}

/// GET /applications/:id/history
pub async fn get_history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<ApplicationId>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&actor, &authz::APPLICATIONS_VIEW) {
        return resp;
    }
    match services.lifecycle.history(id).await {
        Ok(history) => {
            (StatusCode::OK, Json(serde_json::json!({ "history": history }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// POST /applications/:id/submit - applicant submits their own application.
pub async fn submit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<ApplicationId>,
    Json(body): Json<TransitionNote>,
) -> axum::response::Response {
    transition(&services, &actor, id, ApplicationStatus::Submitted, body.note).await
}

/// POST /applications/:id/withdraw - applicant withdraws their application.
pub async fn withdraw(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<ApplicationId>,
    Json(body): Json<TransitionNote>,
) -> axum::response::Response {
    transition(&services, &actor, id, ApplicationStatus::Withdrawn, body.note).await
}

/// POST /applications/:id/status - administrative transitions.
pub async fn change_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<ApplicationId>,
    Json(body): Json<ChangeStatusRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&actor, &authz::APPLICATIONS_TRANSITION) {
        return resp;
    }
    transition(&services, &actor, id, body.to, body.note).await
}

async fn transition(
    services: &AppServices,
    actor: &Actor,
    id: ApplicationId,
    to: ApplicationStatus,
    note: Option<String>,
) -> axum::response::Response {
    match services
        .lifecycle
        .apply_transition(id, to, actor, note, Utc::now())
        .await
    {
        Ok(app) => {
            (StatusCode::OK, Json(serde_json::json!({ "application": app }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}
