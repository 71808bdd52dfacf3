//! Request authentication and actor-context establishment.
//!
//! The middleware is where the actor context comes alive: the request's whole
//! downstream future runs inside `run_with_context`, so every handler, service
//! and persistence hook reached while servicing the request sees the same
//! actor, and nothing outside the request ever does.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use applygate_auth::{ActorContext, TokenVerifier, run_with_context};

#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<dyn TokenVerifier>,
}

/// Protected routes: a valid bearer token is mandatory.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_bearer(req.headers())?;

    let claims = state
        .verifier
        .verify(token, Utc::now())
        .map_err(|_e| StatusCode::UNAUTHORIZED)?;
    let actor = claims.into_actor().map_err(|_e| StatusCode::UNAUTHORIZED)?;

    let context = ActorContext::for_actor(&actor);
    req.extensions_mut().insert(actor);

    Ok(run_with_context(context, next.run(req)).await)
}

/// Unauthenticated routes that still mutate state run under the system
/// context, so attribution fields are stamped as `system`.
pub async fn system_context_middleware(
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    run_with_context(ActorContext::system(), next.run(req)).await
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?
        .trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}
