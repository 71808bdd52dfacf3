//! HTTP routes, one file per domain area.

use axum::Router;

pub mod applications;
pub mod roles;
pub mod system;

/// All protected routes (auth middleware is layered on by the app wiring).
pub fn router() -> Router {
    Router::new()
        .merge(roles::router())
        .merge(applications::router())
}
