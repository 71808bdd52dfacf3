//! Application wiring: stores, services, router.

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use sqlx::PgPool;

use applygate_auth::TokenVerifier;
use applygate_infra::{
    ApplicationStore, InMemoryApplicationStore, InMemoryRoleStore, LifecycleService,
    PostgresApplicationStore, PostgresRoleStore, RbacService, RoleStore, TracingAuditLog,
    default_permission_catalog,
};

use crate::middleware::{self, AuthState};
use crate::routes;
use crate::token::Hs256TokenVerifier;

/// Services shared by all handlers.
pub struct AppServices {
    pub rbac: RbacService,
    pub lifecycle: LifecycleService,
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Stores are Postgres when `DATABASE_URL` is set, in-memory otherwise.
pub async fn build_app(jwt_secret: String) -> anyhow::Result<Router> {
    let (role_store, application_store): (Arc<dyn RoleStore>, Arc<dyn ApplicationStore>) =
        match std::env::var("DATABASE_URL") {
            Ok(url) => {
                let pool = PgPool::connect(&url).await?;
                (
                    Arc::new(PostgresRoleStore::new(pool.clone())),
                    Arc::new(PostgresApplicationStore::new(pool)),
                )
            }
            Err(_) => {
                tracing::warn!("DATABASE_URL not set; using in-memory stores");
                (
                    Arc::new(InMemoryRoleStore::new()),
                    Arc::new(InMemoryApplicationStore::new()),
                )
            }
        };

    let audit = Arc::new(TracingAuditLog);
    let catalog = Arc::new(default_permission_catalog()?);
    let services = Arc::new(AppServices {
        rbac: RbacService::new(role_store, catalog, audit.clone()),
        lifecycle: LifecycleService::new(application_store, audit),
    });

    let verifier: Arc<dyn TokenVerifier> =
        Arc::new(Hs256TokenVerifier::new(jwt_secret.as_bytes()));
    Ok(build_router(services, verifier))
}

/// Router assembly, separated so tests can inject their own services.
pub fn build_router(services: Arc<AppServices>, verifier: Arc<dyn TokenVerifier>) -> Router {
    let auth_state = AuthState { verifier };

    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    // Public routes run under the system context: anything they persist is
    // attributed to `system`.
    let public = Router::new()
        .route("/health", get(routes::system::health))
        .route_layer(axum::middleware::from_fn(
            middleware::system_context_middleware,
        ));

    public.merge(protected)
}
