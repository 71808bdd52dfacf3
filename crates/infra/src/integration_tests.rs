//! Cross-service integration tests over the in-memory stores.

use std::sync::Arc;

use chrono::Utc;

use applygate_applications::ApplicationStatus;
use applygate_auth::{
    Actor, ActorContext, AuthClaims, GrantedSet, PermissionRequirement, PermissionSource,
    authorize, run_with_context, validate_claims,
};
use applygate_core::{ActorId, ActorKind};

use crate::audit::TracingAuditLog;
use crate::lifecycle::LifecycleService;
use crate::rbac::{RbacService, default_permission_catalog};
use crate::store::{InMemoryApplicationStore, InMemoryRoleStore};

fn rbac() -> RbacService {
    RbacService::new(
        Arc::new(InMemoryRoleStore::new()),
        Arc::new(default_permission_catalog().unwrap()),
        Arc::new(TracingAuditLog),
    )
}

fn lifecycle() -> LifecycleService {
    LifecycleService::new(
        Arc::new(InMemoryApplicationStore::new()),
        Arc::new(TracingAuditLog),
    )
}

#[tokio::test]
async fn wildcard_role_resolves_and_authorizes_end_to_end() {
    let rbac = rbac();
    let role = rbac
        .create_role("masters_admin", "Masters administrator", Utc::now())
        .await
        .unwrap();
    rbac.grant_wildcard(role.id, "masters.*", "All master data", Utc::now())
        .await
        .unwrap();

    // Resolution materializes the wildcard against the live catalog.
    let resolved = rbac.resolve_effective_permissions(role.id).await.unwrap();
    let masters: Vec<&str> = resolved
        .effective
        .iter()
        .filter(|e| e.code.module() == "masters")
        .map(|e| e.code.as_str())
        .collect();
    assert_eq!(
        masters,
        vec![
            "masters.districts.edit",
            "masters.districts.view",
            "masters.posts.edit",
            "masters.posts.view",
        ]
    );
    assert!(
        resolved
            .effective
            .iter()
            .all(|e| matches!(e.source, PermissionSource::Wildcard(_)))
    );

    // The same grants, carried in a token, pass the gate.
    let actor = Actor::admin(
        ActorId::new(),
        role.code.clone(),
        GrantedSet::parse(["masters.*"]).unwrap(),
    );
    authorize(
        &actor,
        &PermissionRequirement::parse_all(&["masters.districts.view"]).unwrap(),
    )
    .unwrap();
    let err = authorize(
        &actor,
        &PermissionRequirement::parse_all(&["roles.view"]).unwrap(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), "forbidden");
}

#[tokio::test]
async fn claims_to_actor_to_guarded_transition_with_attribution() {
    let lifecycle = lifecycle();
    let now = Utc::now();

    // Applicant request: create + submit under the applicant's context.
    let applicant_id = ActorId::new();
    let applicant = Actor::applicant(applicant_id);
    let app = run_with_context(ActorContext::for_actor(&applicant), async {
        let app = lifecycle.create_application(applicant_id, now).await?;
        lifecycle
            .apply_transition(app.id, ApplicationStatus::Submitted, &applicant, None, now)
            .await
    })
    .await
    .unwrap();
    assert_eq!(
        app.created_by.and_then(|a| a.id),
        Some(applicant_id),
        "insert hook stamps the applicant"
    );
    assert_eq!(app.updated_by.map(|a| a.kind), Some(ActorKind::Applicant));

    // Admin request: verified claims become the actor; the verify edge is
    // taken under the admin's context and the update hook stamps it.
    let admin_id = ActorId::new();
    let claims = AuthClaims {
        sub: admin_id,
        kind: ActorKind::Admin,
        role: Some("verifier".to_string()),
        permissions: vec!["applications.verify".to_string()],
        issued_at: now - chrono::Duration::minutes(1),
        expires_at: now + chrono::Duration::minutes(30),
    };
    validate_claims(&claims, now).unwrap();
    let admin = claims.into_actor().unwrap();

    let app = run_with_context(ActorContext::for_actor(&admin), async {
        lifecycle
            .apply_transition(app.id, ApplicationStatus::Eligible, &admin, None, now)
            .await
    })
    .await
    .unwrap();

    assert_eq!(app.status, ApplicationStatus::Eligible);
    assert_eq!(app.updated_by.and_then(|a| a.id), Some(admin_id));
    assert_eq!(app.updated_by.map(|a| a.kind), Some(ActorKind::Admin));

    let history = lifecycle.history(app.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].actor.id, Some(admin_id));
}

#[tokio::test]
async fn system_context_attributes_unauthenticated_work() {
    let lifecycle = lifecycle();
    let applicant_id = ActorId::new();

    let app = run_with_context(ActorContext::system(), async {
        lifecycle.create_application(applicant_id, Utc::now()).await
    })
    .await
    .unwrap();

    let created_by = app.created_by.unwrap();
    assert_eq!(created_by.kind, ActorKind::System);
    assert_eq!(created_by.id, None);
}
