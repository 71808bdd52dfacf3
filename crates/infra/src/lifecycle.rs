//! Application lifecycle service: guarded, atomic status transitions.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use applygate_applications::{
    Application, ApplicationStatus, StatusHistoryEntry, authorize_transition,
};
use applygate_auth::Actor;
use applygate_core::{ActorId, ApplicationId, DomainError, DomainResult, ExpectedVersion};

use crate::audit::{AuditEvent, AuditLog};
use crate::store::ApplicationStore;

/// Orchestrates status transitions: fetch, guard, commit, audit.
pub struct LifecycleService {
    store: Arc<dyn ApplicationStore>,
    audit: Arc<dyn AuditLog>,
}

impl LifecycleService {
    pub fn new(store: Arc<dyn ApplicationStore>, audit: Arc<dyn AuditLog>) -> Self {
        Self { store, audit }
    }

    /// Create a new application in `Draft` for the given applicant.
    pub async fn create_application(
        &self,
        applicant_id: ActorId,
        now: DateTime<Utc>,
    ) -> DomainResult<Application> {
        let application = Application::new(ApplicationId::new(), applicant_id, now);
        self.store
            .insert(application)
            .await
            .map_err(|e| e.into_domain("application"))
    }

    pub async fn get(&self, id: ApplicationId) -> DomainResult<Application> {
        self.store
            .get(id)
            .await
            .map_err(|e| e.into_domain("application"))?
            .ok_or_else(|| DomainError::not_found("application"))
    }

    pub async fn history(&self, id: ApplicationId) -> DomainResult<Vec<StatusHistoryEntry>> {
        self.store
            .history(id)
            .await
            .map_err(|e| e.into_domain("application"))
    }

    /// Apply one status transition on the current state of the application.
    pub async fn apply_transition(
        &self,
        id: ApplicationId,
        to: ApplicationStatus,
        actor: &Actor,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Application> {
        let application = self.get(id).await?;
        self.apply_transition_from(&application, to, actor, note, now)
            .await
    }

    /// Apply one status transition against an already-fetched snapshot.
    ///
    /// The snapshot's version rides along to the commit, so two racing
    /// attempts over the same snapshot serialize in the store: exactly one
    /// commits, the other observes a conflict and nothing of it is written.
    pub async fn apply_transition_from(
        &self,
        application: &Application,
        to: ApplicationStatus,
        actor: &Actor,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Application> {
        authorize_transition(application.status, to, actor, application.applicant_id)?;

        let entry = StatusHistoryEntry {
            application_id: application.id,
            status: to,
            actor: actor.actor_ref(),
            recorded_at: now,
            note,
        };
        let updated = self
            .store
            .commit_transition(
                application.id,
                ExpectedVersion::Exact(application.version),
                to,
                entry,
            )
            .await
            .map_err(|e| e.into_domain("application"))?;

        tracing::info!(
            application = %updated.id,
            from = %application.status,
            to = %updated.status,
            actor = %actor.actor_ref(),
            "application status changed"
        );
        self.audit.record(AuditEvent::new(
            "application.status_changed",
            Some(actor.actor_ref()),
            updated.id.to_string(),
            serde_json::json!({
                "from": application.status.to_string(),
                "to": updated.status.to_string(),
            }),
            now,
        ));

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::TracingAuditLog;
    use crate::store::InMemoryApplicationStore;
    use applygate_auth::GrantedSet;
    use applygate_core::ActorKind;

    fn service() -> LifecycleService {
        LifecycleService::new(
            Arc::new(InMemoryApplicationStore::new()),
            Arc::new(TracingAuditLog),
        )
    }

    fn service_with_audit(audit: Arc<dyn AuditLog>) -> LifecycleService {
        LifecycleService::new(Arc::new(InMemoryApplicationStore::new()), audit)
    }

    fn admin_with(grants: &[&str]) -> Actor {
        Actor::admin(ActorId::new(), "verifier", GrantedSet::parse(grants).unwrap())
    }

    async fn eligible_application(svc: &LifecycleService) -> (Application, Actor) {
        let applicant_id = ActorId::new();
        let owner = Actor::applicant(applicant_id);
        let app = svc.create_application(applicant_id, Utc::now()).await.unwrap();
        let app = svc
            .apply_transition(app.id, ApplicationStatus::Submitted, &owner, None, Utc::now())
            .await
            .unwrap();
        let verifier = admin_with(&["applications.verify"]);
        let app = svc
            .apply_transition(app.id, ApplicationStatus::Eligible, &verifier, None, Utc::now())
            .await
            .unwrap();
        (app, owner)
    }

    #[tokio::test]
    async fn full_lifecycle_appends_one_history_entry_per_transition() {
        let svc = service();
        let (app, _) = eligible_application(&svc).await;

        let selector = admin_with(&["applications.select"]);
        let app = svc
            .apply_transition(
                app.id,
                ApplicationStatus::ProvisionalSelected,
                &selector,
                Some("shortlisted".to_string()),
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(app.status, ApplicationStatus::ProvisionalSelected);
        assert_eq!(app.version, 4);

        let history = svc.history(app.id).await.unwrap();
        let statuses: Vec<ApplicationStatus> = history.iter().map(|h| h.status).collect();
        assert_eq!(
            statuses,
            vec![
                ApplicationStatus::Submitted,
                ApplicationStatus::Eligible,
                ApplicationStatus::ProvisionalSelected,
            ]
        );
        assert_eq!(history[2].note.as_deref(), Some("shortlisted"));
        assert_eq!(history[2].actor.kind, ActorKind::Admin);
    }

    #[tokio::test]
    async fn terminal_status_admits_no_further_transitions() {
        let svc = service();
        let (app, owner) = eligible_application(&svc).await;

        let app = svc
            .apply_transition(app.id, ApplicationStatus::Withdrawn, &owner, None, Utc::now())
            .await
            .unwrap();

        let err = svc
            .apply_transition(app.id, ApplicationStatus::Eligible, &Actor::system(), None, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_transition");
    }

    #[tokio::test]
    async fn racing_transitions_from_the_same_snapshot_yield_one_success() {
        let svc = service();
        let (app, _) = eligible_application(&svc).await;

        let selector = admin_with(&["applications.select"]);
        let (selected, rejected) = tokio::join!(
            svc.apply_transition_from(
                &app,
                ApplicationStatus::ProvisionalSelected,
                &selector,
                None,
                Utc::now(),
            ),
            svc.apply_transition_from(
                &app,
                ApplicationStatus::Rejected,
                &selector,
                None,
                Utc::now(),
            ),
        );

        let outcomes = [selected, rejected];
        let successes = outcomes.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        let failure = outcomes.iter().find(|r| r.is_err()).unwrap();
        assert_eq!(failure.as_ref().unwrap_err().kind(), "conflict");

        // No inconsistent intermediate state: one transition, one entry.
        let current = svc.get(app.id).await.unwrap();
        assert_eq!(current.version, app.version + 1);
        assert_eq!(svc.history(app.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn hold_and_release_cycle() {
        let svc = service();
        let (app, _) = eligible_application(&svc).await;

        let holder = admin_with(&["applications.hold"]);
        let app = svc
            .apply_transition(app.id, ApplicationStatus::OnHold, &holder, None, Utc::now())
            .await
            .unwrap();
        let app = svc
            .apply_transition(app.id, ApplicationStatus::Eligible, &holder, None, Utc::now())
            .await
            .unwrap();
        assert_eq!(app.status, ApplicationStatus::Eligible);
    }

    #[tokio::test]
    async fn unauthorized_actor_does_not_reach_the_store() {
        let svc = service();
        let (app, _) = eligible_application(&svc).await;

        let clerk = admin_with(&["applications.view"]);
        let err = svc
            .apply_transition(app.id, ApplicationStatus::Rejected, &clerk, None, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "forbidden");

        let current = svc.get(app.id).await.unwrap();
        assert_eq!(current.status, ApplicationStatus::Eligible);
        assert_eq!(current.version, app.version);
    }

    #[tokio::test]
    async fn audit_sink_failure_never_blocks_the_transition() {
        struct FailingSink;
        impl AuditLog for FailingSink {
            fn try_record(&self, _event: &AuditEvent) -> anyhow::Result<()> {
                anyhow::bail!("audit store down")
            }
        }

        let svc = service_with_audit(Arc::new(FailingSink));
        let applicant_id = ActorId::new();
        let owner = Actor::applicant(applicant_id);
        let app = svc.create_application(applicant_id, Utc::now()).await.unwrap();

        let app = svc
            .apply_transition(app.id, ApplicationStatus::Submitted, &owner, None, Utc::now())
            .await
            .unwrap();
        assert_eq!(app.status, ApplicationStatus::Submitted);
        assert_eq!(svc.history(app.id).await.unwrap().len(), 1);
    }
}
