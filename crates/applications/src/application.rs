//! Application record and status history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use applygate_auth::Actor;
use applygate_core::{ActorId, ActorRef, ApplicationId, DomainError, DomainResult};

use crate::status::{ApplicationStatus, is_locked};

/// An application record.
///
/// Attribution fields (`created_by`, `updated_by`, `deleted_by`) are stamped
/// by the persistence layer from the ambient actor context; when no context
/// is established they stay unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub applicant_id: ActorId,
    pub status: ApplicationStatus,
    /// Monotonic version, bumped on every committed mutation. Used to
    /// serialize racing status transitions.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_by: Option<ActorRef>,
    pub updated_by: Option<ActorRef>,
    pub deleted_by: Option<ActorRef>,
}

impl Application {
    /// New application in the initial `Draft` status.
    pub fn new(id: ApplicationId, applicant_id: ActorId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            applicant_id,
            status: ApplicationStatus::Draft,
            version: 1,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            created_by: None,
            updated_by: None,
            deleted_by: None,
        }
    }

    pub fn is_owned_by(&self, actor_id: ActorId) -> bool {
        self.applicant_id == actor_id
    }

    /// Applicant-side edit guard: the owning applicant may edit only while
    /// the status is unlocked. Administrators are gated elsewhere.
    pub fn ensure_editable_by(&self, actor: &Actor) -> DomainResult<()> {
        match actor {
            Actor::Applicant { id } if !self.is_owned_by(*id) => Err(DomainError::forbidden(
                "application belongs to a different applicant",
            )),
            Actor::Applicant { .. } if is_locked(self.status) => {
                Err(DomainError::forbidden(format!(
                    "application is locked in status '{}'",
                    self.status
                )))
            }
            _ => Ok(()),
        }
    }
}

/// One immutable status-history entry; appended on every transition, never
/// mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub application_id: ApplicationId,
    pub status: ApplicationStatus,
    pub actor: ActorRef,
    pub recorded_at: DateTime<Utc>,
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> Application {
        Application::new(ApplicationId::new(), ActorId::new(), Utc::now())
    }

    #[test]
    fn owner_may_edit_while_unlocked() {
        let app = draft();
        let owner = Actor::applicant(app.applicant_id);
        app.ensure_editable_by(&owner).unwrap();
    }

    #[test]
    fn other_applicants_are_rejected() {
        let app = draft();
        let stranger = Actor::applicant(ActorId::new());
        let err = app.ensure_editable_by(&stranger).unwrap_err();
        assert_eq!(err.kind(), "forbidden");
    }

    #[test]
    fn locked_status_blocks_owner_edits() {
        let mut app = draft();
        app.status = ApplicationStatus::Eligible;
        let owner = Actor::applicant(app.applicant_id);
        let err = app.ensure_editable_by(&owner).unwrap_err();
        assert_eq!(err.kind(), "forbidden");
        assert!(err.to_string().contains("locked"));
    }
}
