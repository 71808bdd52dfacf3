//! Operational audit log.
//!
//! Audit writes are fire-and-forget relative to the primary operation: a
//! failing sink is logged and swallowed, never propagated. (Status history is
//! a different thing; it commits atomically with the transition.)

use chrono::{DateTime, Utc};
use serde::Serialize;

use applygate_core::ActorRef;

/// One audit record.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// Dotted action name, e.g. `role.created`, `application.status_changed`.
    pub action: String,
    pub actor: Option<ActorRef>,
    /// Identifier of the entity acted upon.
    pub subject: String,
    pub detail: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        action: impl Into<String>,
        actor: Option<ActorRef>,
        subject: impl Into<String>,
        detail: serde_json::Value,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            action: action.into(),
            actor,
            subject: subject.into(),
            detail,
            occurred_at,
        }
    }
}

/// Audit sink.
pub trait AuditLog: Send + Sync {
    /// Attempt to record one event. Callers go through [`AuditLog::record`],
    /// which swallows failures.
    fn try_record(&self, event: &AuditEvent) -> anyhow::Result<()>;

    /// Record an event, logging and swallowing any sink failure.
    fn record(&self, event: AuditEvent) {
        if let Err(error) = self.try_record(&event) {
            tracing::warn!(
                action = %event.action,
                subject = %event.subject,
                %error,
                "audit sink failed; event dropped"
            );
        }
    }
}

/// Sink that emits audit records as structured log lines.
#[derive(Debug, Default)]
pub struct TracingAuditLog;

impl AuditLog for TracingAuditLog {
    fn try_record(&self, event: &AuditEvent) -> anyhow::Result<()> {
        tracing::info!(
            target: "audit",
            action = %event.action,
            actor = event.actor.map(|a| a.to_string()),
            subject = %event.subject,
            detail = %event.detail,
            occurred_at = %event.occurred_at,
            "audit"
        );
        Ok(())
    }
}
