//! Actor kinds shared by authorization and audit attribution.

use serde::{Deserialize, Serialize};

use crate::id::ActorId;

/// The class of actor performing an operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// Portal administrator (carries a role and a permission set).
    Admin,
    /// Applicant acting on their own application.
    Applicant,
    /// Internal caller (scheduled jobs, automated verification).
    System,
}

impl core::fmt::Display for ActorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ActorKind::Admin => f.write_str("admin"),
            ActorKind::Applicant => f.write_str("applicant"),
            ActorKind::System => f.write_str("system"),
        }
    }
}

impl core::str::FromStr for ActorKind {
    type Err = crate::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(ActorKind::Admin),
            "applicant" => Ok(ActorKind::Applicant),
            "system" => Ok(ActorKind::System),
            other => Err(crate::error::DomainError::validation(format!(
                "unknown actor kind '{other}'"
            ))),
        }
    }
}

/// Attribution reference: who did it.
///
/// `id` is `None` for the system actor, which participates in attribution
/// without an identity of its own.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRef {
    pub id: Option<ActorId>,
    pub kind: ActorKind,
}

impl ActorRef {
    pub fn new(id: ActorId, kind: ActorKind) -> Self {
        Self { id: Some(id), kind }
    }

    pub fn system() -> Self {
        Self {
            id: None,
            kind: ActorKind::System,
        }
    }
}

impl core::fmt::Display for ActorRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.id {
            Some(id) => write!(f, "{}:{}", self.kind, id),
            None => write!(f, "{}", self.kind),
        }
    }
}
