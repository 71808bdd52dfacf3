//! Token claims model (transport-agnostic).
//!
//! This is the minimal set of claims the portal expects once a token has been
//! decoded/verified by whatever transport/security layer is in use. Signature
//! verification and decoding are intentionally outside this crate; only the
//! observable contract lives here: verified identity + role + carried
//! permissions in, actor object out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use applygate_core::{ActorId, ActorKind, DomainError, DomainResult};

use crate::actor::Actor;
use crate::grants::GrantedSet;

/// Decoded token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthClaims {
    /// Subject / actor identifier.
    pub sub: ActorId,

    /// Whether the subject is an administrator or an applicant.
    pub kind: ActorKind,

    /// Role code, present for administrators.
    pub role: Option<String>,

    /// Token-carried permission grants (codes and wildcard patterns).
    pub permissions: Vec<String>,

    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Errors surfaced by a [`TokenVerifier`].
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token rejected")]
    Invalid,

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Deterministically validate token claims.
pub fn validate_claims(claims: &AuthClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

/// Decodes and verifies a bearer token into claims.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<AuthClaims, TokenError>;
}

impl AuthClaims {
    /// Build the verified actor object from validated claims.
    ///
    /// Token-carried grants are parsed into structured form here, once;
    /// a malformed grant is a validation failure of the whole token.
    pub fn into_actor(self) -> DomainResult<Actor> {
        match self.kind {
            ActorKind::Admin => {
                let role = self.role.ok_or_else(|| {
                    DomainError::validation("admin token missing role code")
                })?;
                let permissions = GrantedSet::parse(&self.permissions)?;
                Ok(Actor::admin(self.sub, role, permissions))
            }
            ActorKind::Applicant => Ok(Actor::applicant(self.sub)),
            ActorKind::System => Ok(Actor::system()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims(kind: ActorKind) -> AuthClaims {
        let now = Utc::now();
        AuthClaims {
            sub: ActorId::new(),
            kind,
            role: Some("verifier".to_string()),
            permissions: vec!["applications.verify".to_string(), "masters.*".to_string()],
            issued_at: now - Duration::minutes(1),
            expires_at: now + Duration::minutes(30),
        }
    }

    #[test]
    fn window_validation() {
        let now = Utc::now();
        let c = claims(ActorKind::Admin);
        validate_claims(&c, now).unwrap();

        assert_eq!(
            validate_claims(&c, c.expires_at),
            Err(TokenValidationError::Expired)
        );
        assert_eq!(
            validate_claims(&c, c.issued_at - Duration::seconds(1)),
            Err(TokenValidationError::NotYetValid)
        );

        let mut inverted = c;
        inverted.expires_at = inverted.issued_at;
        assert_eq!(
            validate_claims(&inverted, now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }

    #[test]
    fn admin_claims_become_an_admin_actor() {
        let actor = claims(ActorKind::Admin).into_actor().unwrap();
        let Actor::Admin { permissions, role_code, .. } = actor else {
            panic!("expected admin actor");
        };
        assert_eq!(role_code, "verifier");
        assert!(permissions.has_permission(
            &crate::code::PermissionCode::parse("masters.districts.view").unwrap()
        ));
    }

    #[test]
    fn admin_claims_without_role_are_rejected() {
        let mut c = claims(ActorKind::Admin);
        c.role = None;
        assert!(c.into_actor().is_err());
    }

    #[test]
    fn malformed_token_grant_rejects_the_token() {
        let mut c = claims(ActorKind::Admin);
        c.permissions.push("users.*.view".to_string());
        assert!(c.into_actor().is_err());
    }

    #[test]
    fn applicant_claims_carry_no_permissions() {
        let actor = claims(ActorKind::Applicant).into_actor().unwrap();
        assert!(matches!(actor, Actor::Applicant { .. }));
        assert!(actor.permissions().is_none());
    }
}
