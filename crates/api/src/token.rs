//! HS256 token verification.
//!
//! Claim-window validation stays pure in the auth crate; this adapter only
//! does the signature/decode step with an injected clock.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use applygate_auth::{AuthClaims, TokenError, TokenVerifier, validate_claims};
use applygate_core::ActorId;

/// JWT payload as it travels on the wire.
#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    sub: Uuid,
    kind: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    permissions: Vec<String>,
    iat: i64,
    exp: i64,
}

/// HS256 verifier over a shared secret.
pub struct Hs256TokenVerifier {
    decoding: DecodingKey,
    validation: Validation,
}

impl Hs256TokenVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is validated deterministically in `validate_claims` with the
        // caller-supplied clock.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        Self {
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl TokenVerifier for Hs256TokenVerifier {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<AuthClaims, TokenError> {
        let data = jsonwebtoken::decode::<WireClaims>(token, &self.decoding, &self.validation)
            .map_err(|_| TokenError::Invalid)?;
        let wire = data.claims;

        let claims = AuthClaims {
            sub: ActorId::from_uuid(wire.sub),
            kind: wire.kind.parse().map_err(|_| TokenError::Invalid)?,
            role: wire.role,
            permissions: wire.permissions,
            issued_at: DateTime::from_timestamp(wire.iat, 0).ok_or(TokenError::Invalid)?,
            expires_at: DateTime::from_timestamp(wire.exp, 0).ok_or(TokenError::Invalid)?,
        };
        validate_claims(&claims, now)?;
        Ok(claims)
    }
}

/// Mint a token for development tooling and tests.
pub fn mint_token(
    secret: &[u8],
    sub: ActorId,
    kind: &str,
    role: Option<&str>,
    permissions: &[&str],
    now: DateTime<Utc>,
    ttl_secs: i64,
) -> anyhow::Result<String> {
    let wire = WireClaims {
        sub: *sub.as_uuid(),
        kind: kind.to_string(),
        role: role.map(str::to_string),
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
        iat: now.timestamp(),
        exp: now.timestamp() + ttl_secs,
    };
    Ok(jsonwebtoken::encode(
        &jsonwebtoken::Header::new(Algorithm::HS256),
        &wire,
        &jsonwebtoken::EncodingKey::from_secret(secret),
    )?)
}
