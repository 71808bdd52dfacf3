//! Authorization gate: allow/deny before a guarded operation runs.
//!
//! The HTTP layer declares *which* permissions gate a route as configuration
//! ([`PermissionRequirement`]); the decision itself lives here.

use applygate_core::{DomainError, DomainResult};

use crate::actor::Actor;
use crate::code::PermissionCode;
use crate::grants::GrantedSet;

/// How multiple required codes combine.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RequirementMode {
    /// Every code is required.
    All,
    /// At least one code suffices.
    Any,
}

/// Declarative permission requirement for one guarded operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRequirement {
    codes: Vec<PermissionCode>,
    mode: RequirementMode,
}

impl PermissionRequirement {
    pub fn all(codes: Vec<PermissionCode>) -> Self {
        Self {
            codes,
            mode: RequirementMode::All,
        }
    }

    pub fn any(codes: Vec<PermissionCode>) -> Self {
        Self {
            codes,
            mode: RequirementMode::Any,
        }
    }

    /// Convenience for route tables declared as string literals.
    pub fn parse_all<S: AsRef<str>>(codes: &[S]) -> DomainResult<Self> {
        Ok(Self::all(Self::parse_codes(codes)?))
    }

    pub fn parse_any<S: AsRef<str>>(codes: &[S]) -> DomainResult<Self> {
        Ok(Self::any(Self::parse_codes(codes)?))
    }

    fn parse_codes<S: AsRef<str>>(codes: &[S]) -> DomainResult<Vec<PermissionCode>> {
        codes
            .iter()
            .map(|raw| PermissionCode::parse(raw.as_ref()))
            .collect()
    }

    pub fn codes(&self) -> &[PermissionCode] {
        &self.codes
    }

    pub fn mode(&self) -> RequirementMode {
        self.mode
    }

    /// Check a granted set, reporting what is missing on denial: the single
    /// missing code under `All`, the full disjunction under `Any`.
    pub fn check(&self, granted: &GrantedSet) -> DomainResult<()> {
        match self.mode {
            RequirementMode::All => match granted.missing_from(&self.codes).first() {
                None => Ok(()),
                Some(missing) => Err(DomainError::forbidden(format!(
                    "missing permission '{missing}'"
                ))),
            },
            RequirementMode::Any => {
                if self.codes.is_empty() || granted.has_any_permission(&self.codes) {
                    Ok(())
                } else {
                    let wanted: Vec<String> =
                        self.codes.iter().map(|c| format!("'{c}'")).collect();
                    Err(DomainError::forbidden(format!(
                        "missing any of {}",
                        wanted.join(", ")
                    )))
                }
            }
        }
    }
}

/// Authorize `actor` against `requirement` before the guarded operation runs.
///
/// Super-administrators (fixed role code or full wildcard) bypass all checks.
/// Applicants and the system actor carry no permission set and are denied
/// here; their authority over status edges is expressed in the transition
/// authority table instead.
pub fn authorize(actor: &Actor, requirement: &PermissionRequirement) -> DomainResult<()> {
    if actor.is_super_admin() {
        return Ok(());
    }
    match actor.permissions() {
        Some(granted) => requirement.check(granted),
        None => Err(DomainError::forbidden(
            "administrator permissions required",
        )),
    }
}
