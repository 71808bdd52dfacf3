//! Effective permission resolution.
//!
//! Pure computation over inputs the storage layer fetches: a role, its direct
//! permission codes, its wildcard grants and the active catalog. Wildcard
//! expansion happens per call so the result reflects catalog state at query
//! time, not at grant time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use applygate_core::RoleId;

use crate::catalog::PermissionCatalog;
use crate::code::PermissionCode;
use crate::pattern::WildcardPattern;
use crate::role::{Role, WildcardGrant};

/// Where an effective permission came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "pattern")]
pub enum PermissionSource {
    Direct,
    Wildcard(WildcardPattern),
}

/// One resolved permission, tagged with its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePermission {
    pub code: PermissionCode,
    pub source: PermissionSource,
}

/// The fully resolved permission set of a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePermissions {
    pub role_id: RoleId,
    /// Active, non-deleted permissions directly joined to the role (sorted).
    pub direct: Vec<PermissionCode>,
    /// The role's wildcard grant patterns.
    pub wildcards: Vec<WildcardPattern>,
    /// Deduplicated union of direct and wildcard-expanded codes, sorted
    /// lexicographically. A code that is both direct and wildcard-covered
    /// keeps the direct tag.
    pub effective: Vec<EffectivePermission>,
    /// Set when the role holds the full wildcard or is the fixed
    /// super-administrator role; downstream checks may short-circuit to
    /// "always authorized" without consulting `effective`.
    pub unrestricted: bool,
}

/// Resolve a role's effective permission set against the active catalog.
pub fn resolve_effective(
    role: &Role,
    direct: &[PermissionCode],
    grants: &[WildcardGrant],
    catalog: &PermissionCatalog,
) -> EffectivePermissions {
    let mut resolved: BTreeMap<PermissionCode, PermissionSource> = direct
        .iter()
        .map(|code| (code.clone(), PermissionSource::Direct))
        .collect();

    for grant in grants {
        for code in catalog.active_codes() {
            if grant.pattern.matches(code) {
                resolved
                    .entry(code.clone())
                    .or_insert_with(|| PermissionSource::Wildcard(grant.pattern.clone()));
            }
        }
    }

    let mut direct_sorted: Vec<PermissionCode> = direct.to_vec();
    direct_sorted.sort();
    direct_sorted.dedup();

    let unrestricted = role.is_super_admin()
        || grants.iter().any(|g| g.pattern == WildcardPattern::Full);

    EffectivePermissions {
        role_id: role.id,
        direct: direct_sorted,
        wildcards: grants.iter().map(|g| g.pattern.clone()).collect(),
        effective: resolved
            .into_iter()
            .map(|(code, source)| EffectivePermission { code, source })
            .collect(),
        unrestricted,
    }
}
