//! Granted-set evaluation: the wildcard-matching hot path.
//!
//! A [`GrantedSet`] holds an actor's grants in structured form: concrete
//! codes plus parsed wildcard patterns. All matching is deterministic,
//! side-effect-free and O(number of grants) per check.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use applygate_core::DomainResult;

use crate::catalog::PermissionCatalog;
use crate::code::PermissionCode;
use crate::pattern::WildcardPattern;

/// A set of granted permissions, wildcards pre-parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantedSet {
    codes: BTreeSet<PermissionCode>,
    patterns: BTreeSet<WildcardPattern>,
}

impl GrantedSet {
    /// Parse raw grant strings (as carried in a token or loaded from storage).
    ///
    /// Each entry is either a concrete permission code or one of the three
    /// wildcard forms; anything else fails validation here, once, so the
    /// check path never sees malformed input.
    pub fn parse<I, S>(grants: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for grant in grants {
            let raw = grant.as_ref();
            match WildcardPattern::parse(raw) {
                Ok(pattern) => {
                    set.patterns.insert(pattern);
                }
                Err(_) => {
                    set.codes.insert(PermissionCode::parse(raw)?);
                }
            }
        }
        Ok(set)
    }

    pub fn from_parts(
        codes: impl IntoIterator<Item = PermissionCode>,
        patterns: impl IntoIterator<Item = WildcardPattern>,
    ) -> Self {
        Self {
            codes: codes.into_iter().collect(),
            patterns: patterns.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty() && self.patterns.is_empty()
    }

    /// Whether the set holds the full wildcard `*`.
    pub fn has_full(&self) -> bool {
        self.patterns.contains(&WildcardPattern::Full)
    }

    pub fn codes(&self) -> impl Iterator<Item = &PermissionCode> {
        self.codes.iter()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &WildcardPattern> {
        self.patterns.iter()
    }

    /// True iff `required` is granted directly or matched by a wildcard.
    pub fn has_permission(&self, required: &PermissionCode) -> bool {
        self.codes.contains(required) || self.patterns.iter().any(|p| p.matches(required))
    }

    /// OR combinator over the required codes.
    pub fn has_any_permission(&self, required: &[PermissionCode]) -> bool {
        required.iter().any(|code| self.has_permission(code))
    }

    /// AND combinator over the required codes.
    pub fn has_all_permissions(&self, required: &[PermissionCode]) -> bool {
        required.iter().all(|code| self.has_permission(code))
    }

    /// The required codes this set does not cover, in input order.
    pub fn missing_from<'a>(&self, required: &'a [PermissionCode]) -> Vec<&'a PermissionCode> {
        required
            .iter()
            .filter(|code| !self.has_permission(code))
            .collect()
    }

    /// Materialize the set against the currently active catalog.
    ///
    /// Display/audit only, never on the authorization hot path. Direct codes
    /// pass through as-is; wildcard entries expand to every active catalog
    /// code they match, reflecting catalog state at call time.
    pub fn expand_wildcards(&self, catalog: &PermissionCatalog) -> BTreeSet<PermissionCode> {
        let mut expanded = self.codes.clone();
        if !self.patterns.is_empty() {
            for code in catalog.active_codes() {
                if self.patterns.iter().any(|p| p.matches(code)) {
                    expanded.insert(code.clone());
                }
            }
        }
        expanded
    }
}
