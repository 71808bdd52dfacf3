//! Wildcard grant patterns.

use serde::{Deserialize, Serialize};

use applygate_core::{DomainError, DomainResult};

use crate::code::{PermissionCode, is_valid_segment};

/// A wildcard grant pattern, parsed once and compared structurally.
///
/// Exactly three forms exist: `*`, `module.*` (the module path may be
/// multi-level, e.g. `masters.districts.*`) and `*.action`. Anything else is
/// rejected at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WildcardPattern {
    /// `*`: every permission.
    Full,
    /// `module.*`: every permission under a module path.
    ModulePrefix(String),
    /// `*.action`: every permission with a given action.
    ActionSuffix(String),
}

impl WildcardPattern {
    pub fn parse(raw: impl AsRef<str>) -> DomainResult<Self> {
        let raw = raw.as_ref();
        if raw == "*" {
            return Ok(Self::Full);
        }
        if let Some(prefix) = raw.strip_suffix(".*") {
            if !prefix.is_empty() && prefix.split('.').all(is_valid_segment) {
                return Ok(Self::ModulePrefix(prefix.to_string()));
            }
        } else if let Some(action) = raw.strip_prefix("*.") {
            if is_valid_segment(action) {
                return Ok(Self::ActionSuffix(action.to_string()));
            }
        }
        Err(DomainError::validation(format!(
            "invalid wildcard pattern '{raw}' (expected '*', 'module.*' or '*.action')"
        )))
    }

    /// Structural match against a concrete permission code.
    pub fn matches(&self, code: &PermissionCode) -> bool {
        match self {
            Self::Full => true,
            Self::ModulePrefix(prefix) => code
                .as_str()
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.starts_with('.')),
            Self::ActionSuffix(action) => code
                .as_str()
                .strip_suffix(action.as_str())
                .is_some_and(|rest| rest.ends_with('.')),
        }
    }
}

impl core::fmt::Display for WildcardPattern {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Full => f.write_str("*"),
            Self::ModulePrefix(prefix) => write!(f, "{prefix}.*"),
            Self::ActionSuffix(action) => write!(f, "*.{action}"),
        }
    }
}

impl core::str::FromStr for WildcardPattern {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WildcardPattern {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<WildcardPattern> for String {
    fn from(value: WildcardPattern) -> Self {
        value.to_string()
    }
}
