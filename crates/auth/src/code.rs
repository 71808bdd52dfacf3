//! Permission code value object.

use serde::{Deserialize, Serialize};

use applygate_core::{DomainError, DomainResult};

/// Canonical permission identifier: `module[.resource].action`.
///
/// Segments are lowercase alphanumeric/underscore, joined by dots. A code has
/// two segments (`roles.view`) or three (`masters.districts.view`). Codes are
/// immutable once constructed; validation happens exactly once, here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionCode(String);

impl PermissionCode {
    pub fn parse(raw: impl Into<String>) -> DomainResult<Self> {
        let raw = raw.into();
        let segments: Vec<&str> = raw.split('.').collect();
        if !(2..=3).contains(&segments.len()) {
            return Err(DomainError::validation(format!(
                "permission code '{raw}' must have 2 or 3 dot-separated segments"
            )));
        }
        for segment in &segments {
            if !is_valid_segment(segment) {
                return Err(DomainError::validation(format!(
                    "permission code '{raw}' has invalid segment '{segment}'"
                )));
            }
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First segment.
    pub fn module(&self) -> &str {
        self.0.split('.').next().unwrap_or_default()
    }

    /// Middle segment, when the code has three.
    pub fn resource(&self) -> Option<&str> {
        let mut parts = self.0.split('.');
        let (_, middle, last) = (parts.next(), parts.next(), parts.next());
        last.and(middle)
    }

    /// Last segment.
    pub fn action(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or_default()
    }
}

pub(crate) fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

impl core::fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl core::str::FromStr for PermissionCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PermissionCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<PermissionCode> for String {
    fn from(value: PermissionCode) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_two_and_three_segment_codes() {
        assert!(PermissionCode::parse("roles.view").is_ok());
        assert!(PermissionCode::parse("masters.districts.view").is_ok());
        assert!(PermissionCode::parse("applications.verify").is_ok());
    }

    #[test]
    fn rejects_malformed_codes() {
        for raw in [
            "",
            "view",
            "Roles.view",
            "roles..view",
            "roles.view.",
            "a.b.c.d",
            "roles.*",
            "roles.vi ew",
        ] {
            let err = PermissionCode::parse(raw).unwrap_err();
            assert_eq!(err.kind(), "validation_error", "{raw}");
        }
    }

    #[test]
    fn segment_accessors() {
        let code = PermissionCode::parse("masters.districts.view").unwrap();
        assert_eq!(code.module(), "masters");
        assert_eq!(code.resource(), Some("districts"));
        assert_eq!(code.action(), "view");

        let code = PermissionCode::parse("roles.view").unwrap();
        assert_eq!(code.module(), "roles");
        assert_eq!(code.resource(), None);
        assert_eq!(code.action(), "view");
    }

    #[test]
    fn serde_round_trip_validates() {
        let code: PermissionCode = serde_json::from_str("\"roles.view\"").unwrap();
        assert_eq!(code.as_str(), "roles.view");
        assert!(serde_json::from_str::<PermissionCode>("\"Roles.View\"").is_err());
    }
}
