//! Immutable permission catalog.
//!
//! The catalog is built once at startup and injected wherever expansion or
//! lookup is needed. It is never a process-global, so concurrent reads are
//! trivially safe and tests can construct their own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use applygate_core::{DomainError, DomainResult};

use crate::code::PermissionCode;

/// One registered permission and its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub code: PermissionCode,
    pub description: String,
    /// Inactive entries stay registered (codes are immutable once taken) but
    /// are excluded from wildcard expansion.
    pub is_active: bool,
}

/// Static catalog of valid permission codes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionCatalog {
    entries: BTreeMap<PermissionCode, PermissionEntry>,
}

impl PermissionCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    pub fn get(&self, code: &PermissionCode) -> Option<&PermissionEntry> {
        self.entries.get(code)
    }

    pub fn contains(&self, code: &PermissionCode) -> bool {
        self.entries.contains_key(code)
    }

    /// Active codes in lexicographic order.
    pub fn active_codes(&self) -> impl Iterator<Item = &PermissionCode> {
        self.entries
            .values()
            .filter(|e| e.is_active)
            .map(|e| &e.code)
    }

    pub fn entries(&self) -> impl Iterator<Item = &PermissionEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder enforcing code validity and registration idempotency.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    entries: BTreeMap<PermissionCode, PermissionEntry>,
}

impl CatalogBuilder {
    /// Register an active permission code.
    ///
    /// Registering the same code twice with identical metadata is a no-op;
    /// with different metadata it is a conflict, since codes are immutable
    /// once registered.
    pub fn register(&mut self, code: &str, description: &str) -> DomainResult<()> {
        self.register_entry(PermissionEntry {
            code: PermissionCode::parse(code)?,
            description: description.to_string(),
            is_active: true,
        })
    }

    /// Register a code that should not participate in wildcard expansion.
    pub fn register_inactive(&mut self, code: &str, description: &str) -> DomainResult<()> {
        self.register_entry(PermissionEntry {
            code: PermissionCode::parse(code)?,
            description: description.to_string(),
            is_active: false,
        })
    }

    pub fn register_entry(&mut self, entry: PermissionEntry) -> DomainResult<()> {
        match self.entries.get(&entry.code) {
            None => {
                self.entries.insert(entry.code.clone(), entry);
                Ok(())
            }
            Some(existing) if *existing == entry => Ok(()),
            Some(_) => Err(DomainError::conflict(format!(
                "permission '{}' already registered with different metadata",
                entry.code
            ))),
        }
    }

    pub fn build(self) -> PermissionCatalog {
        PermissionCatalog {
            entries: self.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_idempotent_for_identical_metadata() {
        let mut builder = PermissionCatalog::builder();
        builder.register("roles.view", "View roles").unwrap();
        builder.register("roles.view", "View roles").unwrap();
        let catalog = builder.build();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn re_registration_with_different_metadata_conflicts() {
        let mut builder = PermissionCatalog::builder();
        builder.register("roles.view", "View roles").unwrap();
        let err = builder.register("roles.view", "Something else").unwrap_err();
        assert_eq!(err.kind(), "conflict");
    }

    #[test]
    fn malformed_code_is_a_validation_error() {
        let mut builder = PermissionCatalog::builder();
        let err = builder.register("Roles.View", "nope").unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn active_codes_are_sorted_and_exclude_inactive() {
        let mut builder = PermissionCatalog::builder();
        builder.register("roles.view", "").unwrap();
        builder.register("applications.view", "").unwrap();
        builder.register_inactive("legacy.export", "").unwrap();
        let catalog = builder.build();

        let codes: Vec<&str> = catalog.active_codes().map(|c| c.as_str()).collect();
        assert_eq!(codes, vec!["applications.view", "roles.view"]);
    }
}
