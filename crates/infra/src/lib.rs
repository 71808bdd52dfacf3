//! Infrastructure layer: storage adapters, services, audit sink.

pub mod audit;
pub mod lifecycle;
pub mod rbac;
pub mod store;

pub use audit::{AuditEvent, AuditLog, TracingAuditLog};
pub use lifecycle::LifecycleService;
pub use rbac::{RbacService, default_permission_catalog};
pub use store::{
    ApplicationStore, InMemoryApplicationStore, InMemoryRoleStore, PostgresApplicationStore,
    PostgresRoleStore, RoleStore, StoreError,
};

#[cfg(test)]
mod integration_tests;
