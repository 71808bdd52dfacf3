//! `applygate-auth` — authorization & audit-attribution core (zero-trust).
//!
//! This crate is intentionally decoupled from HTTP and storage: it holds the
//! permission catalog, the wildcard evaluator, the effective-permission
//! resolver, the actor model, and the request-scoped actor context.

pub mod actor;
pub mod catalog;
pub mod claims;
pub mod code;
pub mod context;
pub mod gate;
pub mod grants;
pub mod pattern;
pub mod resolver;
pub mod role;

pub use actor::{Actor, SUPER_ADMIN_ROLE};
pub use catalog::{CatalogBuilder, PermissionCatalog, PermissionEntry};
pub use claims::{AuthClaims, TokenError, TokenValidationError, TokenVerifier, validate_claims};
pub use code::PermissionCode;
pub use context::{ActorContext, current_context, run_with_context};
pub use gate::{PermissionRequirement, RequirementMode, authorize};
pub use grants::GrantedSet;
pub use pattern::WildcardPattern;
pub use resolver::{
    EffectivePermission, EffectivePermissions, PermissionSource, resolve_effective,
};
pub use role::{Role, WildcardGrant};
