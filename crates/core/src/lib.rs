//! `applygate-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod actor;
pub mod error;
pub mod id;
pub mod version;

pub use actor::{ActorKind, ActorRef};
pub use error::{DomainError, DomainResult};
pub use id::{ActorId, ApplicationId, RoleId};
pub use version::ExpectedVersion;
