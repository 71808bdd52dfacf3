//! `applygate-applications` — application records and their status lifecycle.
//!
//! The status machine is a fixed table; transitions are validated here and
//! committed atomically by the storage layer.

pub mod application;
pub mod guard;
pub mod status;

pub use application::{Application, StatusHistoryEntry};
pub use guard::{TransitionAuthority, authorize_transition, required_authority};
pub use status::{
    ALL_STATUSES, ApplicationStatus, allowed_transitions, is_locked, is_terminal,
    is_valid_transition,
};
