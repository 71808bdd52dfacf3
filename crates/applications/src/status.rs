//! Application status machine.
//!
//! The transition table is total by construction: `allowed_transitions`
//! matches exhaustively over the status enum, so adding a status without an
//! entry is a compile error rather than a startup check.

use serde::{Deserialize, Serialize};

/// Application lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    Eligible,
    NotEligible,
    OnHold,
    ProvisionalSelected,
    Rejected,
    Withdrawn,
}

/// Every status, in declaration order.
pub const ALL_STATUSES: [ApplicationStatus; 8] = [
    ApplicationStatus::Draft,
    ApplicationStatus::Submitted,
    ApplicationStatus::Eligible,
    ApplicationStatus::NotEligible,
    ApplicationStatus::OnHold,
    ApplicationStatus::ProvisionalSelected,
    ApplicationStatus::Rejected,
    ApplicationStatus::Withdrawn,
];

/// Allowed outgoing transitions per status.
///
/// `Eligible ⇄ OnHold` is the only cycle (administrative hold/release); every
/// other edge moves forward. `Rejected` and `Withdrawn` are terminal.
pub fn allowed_transitions(from: ApplicationStatus) -> &'static [ApplicationStatus] {
    use ApplicationStatus::*;
    match from {
        Draft => &[Submitted, Withdrawn],
        Submitted => &[Eligible, NotEligible, Withdrawn],
        Eligible => &[OnHold, ProvisionalSelected, Rejected, Withdrawn],
        OnHold => &[Eligible],
        NotEligible => &[Eligible, Withdrawn],
        ProvisionalSelected => &[Rejected, Withdrawn],
        Rejected => &[],
        Withdrawn => &[],
    }
}

/// True iff `to` is an allowed transition out of `from`.
pub fn is_valid_transition(from: ApplicationStatus, to: ApplicationStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

/// A terminal status admits no further transitions, ever.
pub fn is_terminal(status: ApplicationStatus) -> bool {
    allowed_transitions(status).is_empty()
}

/// Locked statuses forbid further edits by the owning applicant.
pub fn is_locked(status: ApplicationStatus) -> bool {
    use ApplicationStatus::*;
    matches!(
        status,
        Eligible | NotEligible | OnHold | ProvisionalSelected | Rejected | Withdrawn
    )
}

impl core::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Eligible => "eligible",
            ApplicationStatus::NotEligible => "not_eligible",
            ApplicationStatus::OnHold => "on_hold",
            ApplicationStatus::ProvisionalSelected => "provisional_selected",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        };
        f.write_str(s)
    }
}

impl core::str::FromStr for ApplicationStatus {
    type Err = applygate_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use ApplicationStatus::*;
        match s {
            "draft" => Ok(Draft),
            "submitted" => Ok(Submitted),
            "eligible" => Ok(Eligible),
            "not_eligible" => Ok(NotEligible),
            "on_hold" => Ok(OnHold),
            "provisional_selected" => Ok(ProvisionalSelected),
            "rejected" => Ok(Rejected),
            "withdrawn" => Ok(Withdrawn),
            other => Err(applygate_core::DomainError::validation(format!(
                "unknown application status '{other}'"
            ))),
        }
    }
}
