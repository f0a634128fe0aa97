//! Holder derivation
//!
//! "Who holds this proposal" is a pure function of the target state and
//! the proposal record. Every write path calls [`holder_for`] — the
//! rule lives in exactly one place so queue views, imports and
//! transitions can never drift apart.

use linden_types::{HolderUnit, ProjectState, Proposal, UserId};

/// The unit and (optionally) specific user holding action
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HolderAssignment {
    pub unit: Option<HolderUnit>,
    pub user: Option<UserId>,
}

/// Derive the holder for a proposal entering `state`.
///
/// The proposal argument supplies the context the rule needs: owning
/// faculty, owner, and the assigned council (set by ASSIGN_COUNCIL
/// before the holder is derived).
pub fn holder_for(state: ProjectState, proposal: &Proposal) -> HolderAssignment {
    match state {
        // Still with the owner; not in any queue
        ProjectState::Draft => HolderAssignment::default(),

        // Faculty-level review: any manager of the owning faculty acts
        ProjectState::FacultyReview | ProjectState::FacultyAcceptanceReview => HolderAssignment {
            unit: Some(HolderUnit::Faculty(proposal.faculty_id.clone())),
            user: None,
        },

        // Research office queues
        ProjectState::SchoolSelectionReview
        | ProjectState::SchoolAcceptanceReview
        | ProjectState::Paused => HolderAssignment {
            unit: Some(HolderUnit::ResearchOffice),
            user: None,
        },

        // Council evaluation: held by the assigned council
        ProjectState::OutlineCouncilReview => HolderAssignment {
            unit: proposal.council_id.clone().map(HolderUnit::Council),
            user: None,
        },

        // Back with the owner, inside their faculty
        ProjectState::ChangesRequested
        | ProjectState::Approved
        | ProjectState::InProgress
        | ProjectState::Handover => HolderAssignment {
            unit: Some(HolderUnit::Faculty(proposal.faculty_id.clone())),
            user: Some(proposal.owner_id.clone()),
        },

        // Terminal: out of every queue
        ProjectState::Completed
        | ProjectState::Cancelled
        | ProjectState::Withdrawn
        | ProjectState::Rejected => HolderAssignment::default(),
    }
}
