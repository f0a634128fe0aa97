//! Lifecycle states and transition actions
//!
//! The state set is closed: every proposal is in exactly one of these
//! states, and the four terminal states accept no further transitions.
//! SUBMITTED is deliberately absent — submission is an *event* recorded
//! in the workflow log (`WorkflowAction::Submit`), never a state.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a proposal
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectState {
    /// Being drafted by the owner; not yet visible to reviewers
    #[default]
    Draft,
    /// Under review by the owning faculty
    FacultyReview,
    /// With the research office for council selection
    SchoolSelectionReview,
    /// Under evaluation by the assigned outline council
    OutlineCouncilReview,
    /// Approved; waiting for the owner to start execution
    Approved,
    /// Research in progress
    InProgress,
    /// Acceptance review at the faculty level
    FacultyAcceptanceReview,
    /// Acceptance review at the school level
    SchoolAcceptanceReview,
    /// Results handover to the research office
    Handover,
    /// Terminal: lifecycle finished successfully
    Completed,
    /// Returned to the owner for revisions
    ChangesRequested,
    /// Suspended by the research office; resumes to the pre-pause state
    Paused,
    /// Terminal: cancelled by the owner
    Cancelled,
    /// Terminal: withdrawn by the owner during review
    Withdrawn,
    /// Terminal: rejected by a reviewer
    Rejected,
}

impl ProjectState {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Cancelled | Self::Withdrawn | Self::Rejected
        )
    }

    /// States a proposal can be suspended from.
    pub fn is_pausable(&self) -> bool {
        !self.is_terminal() && *self != Self::Paused
    }

    /// States where a council roster evaluates the proposal.
    pub fn is_council_review(&self) -> bool {
        matches!(self, Self::OutlineCouncilReview | Self::SchoolAcceptanceReview)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::FacultyReview => "FACULTY_REVIEW",
            Self::SchoolSelectionReview => "SCHOOL_SELECTION_REVIEW",
            Self::OutlineCouncilReview => "OUTLINE_COUNCIL_REVIEW",
            Self::Approved => "APPROVED",
            Self::InProgress => "IN_PROGRESS",
            Self::FacultyAcceptanceReview => "FACULTY_ACCEPTANCE_REVIEW",
            Self::SchoolAcceptanceReview => "SCHOOL_ACCEPTANCE_REVIEW",
            Self::Handover => "HANDOVER",
            Self::Completed => "COMPLETED",
            Self::ChangesRequested => "CHANGES_REQUESTED",
            Self::Paused => "PAUSED",
            Self::Cancelled => "CANCELLED",
            Self::Withdrawn => "WITHDRAWN",
            Self::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for ProjectState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Workflow action — the transition vocabulary recorded in the audit log
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowAction {
    Submit,
    Approve,
    Return,
    Resubmit,
    AssignCouncil,
    Reject,
    StartProject,
    SubmitAcceptance,
    FacultyAccept,
    Accept,
    HandoverComplete,
    Cancel,
    Withdraw,
    Pause,
    Resume,
}

impl WorkflowAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "SUBMIT",
            Self::Approve => "APPROVE",
            Self::Return => "RETURN",
            Self::Resubmit => "RESUBMIT",
            Self::AssignCouncil => "ASSIGN_COUNCIL",
            Self::Reject => "REJECT",
            Self::StartProject => "START_PROJECT",
            Self::SubmitAcceptance => "SUBMIT_ACCEPTANCE",
            Self::FacultyAccept => "FACULTY_ACCEPT",
            Self::Accept => "ACCEPT",
            Self::HandoverComplete => "HANDOVER_COMPLETE",
            Self::Cancel => "CANCEL",
            Self::Withdraw => "WITHDRAW",
            Self::Pause => "PAUSE",
            Self::Resume => "RESUME",
        }
    }
}

impl std::fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(ProjectState::Completed.is_terminal());
        assert!(ProjectState::Cancelled.is_terminal());
        assert!(ProjectState::Withdrawn.is_terminal());
        assert!(ProjectState::Rejected.is_terminal());
        assert!(!ProjectState::Draft.is_terminal());
        assert!(!ProjectState::Paused.is_terminal());
        assert!(!ProjectState::InProgress.is_terminal());
    }

    #[test]
    fn test_pausable() {
        assert!(ProjectState::FacultyReview.is_pausable());
        assert!(ProjectState::Draft.is_pausable());
        assert!(!ProjectState::Paused.is_pausable());
        assert!(!ProjectState::Completed.is_pausable());
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_string(&ProjectState::SchoolSelectionReview).unwrap();
        assert_eq!(json, "\"SCHOOL_SELECTION_REVIEW\"");

        let back: ProjectState = serde_json::from_str("\"FACULTY_ACCEPTANCE_REVIEW\"").unwrap();
        assert_eq!(back, ProjectState::FacultyAcceptanceReview);

        let action = serde_json::to_string(&WorkflowAction::AssignCouncil).unwrap();
        assert_eq!(action, "\"ASSIGN_COUNCIL\"");
    }

    #[test]
    fn test_display_matches_wire() {
        assert_eq!(
            ProjectState::OutlineCouncilReview.to_string(),
            "OUTLINE_COUNCIL_REVIEW"
        );
        assert_eq!(WorkflowAction::HandoverComplete.to_string(), "HANDOVER_COMPLETE");
    }
}
