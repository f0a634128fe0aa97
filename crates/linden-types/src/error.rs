//! Workflow error taxonomy
//!
//! Every error leaving the transition executor is one of these
//! variants; raw storage errors never reach callers. Each variant maps
//! to a stable code the service layer uses for HTTP status selection
//! and user-facing messages.

use crate::ids::ProposalId;
use crate::state::{ProjectState, WorkflowAction};
use crate::{Criterion, Role};
use thiserror::Error;

/// Why the authorization gate denied an action
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DenialReason {
    #[error("action {action} is not legal from state {state}")]
    WrongState {
        state: ProjectState,
        action: WorkflowAction,
    },
    #[error("role {role} may not perform {action} here")]
    WrongRole { role: Role, action: WorkflowAction },
    #[error("actor does not belong to the proposal's faculty")]
    WrongFaculty,
    #[error("only the proposal owner may perform this action")]
    NotOwner,
    #[error("actor is not an assigned evaluator for this proposal")]
    NotAssignedEvaluator,
}

impl DenialReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::WrongState { .. } => "WRONG_STATE",
            Self::WrongRole { .. } => "WRONG_ROLE",
            Self::WrongFaculty => "WRONG_FACULTY",
            Self::NotOwner => "NOT_OWNER",
            Self::NotAssignedEvaluator => "NOT_ASSIGNED_EVALUATOR",
        }
    }
}

/// A structural precondition the caller can satisfy and retry
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Precondition {
    #[error("no council has been assigned to this proposal")]
    CouncilNotAssigned,
    #[error("{submitted} of {total} council evaluations submitted")]
    EvaluationIncomplete { submitted: usize, total: usize },
    #[error("the council secretary has not finalized a conclusion")]
    ConclusionPending,
    #[error("the council conclusion is not a pass")]
    ConclusionNotPass,
    #[error("the council conclusion is already finalized")]
    AlreadyFinalized,
    #[error("evaluation is no longer a draft")]
    EvaluationNotDraft,
    #[error("evaluation conclusion is missing")]
    IncompleteForm,
    #[error("score for {criterion:?} is out of range")]
    ScoreOutOfRange { criterion: Criterion },
    #[error("pre-pause state is missing from the proposal record")]
    PrePauseStateMissing,
}

impl Precondition {
    pub fn code(&self) -> &'static str {
        match self {
            Self::CouncilNotAssigned => "COUNCIL_NOT_ASSIGNED",
            Self::EvaluationIncomplete { .. } => "EVALUATION_INCOMPLETE",
            Self::ConclusionPending => "CONCLUSION_PENDING",
            Self::ConclusionNotPass => "CONCLUSION_NOT_PASS",
            Self::AlreadyFinalized => "ALREADY_FINALIZED",
            Self::EvaluationNotDraft => "EVALUATION_NOT_DRAFT",
            Self::IncompleteForm => "INCOMPLETE_FORM",
            Self::ScoreOutOfRange { .. } => "INVALID_SCORE",
            Self::PrePauseStateMissing => "PRE_PAUSE_STATE_MISSING",
        }
    }
}

/// Classified workflow errors — the only errors the executor surfaces
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("proposal not found: {0}")]
    ProposalNotFound(ProposalId),

    #[error("denied: {0}")]
    Denied(#[from] DenialReason),

    #[error("idempotency key {key} was already used for a different operation")]
    IdempotencyConflict { key: uuid::Uuid },

    #[error("precondition failed: {0}")]
    PreconditionFailed(#[from] Precondition),

    /// Transient: the proposal changed underneath this request. Safe to
    /// retry with the same idempotency key.
    #[error("concurrent modification detected")]
    ConcurrencyConflict,

    /// Unexpected internal failure, already logged. Safe to retry with
    /// the same idempotency key.
    #[error("transition failed")]
    TransitionFailed,
}

impl WorkflowError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProposalNotFound(_) => "PROPOSAL_NOT_FOUND",
            Self::Denied(reason) => reason.code(),
            Self::IdempotencyConflict { .. } => "IDEMPOTENCY_CONFLICT",
            Self::PreconditionFailed(precondition) => precondition.code(),
            Self::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            Self::TransitionFailed => "TRANSITION_FAILED",
        }
    }

    /// Whether a client may retry the request with the same
    /// idempotency key and expect it to eventually succeed unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict | Self::TransitionFailed)
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let denial = DenialReason::WrongState {
            state: ProjectState::Draft,
            action: WorkflowAction::Approve,
        };
        assert_eq!(WorkflowError::Denied(denial).code(), "WRONG_STATE");
        assert_eq!(
            WorkflowError::PreconditionFailed(Precondition::EvaluationIncomplete {
                submitted: 2,
                total: 3
            })
            .code(),
            "EVALUATION_INCOMPLETE"
        );
        assert_eq!(WorkflowError::ConcurrencyConflict.code(), "CONCURRENCY_CONFLICT");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(WorkflowError::ConcurrencyConflict.is_retryable());
        assert!(WorkflowError::TransitionFailed.is_retryable());
        assert!(!WorkflowError::Denied(DenialReason::NotOwner).is_retryable());
        assert!(!WorkflowError::IdempotencyConflict {
            key: uuid::Uuid::nil()
        }
        .is_retryable());
    }
}
