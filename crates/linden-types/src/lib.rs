//! Domain types for the Linden proposal lifecycle platform
//!
//! A research proposal moves through a fixed set of lifecycle states
//! (submission, faculty and council review, approval, execution,
//! acceptance, handover) under role-gated transitions. This crate
//! defines the closed vocabulary every other Linden crate speaks:
//!
//! - [`ProjectState`] / [`WorkflowAction`] — the lifecycle state set and
//!   the transition vocabulary
//! - [`Proposal`] — the subject entity, including SLA and pause bookkeeping
//! - [`WorkflowLogEntry`] — the append-only audit record
//! - [`CouncilEvaluation`] / [`CouncilAssignment`] — per-member council
//!   review records and the roster they belong to
//! - [`WorkflowError`] — the error taxonomy shared by engine and service

#![deny(unsafe_code)]

pub mod actor;
pub mod error;
pub mod evaluation;
pub mod ids;
pub mod log;
pub mod proposal;
pub mod state;

pub use actor::{Actor, Role};
pub use error::{DenialReason, Precondition, WorkflowError, WorkflowResult};
pub use evaluation::{
    Conclusion, CouncilAssignment, CouncilEvaluation, Criterion, EvaluationState, SCORE_MAX,
    SCORE_MIN,
};
pub use ids::{CouncilId, FacultyId, ProposalId, UserId};
pub use log::{ReturnReason, ReturnReasonCode, TransitionSummary, WorkflowLogEntry};
pub use proposal::{HolderUnit, Proposal};
pub use state::{ProjectState, WorkflowAction};
