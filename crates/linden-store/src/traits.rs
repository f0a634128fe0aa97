//! Storage trait definitions

use crate::error::StoreResult;
use async_trait::async_trait;
use linden_types::{
    CouncilAssignment, CouncilEvaluation, HolderUnit, ProjectState, Proposal, ProposalId, UserId,
    WorkflowLogEntry,
};

/// Storage for proposals
#[async_trait]
pub trait ProposalStore: Send + Sync {
    /// Insert a freshly created proposal. Fails with `Conflict` if the
    /// id already exists.
    async fn insert_proposal(&self, proposal: Proposal) -> StoreResult<()>;

    /// Get a proposal by id
    async fn get_proposal(&self, id: &ProposalId) -> StoreResult<Option<Proposal>>;

    /// List all proposals
    async fn list_proposals(&self) -> StoreResult<Vec<Proposal>>;

    /// List proposals currently held by a unit (queue views)
    async fn list_by_holder(&self, unit: &HolderUnit) -> StoreResult<Vec<Proposal>>;

    /// Apply a transition atomically: persist the updated proposal and
    /// append its audit log entry in one transaction, provided the
    /// stored version still equals `expected_version`. Returns
    /// `Conflict` otherwise — the caller maps that to a retryable
    /// concurrency error.
    async fn apply_transition(
        &self,
        expected_version: u64,
        updated: Proposal,
        entry: WorkflowLogEntry,
    ) -> StoreResult<Proposal>;

    /// Overwrite a proposal's state without a version check or log
    /// entry. Reserved for the state-verification repair path.
    async fn force_set_state(&self, id: &ProposalId, state: ProjectState) -> StoreResult<()>;
}

/// Storage for the append-only workflow log
#[async_trait]
pub trait WorkflowLogStore: Send + Sync {
    /// All log entries for a proposal, ordered by timestamp ascending
    async fn logs_for(&self, id: &ProposalId) -> StoreResult<Vec<WorkflowLogEntry>>;
}

/// Storage for council rosters and evaluations
#[async_trait]
pub trait EvaluationStore: Send + Sync {
    async fn save_assignment(&self, assignment: CouncilAssignment) -> StoreResult<()>;

    async fn get_assignment(&self, id: &ProposalId) -> StoreResult<Option<CouncilAssignment>>;

    async fn upsert_evaluation(&self, evaluation: CouncilEvaluation) -> StoreResult<()>;

    async fn get_evaluation(
        &self,
        proposal: &ProposalId,
        evaluator: &UserId,
    ) -> StoreResult<Option<CouncilEvaluation>>;

    /// All evaluations filed for a proposal
    async fn evaluations_for(&self, proposal: &ProposalId) -> StoreResult<Vec<CouncilEvaluation>>;
}

/// Combined storage trait the engine is wired against
pub trait WorkflowStore: ProposalStore + WorkflowLogStore + EvaluationStore {}
