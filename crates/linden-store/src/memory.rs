//! In-memory storage implementation
//!
//! A single `RwLock` over all collections is the transaction boundary:
//! `apply_transition` takes one write guard, so the proposal update and
//! the log append are observed together or not at all.

use crate::error::{StorageError, StoreResult};
use crate::traits::*;
use async_trait::async_trait;
use linden_types::{
    CouncilAssignment, CouncilEvaluation, HolderUnit, ProjectState, Proposal, ProposalId, UserId,
    WorkflowLogEntry,
};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    proposals: HashMap<ProposalId, Proposal>,
    logs: HashMap<ProposalId, Vec<WorkflowLogEntry>>,
    assignments: HashMap<ProposalId, CouncilAssignment>,
    evaluations: HashMap<(ProposalId, UserId), CouncilEvaluation>,
}

/// In-memory storage for development and testing
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProposalStore for InMemoryStore {
    async fn insert_proposal(&self, proposal: Proposal) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.proposals.contains_key(&proposal.id) {
            return Err(StorageError::Conflict(format!(
                "proposal {} already exists",
                proposal.id
            )));
        }
        inner.proposals.insert(proposal.id.clone(), proposal);
        Ok(())
    }

    async fn get_proposal(&self, id: &ProposalId) -> StoreResult<Option<Proposal>> {
        let inner = self.inner.read().await;
        Ok(inner.proposals.get(id).cloned())
    }

    async fn list_proposals(&self) -> StoreResult<Vec<Proposal>> {
        let inner = self.inner.read().await;
        let mut proposals: Vec<Proposal> = inner.proposals.values().cloned().collect();
        proposals.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(proposals)
    }

    async fn list_by_holder(&self, unit: &HolderUnit) -> StoreResult<Vec<Proposal>> {
        let inner = self.inner.read().await;
        let mut proposals: Vec<Proposal> = inner
            .proposals
            .values()
            .filter(|p| p.holder_unit.as_ref() == Some(unit))
            .cloned()
            .collect();
        proposals.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(proposals)
    }

    async fn apply_transition(
        &self,
        expected_version: u64,
        updated: Proposal,
        entry: WorkflowLogEntry,
    ) -> StoreResult<Proposal> {
        let mut inner = self.inner.write().await;

        let current = inner
            .proposals
            .get(&updated.id)
            .ok_or_else(|| StorageError::NotFound(format!("proposal {}", updated.id)))?;

        if current.version != expected_version {
            return Err(StorageError::Conflict(format!(
                "proposal {} version {} does not match expected {}",
                updated.id, current.version, expected_version
            )));
        }

        inner.proposals.insert(updated.id.clone(), updated.clone());
        inner
            .logs
            .entry(entry.proposal_id.clone())
            .or_default()
            .push(entry);

        Ok(updated)
    }

    async fn force_set_state(&self, id: &ProposalId, state: ProjectState) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let proposal = inner
            .proposals
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("proposal {id}")))?;
        proposal.state = state;
        proposal.updated_at = chrono::Utc::now();
        Ok(())
    }
}

#[async_trait]
impl WorkflowLogStore for InMemoryStore {
    async fn logs_for(&self, id: &ProposalId) -> StoreResult<Vec<WorkflowLogEntry>> {
        let inner = self.inner.read().await;
        let mut entries = inner.logs.get(id).cloned().unwrap_or_default();
        entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(entries)
    }
}

#[async_trait]
impl EvaluationStore for InMemoryStore {
    async fn save_assignment(&self, assignment: CouncilAssignment) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .assignments
            .insert(assignment.proposal_id.clone(), assignment);
        Ok(())
    }

    async fn get_assignment(&self, id: &ProposalId) -> StoreResult<Option<CouncilAssignment>> {
        let inner = self.inner.read().await;
        Ok(inner.assignments.get(id).cloned())
    }

    async fn upsert_evaluation(&self, evaluation: CouncilEvaluation) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let key = (
            evaluation.proposal_id.clone(),
            evaluation.evaluator_id.clone(),
        );
        inner.evaluations.insert(key, evaluation);
        Ok(())
    }

    async fn get_evaluation(
        &self,
        proposal: &ProposalId,
        evaluator: &UserId,
    ) -> StoreResult<Option<CouncilEvaluation>> {
        let inner = self.inner.read().await;
        Ok(inner
            .evaluations
            .get(&(proposal.clone(), evaluator.clone()))
            .cloned())
    }

    async fn evaluations_for(&self, proposal: &ProposalId) -> StoreResult<Vec<CouncilEvaluation>> {
        let inner = self.inner.read().await;
        let mut evaluations: Vec<CouncilEvaluation> = inner
            .evaluations
            .iter()
            .filter(|((pid, _), _)| pid == proposal)
            .map(|(_, e)| e.clone())
            .collect();
        evaluations.sort_by(|a, b| a.evaluator_id.cmp(&b.evaluator_id));
        Ok(evaluations)
    }
}

impl WorkflowStore for InMemoryStore {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use linden_types::{FacultyId, WorkflowAction};

    fn make_proposal() -> Proposal {
        Proposal::new(
            "DT-2025-001",
            "Đề tài thử nghiệm",
            UserId::new("owner-1"),
            FacultyId::new("faculty-1"),
        )
    }

    fn make_entry(proposal: &Proposal, to: ProjectState) -> WorkflowLogEntry {
        WorkflowLogEntry::new(
            proposal.id.clone(),
            WorkflowAction::Submit,
            Some(proposal.state),
            to,
            UserId::new("owner-1"),
            "Owner",
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemoryStore::new();
        let proposal = make_proposal();
        let id = proposal.id.clone();

        store.insert_proposal(proposal).await.unwrap();
        assert!(store.get_proposal(&id).await.unwrap().is_some());
        assert!(store
            .get_proposal(&ProposalId::new("missing"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_conflicts() {
        let store = InMemoryStore::new();
        let proposal = make_proposal();
        store.insert_proposal(proposal.clone()).await.unwrap();
        let result = store.insert_proposal(proposal).await;
        assert!(matches!(result, Err(StorageError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_apply_transition_updates_and_logs() {
        let store = InMemoryStore::new();
        let proposal = make_proposal();
        let id = proposal.id.clone();
        store.insert_proposal(proposal.clone()).await.unwrap();

        let mut updated = proposal.clone();
        updated.state = ProjectState::FacultyReview;
        updated.version = 2;
        let entry = make_entry(&proposal, ProjectState::FacultyReview);

        let saved = store.apply_transition(1, updated, entry).await.unwrap();
        assert_eq!(saved.state, ProjectState::FacultyReview);
        assert_eq!(saved.version, 2);
        assert_eq!(store.logs_for(&id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts_without_side_effects() {
        let store = InMemoryStore::new();
        let proposal = make_proposal();
        let id = proposal.id.clone();
        store.insert_proposal(proposal.clone()).await.unwrap();

        let mut updated = proposal.clone();
        updated.state = ProjectState::FacultyReview;
        updated.version = 2;
        let entry = make_entry(&proposal, ProjectState::FacultyReview);

        // Wrong expected version: nothing may change
        let result = store.apply_transition(7, updated, entry).await;
        assert!(matches!(result, Err(StorageError::Conflict(_))));

        let stored = store.get_proposal(&id).await.unwrap().unwrap();
        assert_eq!(stored.state, ProjectState::Draft);
        assert!(store.logs_for(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_by_holder() {
        let store = InMemoryStore::new();
        let mut held = make_proposal();
        held.holder_unit = Some(HolderUnit::ResearchOffice);
        let other = make_proposal();

        store.insert_proposal(held).await.unwrap();
        store.insert_proposal(other).await.unwrap();

        let queue = store
            .list_by_holder(&HolderUnit::ResearchOffice)
            .await
            .unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_evaluation_round_trip() {
        let store = InMemoryStore::new();
        let pid = ProposalId::new("p1");
        let eval = CouncilEvaluation::draft(pid.clone(), UserId::new("m1"), Utc::now());

        store.upsert_evaluation(eval).await.unwrap();
        assert!(store
            .get_evaluation(&pid, &UserId::new("m1"))
            .await
            .unwrap()
            .is_some());
        assert_eq!(store.evaluations_for(&pid).await.unwrap().len(), 1);
    }
}
