//! Idempotency ledger
//!
//! Guarantees at-most-one effective execution per (key, operation).
//! `begin` is an atomic check-and-insert under one lock: of two racing
//! requests with the same key, exactly one proceeds and the other sees
//! the in-flight record. Reusing a key with a *different* operation is
//! a client bug and is rejected distinctly from a legitimate replay.
//!
//! Records expire after a 24-hour retention window — long enough for
//! any client retry schedule, short enough to bound the ledger. The
//! window is a deliberate choice documented in DESIGN.md.

use chrono::{DateTime, Duration, Utc};
use linden_types::{ProposalId, TransitionSummary, WorkflowAction};
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

/// Retention window for completed and abandoned keys
pub const RETENTION_HOURS: i64 = 24;

/// Identity of the operation a key is bound to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationSignature {
    pub proposal_id: ProposalId,
    pub action: WorkflowAction,
}

impl OperationSignature {
    pub fn new(proposal_id: ProposalId, action: WorkflowAction) -> Self {
        Self {
            proposal_id,
            action,
        }
    }
}

#[derive(Clone, Debug)]
enum RecordState {
    /// A request holds the key and is executing
    Pending,
    /// The operation completed; replays return this outcome
    Completed(TransitionSummary),
}

#[derive(Clone, Debug)]
struct IdempotencyRecord {
    signature: OperationSignature,
    state: RecordState,
    created_at: DateTime<Utc>,
}

/// Outcome of `begin`
#[derive(Clone, Debug)]
pub enum BeginOutcome {
    /// First use of the key: caller proceeds and must `complete` or
    /// `abandon` it
    Proceed,
    /// Same key, same operation, already completed: return this
    /// outcome verbatim, re-validating nothing
    Replayed(TransitionSummary),
    /// Same key, same operation, still executing elsewhere
    InFlight,
    /// Same key, different operation signature — a client bug
    Conflict,
}

/// In-process idempotency ledger
#[derive(Debug, Default)]
pub struct IdempotencyLedger {
    records: Mutex<HashMap<Uuid, IdempotencyRecord>>,
}

impl IdempotencyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim `key` for `signature`.
    pub fn begin(&self, key: Uuid, signature: OperationSignature, now: DateTime<Utc>) -> BeginOutcome {
        let mut records = self.records.lock();

        if let Some(record) = records.get(&key) {
            if record.signature != signature {
                return BeginOutcome::Conflict;
            }
            return match &record.state {
                RecordState::Completed(outcome) => BeginOutcome::Replayed(outcome.clone()),
                RecordState::Pending => BeginOutcome::InFlight,
            };
        }

        records.insert(
            key,
            IdempotencyRecord {
                signature,
                state: RecordState::Pending,
                created_at: now,
            },
        );
        BeginOutcome::Proceed
    }

    /// Record the outcome of a successfully applied operation.
    pub fn complete(&self, key: Uuid, outcome: TransitionSummary) {
        let mut records = self.records.lock();
        if let Some(record) = records.get_mut(&key) {
            record.state = RecordState::Completed(outcome);
        }
    }

    /// Release a pending key after a failed attempt so the client can
    /// retry with the same key.
    pub fn abandon(&self, key: Uuid) {
        let mut records = self.records.lock();
        if let Some(record) = records.get(&key) {
            if matches!(record.state, RecordState::Pending) {
                records.remove(&key);
            }
        }
    }

    /// Drop records older than the retention window. Returns how many
    /// were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::hours(RETENTION_HOURS);
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, record| record.created_at >= cutoff);
        before - records.len()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linden_types::ProjectState;

    fn signature(action: WorkflowAction) -> OperationSignature {
        OperationSignature::new(ProposalId::new("p1"), action)
    }

    fn summary() -> TransitionSummary {
        TransitionSummary {
            proposal_id: ProposalId::new("p1"),
            previous_state: ProjectState::Draft,
            current_state: ProjectState::FacultyReview,
            holder_unit: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_first_use_proceeds() {
        let ledger = IdempotencyLedger::new();
        let key = Uuid::new_v4();
        assert!(matches!(
            ledger.begin(key, signature(WorkflowAction::Submit), Utc::now()),
            BeginOutcome::Proceed
        ));
    }

    #[test]
    fn test_replay_returns_stored_outcome() {
        let ledger = IdempotencyLedger::new();
        let key = Uuid::new_v4();
        ledger.begin(key, signature(WorkflowAction::Submit), Utc::now());
        ledger.complete(key, summary());

        match ledger.begin(key, signature(WorkflowAction::Submit), Utc::now()) {
            BeginOutcome::Replayed(outcome) => {
                assert_eq!(outcome.current_state, ProjectState::FacultyReview);
            }
            other => panic!("expected replay, got {other:?}"),
        }
    }

    #[test]
    fn test_same_key_different_operation_conflicts() {
        let ledger = IdempotencyLedger::new();
        let key = Uuid::new_v4();
        ledger.begin(key, signature(WorkflowAction::Submit), Utc::now());
        ledger.complete(key, summary());

        assert!(matches!(
            ledger.begin(key, signature(WorkflowAction::Cancel), Utc::now()),
            BeginOutcome::Conflict
        ));
    }

    #[test]
    fn test_concurrent_same_key_sees_in_flight() {
        let ledger = IdempotencyLedger::new();
        let key = Uuid::new_v4();
        ledger.begin(key, signature(WorkflowAction::Submit), Utc::now());

        assert!(matches!(
            ledger.begin(key, signature(WorkflowAction::Submit), Utc::now()),
            BeginOutcome::InFlight
        ));
    }

    #[test]
    fn test_abandon_releases_key_for_retry() {
        let ledger = IdempotencyLedger::new();
        let key = Uuid::new_v4();
        ledger.begin(key, signature(WorkflowAction::Submit), Utc::now());
        ledger.abandon(key);

        assert!(matches!(
            ledger.begin(key, signature(WorkflowAction::Submit), Utc::now()),
            BeginOutcome::Proceed
        ));
    }

    #[test]
    fn test_abandon_never_drops_completed_outcomes() {
        let ledger = IdempotencyLedger::new();
        let key = Uuid::new_v4();
        ledger.begin(key, signature(WorkflowAction::Submit), Utc::now());
        ledger.complete(key, summary());
        ledger.abandon(key);

        assert!(matches!(
            ledger.begin(key, signature(WorkflowAction::Submit), Utc::now()),
            BeginOutcome::Replayed(_)
        ));
    }

    #[test]
    fn test_purge_expired() {
        let ledger = IdempotencyLedger::new();
        let old_key = Uuid::new_v4();
        let fresh_key = Uuid::new_v4();
        let now = Utc::now();

        ledger.begin(old_key, signature(WorkflowAction::Submit), now - Duration::hours(25));
        ledger.complete(old_key, summary());
        ledger.begin(fresh_key, signature(WorkflowAction::Cancel), now - Duration::hours(1));

        assert_eq!(ledger.purge_expired(now), 1);
        assert_eq!(ledger.len(), 1);
        // The expired key is usable again
        assert!(matches!(
            ledger.begin(old_key, signature(WorkflowAction::Submit), now),
            BeginOutcome::Proceed
        ));
    }
}
