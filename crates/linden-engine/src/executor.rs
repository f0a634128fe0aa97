//! Transition executor
//!
//! The single mutation entry point. One call runs the full protocol:
//!
//! 1. claim the idempotency key (replays return the stored outcome
//!    verbatim, re-validating nothing)
//! 2. authorize the actor against the current state
//! 3. for consensus-gated edges, require a finalized passing council
//!    conclusion
//! 4. resolve the target state (RESUME restores the pre-pause state)
//! 5. apply: state, derived holder, SLA window, audit log entry — one
//!    storage transaction guarded by the proposal version
//! 6. complete the idempotency record
//! 7. report metrics and dispatch a notification, fire-and-forget
//!
//! Denied authorization and failed preconditions release the key so
//! the client can retry after fixing the cause; only an applied
//! transition consumes it.

use crate::authorization::AuthorizationGate;
use crate::holder::holder_for;
use crate::idempotency::{BeginOutcome, IdempotencyLedger, OperationSignature};
use crate::metrics::MetricsSink;
use crate::notify::{NotificationDispatcher, TransitionNotice};
use crate::sla::SlaClock;
use crate::state_model::{self, Resolution};
use crate::council;
use chrono::{DateTime, Utc};
use linden_types::{
    Actor, CouncilAssignment, CouncilId, Precondition, ProjectState, Proposal, ProposalId,
    ReturnReason, TransitionSummary, UserId, WorkflowAction, WorkflowError, WorkflowLogEntry,
    WorkflowResult,
};
use linden_store::{EvaluationStore, ProposalStore, StorageError, WorkflowStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Role-specific body of an action request
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransitionPayload {
    pub comment: Option<String>,
    pub reason: Option<ReturnReason>,
    /// ASSIGN_COUNCIL: the council taking over evaluation
    pub council_id: Option<CouncilId>,
    /// ASSIGN_COUNCIL: secretary of the assigned roster
    pub council_secretary_id: Option<UserId>,
    /// ASSIGN_COUNCIL: evaluating members of the assigned roster
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub council_member_ids: Vec<UserId>,
    /// PAUSE: projected resume date shown in queue views
    pub expected_resume_at: Option<DateTime<Utc>>,
}

/// One inbound action request
#[derive(Clone, Debug)]
pub struct TransitionRequest {
    pub proposal_id: ProposalId,
    pub action: WorkflowAction,
    pub actor: Actor,
    pub idempotency_key: Uuid,
    pub payload: TransitionPayload,
}

/// Orchestrates the apply-a-transition protocol
pub struct TransitionExecutor {
    store: Arc<dyn WorkflowStore>,
    ledger: Arc<IdempotencyLedger>,
    gate: AuthorizationGate,
    sla: SlaClock,
    metrics: Arc<dyn MetricsSink>,
    notifier: Arc<dyn NotificationDispatcher>,
}

impl TransitionExecutor {
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        ledger: Arc<IdempotencyLedger>,
        sla: SlaClock,
        metrics: Arc<dyn MetricsSink>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            store,
            ledger,
            gate: AuthorizationGate::new(),
            sla,
            metrics,
            notifier,
        }
    }

    /// Execute one transition request.
    pub async fn execute(&self, request: TransitionRequest) -> WorkflowResult<TransitionSummary> {
        let key = request.idempotency_key;
        let signature =
            OperationSignature::new(request.proposal_id.clone(), request.action);

        match self.ledger.begin(key, signature, Utc::now()) {
            BeginOutcome::Proceed => {}
            BeginOutcome::Replayed(outcome) => {
                self.metrics.idempotent_replay();
                tracing::debug!(%key, proposal = %request.proposal_id, "idempotent replay");
                return Ok(outcome);
            }
            BeginOutcome::InFlight => {
                self.metrics
                    .transition_rejected(WorkflowError::ConcurrencyConflict.code());
                return Err(WorkflowError::ConcurrencyConflict);
            }
            BeginOutcome::Conflict => {
                let err = WorkflowError::IdempotencyConflict { key };
                self.metrics.transition_rejected(err.code());
                return Err(err);
            }
        }

        match self.apply(&request).await {
            Ok((summary, notice)) => {
                self.ledger.complete(key, summary.clone());
                self.metrics.transition_applied(request.action);
                self.dispatch(notice);
                Ok(summary)
            }
            Err(err) => {
                // The key stays usable: the client may retry once the
                // cause (permissions, preconditions, races) is gone.
                self.ledger.abandon(key);
                self.metrics.transition_rejected(err.code());
                Err(err)
            }
        }
    }

    async fn apply(
        &self,
        request: &TransitionRequest,
    ) -> WorkflowResult<(TransitionSummary, TransitionNotice)> {
        let proposal = self
            .store
            .get_proposal(&request.proposal_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| WorkflowError::ProposalNotFound(request.proposal_id.clone()))?;

        self.gate.authorize(&request.actor, &proposal, request.action)?;

        // authorize() already verified the edge exists
        let resolution = state_model::resolve(proposal.state, request.action)
            .ok_or(WorkflowError::Denied(linden_types::DenialReason::WrongState {
                state: proposal.state,
                action: request.action,
            }))?;

        if state_model::requires_consensus(proposal.state, request.action) {
            self.check_consensus(&proposal.id).await?;
        }

        let target = match resolution {
            Resolution::Fixed(state) => state,
            Resolution::PrePause => proposal
                .pre_pause_state
                .ok_or(WorkflowError::PreconditionFailed(
                    Precondition::PrePauseStateMissing,
                ))?,
        };

        // ASSIGN_COUNCIL carries the roster; it is persisted here,
        // behind authorization, so the consensus gate and the
        // evaluation endpoints see the same membership. Replays return
        // before this point and never rewrite a roster.
        if request.action == WorkflowAction::AssignCouncil {
            if let (Some(council_id), Some(secretary_id)) = (
                &request.payload.council_id,
                &request.payload.council_secretary_id,
            ) {
                if !request.payload.council_member_ids.is_empty() {
                    let assignment = CouncilAssignment::new(
                        proposal.id.clone(),
                        council_id.clone(),
                        secretary_id.clone(),
                        request.payload.council_member_ids.clone(),
                    );
                    self.store
                        .save_assignment(assignment)
                        .await
                        .map_err(internal)?;
                }
            }
        }

        let now = Utc::now();
        let expected_version = proposal.version;
        let mut updated = proposal.clone();
        self.apply_effects(&mut updated, &proposal, request, target, now)?;
        updated.version = expected_version + 1;
        updated.updated_at = now;

        let mut entry = WorkflowLogEntry::new(
            proposal.id.clone(),
            request.action,
            Some(proposal.state),
            target,
            request.actor.id.clone(),
            request.actor.display_name.clone(),
            now,
        );
        if let Some(comment) = &request.payload.comment {
            entry = entry.with_comment(comment.clone());
        }
        if let Some(reason) = &request.payload.reason {
            entry = entry.with_reason(reason.clone());
        }

        let saved = match self
            .store
            .apply_transition(expected_version, updated, entry)
            .await
        {
            Ok(saved) => saved,
            Err(StorageError::Conflict(detail)) => {
                tracing::warn!(proposal = %proposal.id, %detail, "concurrent transition lost the race");
                return Err(WorkflowError::ConcurrencyConflict);
            }
            Err(err) => {
                tracing::error!(proposal = %proposal.id, error = %err, "transition apply failed");
                return Err(WorkflowError::TransitionFailed);
            }
        };

        tracing::info!(
            proposal = %saved.code,
            from = %proposal.state,
            to = %saved.state,
            action = %request.action,
            actor = %request.actor.id,
            "transition applied"
        );

        let summary = TransitionSummary {
            proposal_id: saved.id.clone(),
            previous_state: proposal.state,
            current_state: saved.state,
            holder_unit: saved.holder_unit.clone(),
            timestamp: now,
        };
        let notice = TransitionNotice {
            proposal_id: saved.id.clone(),
            proposal_code: saved.code.clone(),
            action: request.action,
            from_state: proposal.state,
            to_state: saved.state,
            holder_unit: saved.holder_unit.clone(),
            timestamp: now,
        };
        Ok((summary, notice))
    }

    /// Mutate the proposal copy for the resolved transition: state,
    /// derived holder, SLA window and pause bookkeeping.
    fn apply_effects(
        &self,
        updated: &mut Proposal,
        previous: &Proposal,
        request: &TransitionRequest,
        target: ProjectState,
        now: DateTime<Utc>,
    ) -> WorkflowResult<()> {
        match request.action {
            WorkflowAction::Pause => {
                updated.pre_pause_state = Some(previous.state);
                updated.pre_pause_holder_unit = previous.holder_unit.clone();
                updated.pre_pause_holder_user = previous.holder_user.clone();
                updated.pause_reason = request.payload.comment.clone();
                updated.expected_resume_at = request.payload.expected_resume_at;
                updated.sla_paused_at = Some(now);

                updated.state = target;
                let holder = holder_for(target, updated);
                updated.holder_unit = holder.unit;
                updated.holder_user = holder.user;
            }

            WorkflowAction::Resume => {
                updated.state = target;
                updated.holder_unit = previous.pre_pause_holder_unit.clone();
                updated.holder_user = previous.pre_pause_holder_user.clone();

                // Resuming a never-paused clock is a no-op on the deadline
                if let (Some(paused_at), Some(deadline)) =
                    (previous.sla_paused_at, previous.sla_deadline)
                {
                    updated.sla_deadline =
                        Some(self.sla.resume_deadline(deadline, paused_at, now));
                    updated.sla_paused_ms += (now - paused_at).num_milliseconds();
                }
                updated.sla_paused_at = None;
                updated.pre_pause_state = None;
                updated.pre_pause_holder_unit = None;
                updated.pre_pause_holder_user = None;
                updated.pause_reason = None;
                updated.expected_resume_at = None;
            }

            action => {
                if action == WorkflowAction::AssignCouncil {
                    let council_id = request
                        .payload
                        .council_id
                        .clone()
                        .ok_or(WorkflowError::PreconditionFailed(
                            Precondition::CouncilNotAssigned,
                        ))?;
                    updated.council_id = Some(council_id);
                }

                updated.state = target;
                let holder = holder_for(target, updated);
                updated.holder_unit = holder.unit;
                updated.holder_user = holder.user;

                match self.sla.start(target, now) {
                    Some(window) => {
                        updated.sla_started_at = Some(window.started_at);
                        updated.sla_deadline = Some(window.deadline);
                    }
                    None => {
                        updated.sla_started_at = None;
                        updated.sla_deadline = None;
                    }
                }
                updated.sla_paused_at = None;
                updated.sla_paused_ms = 0;
            }
        }
        Ok(())
    }

    /// Consensus precondition for council-gated edges: a finalized,
    /// passing conclusion over a complete set of evaluations.
    async fn check_consensus(&self, proposal_id: &ProposalId) -> WorkflowResult<()> {
        let assignment = self
            .store
            .get_assignment(proposal_id)
            .await
            .map_err(internal)?
            .ok_or(WorkflowError::PreconditionFailed(
                Precondition::CouncilNotAssigned,
            ))?;
        let evaluations = self
            .store
            .evaluations_for(proposal_id)
            .await
            .map_err(internal)?;

        let aggregate = council::aggregate(&assignment, &evaluations);
        if !aggregate.all_submitted {
            return Err(Precondition::EvaluationIncomplete {
                submitted: aggregate.submitted_count,
                total: aggregate.total_members,
            }
            .into());
        }
        match aggregate.final_conclusion {
            None => Err(Precondition::ConclusionPending.into()),
            Some(linden_types::Conclusion::Fail) => {
                Err(Precondition::ConclusionNotPass.into())
            }
            Some(linden_types::Conclusion::Pass) => Ok(()),
        }
    }

    fn dispatch(&self, notice: TransitionNotice) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            notifier.dispatch(notice).await;
        });
    }

    /// Expose the ledger for periodic retention sweeps.
    pub fn ledger(&self) -> &IdempotencyLedger {
        &self.ledger
    }
}

/// A storage read failed before the apply step — surface the generic
/// retryable error, never the raw storage error.
fn internal(err: StorageError) -> WorkflowError {
    tracing::error!(error = %err, "storage error during transition");
    WorkflowError::TransitionFailed
}
