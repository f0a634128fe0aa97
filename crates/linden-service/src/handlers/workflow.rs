//! Workflow action and query handlers

use super::{actor_from_headers, idempotency_key};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Utc};
use linden_engine::{
    verification::RepairSummary, SlaStatus, TransitionPayload, TransitionRequest,
    VerificationReport,
};
use linden_store::{ProposalStore, WorkflowLogStore};
use linden_types::{
    CouncilId, HolderUnit, ProjectState, Proposal, ProposalId, ReturnReason, TransitionSummary,
    UserId, WorkflowAction, WorkflowLogEntry,
};
use serde::{Deserialize, Serialize};

/// Map a URL action segment to a workflow action. Aliases exist where
/// the frontend names the edge after its context ("approve-faculty" is
/// the APPROVE edge out of FACULTY_REVIEW).
fn parse_action(segment: &str) -> Result<WorkflowAction, ApiError> {
    let action = match segment {
        "submit" => WorkflowAction::Submit,
        "approve" | "approve-faculty" | "approve-council" => WorkflowAction::Approve,
        "return" => WorkflowAction::Return,
        "resubmit" => WorkflowAction::Resubmit,
        "assign-council" => WorkflowAction::AssignCouncil,
        "reject" => WorkflowAction::Reject,
        "start-project" => WorkflowAction::StartProject,
        "submit-acceptance" => WorkflowAction::SubmitAcceptance,
        "faculty-accept" => WorkflowAction::FacultyAccept,
        "accept" | "accept-school" => WorkflowAction::Accept,
        "handover-complete" => WorkflowAction::HandoverComplete,
        "cancel" => WorkflowAction::Cancel,
        "withdraw" => WorkflowAction::Withdraw,
        "pause" => WorkflowAction::Pause,
        "resume" => WorkflowAction::Resume,
        other => return Err(ApiError::BadRequest(format!("unknown action: {other}"))),
    };
    Ok(action)
}

/// Role-specific action body; empty for simple approvals
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionBody {
    pub comment: Option<String>,
    pub reason: Option<ReturnReason>,
    pub council_id: Option<String>,
    pub council_secretary_id: Option<String>,
    pub council_member_ids: Vec<String>,
    pub expected_resume_at: Option<DateTime<Utc>>,
}

/// `POST /workflow/{proposalId}/{action}`
pub async fn execute_action(
    State(state): State<AppState>,
    Path((proposal_id, action)): Path<(String, String)>,
    headers: HeaderMap,
    body: Option<Json<ActionBody>>,
) -> ApiResult<Json<TransitionSummary>> {
    let action = parse_action(&action)?;
    let actor = actor_from_headers(&headers)?;
    let key = idempotency_key(&headers)?;
    let proposal_id = ProposalId::new(proposal_id);
    let body = body.map(|Json(b)| b).unwrap_or_default();

    // ASSIGN_COUNCIL carries the roster; the executor persists it
    // behind authorization, the surface only checks it is complete.
    if action == WorkflowAction::AssignCouncil {
        if body.council_id.is_none() {
            return Err(ApiError::BadRequest("councilId is required".into()));
        }
        if body.council_secretary_id.is_none() {
            return Err(ApiError::BadRequest("councilSecretaryId is required".into()));
        }
        if body.council_member_ids.is_empty() {
            return Err(ApiError::BadRequest("councilMemberIds is required".into()));
        }
    }

    let request = TransitionRequest {
        proposal_id,
        action,
        actor,
        idempotency_key: key,
        payload: TransitionPayload {
            comment: body.comment,
            reason: body.reason,
            council_id: body.council_id.map(CouncilId::new),
            council_secretary_id: body.council_secretary_id.map(UserId::new),
            council_member_ids: body
                .council_member_ids
                .into_iter()
                .map(UserId::new)
                .collect(),
            expected_resume_at: body.expected_resume_at,
        },
    };

    let summary = state.executor.execute(request).await?;
    Ok(Json(summary))
}

/// `GET /workflow/{proposalId}/logs`
pub async fn get_logs(
    State(state): State<AppState>,
    Path(proposal_id): Path<String>,
) -> ApiResult<Json<Vec<WorkflowLogEntry>>> {
    let id = ProposalId::new(proposal_id);
    state
        .store
        .get_proposal(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("proposal {id}")))?;
    let logs = state.store.logs_for(&id).await?;
    Ok(Json(logs))
}

/// SLA view for dashboards
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaView {
    pub status: SlaStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sla_started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sla_deadline: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_resume_at: Option<DateTime<Utc>>,
}

/// `GET /workflow/{proposalId}/sla`
pub async fn get_sla(
    State(state): State<AppState>,
    Path(proposal_id): Path<String>,
) -> ApiResult<Json<SlaView>> {
    let id = ProposalId::new(proposal_id);
    let proposal = state
        .store
        .get_proposal(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("proposal {id}")))?;

    Ok(Json(SlaView {
        status: state.sla.status(&proposal, Utc::now()),
        sla_started_at: proposal.sla_started_at,
        sla_deadline: proposal.sla_deadline,
        paused_at: proposal.sla_paused_at,
        expected_resume_at: proposal.expected_resume_at,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueFilter {
    /// Holder unit code: a faculty id, a council id, or `PHONG_KHCN`
    pub unit: Option<String>,
    pub state: Option<ProjectState>,
}

/// One row in a work queue
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    #[serde(flatten)]
    pub proposal: Proposal,
    pub sla_status: SlaStatus,
}

/// `GET /workflow/queue` — proposals awaiting action, with SLA status
pub async fn get_queue(
    State(state): State<AppState>,
    Query(filter): Query<QueueFilter>,
) -> ApiResult<Json<Vec<QueueEntry>>> {
    let proposals = state.store.list_proposals().await?;
    let now = Utc::now();

    let entries = proposals
        .into_iter()
        .filter(|p| !p.is_terminal())
        .filter(|p| match &filter.unit {
            Some(unit) => p
                .holder_unit
                .as_ref()
                .map(HolderUnit::code)
                .as_deref()
                == Some(unit.as_str()),
            None => true,
        })
        .filter(|p| match filter.state {
            Some(state) => p.state == state,
            None => true,
        })
        .map(|proposal| QueueEntry {
            sla_status: state.sla.status(&proposal, now),
            proposal,
        })
        .collect();

    Ok(Json(entries))
}

/// `POST /workflow/verify` — replay logs against stored states
pub async fn verify_states(State(state): State<AppState>) -> ApiResult<Json<VerificationReport>> {
    Ok(Json(state.verifier.verify_all().await?))
}

/// `POST /workflow/verify/repair` — verify, then rewrite drifted states
pub async fn repair_states(State(state): State<AppState>) -> ApiResult<Json<RepairSummary>> {
    let report = state.verifier.verify_all().await?;
    Ok(Json(state.verifier.repair(&report).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_aliases() {
        assert_eq!(parse_action("approve-faculty").unwrap(), WorkflowAction::Approve);
        assert_eq!(parse_action("approve").unwrap(), WorkflowAction::Approve);
        assert_eq!(parse_action("assign-council").unwrap(), WorkflowAction::AssignCouncil);
        assert_eq!(parse_action("handover-complete").unwrap(), WorkflowAction::HandoverComplete);
        assert!(parse_action("explode").is_err());
    }
}
