//! Council evaluation handlers
//!
//! Assigned members file and submit their score sheets; the secretary
//! finalizes the consensus once every member has submitted. Membership
//! is checked on every call — role alone is never enough.

use super::actor_from_headers;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use linden_engine::{council, CouncilAggregate};
use linden_store::EvaluationStore;
use linden_types::{
    Conclusion, CouncilAssignment, CouncilEvaluation, Criterion, DenialReason, ProposalId,
    WorkflowError,
};
use serde::Deserialize;
use std::collections::BTreeMap;

async fn assignment_for(
    state: &AppState,
    id: &ProposalId,
) -> ApiResult<CouncilAssignment> {
    state
        .store
        .get_assignment(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no council assigned to proposal {id}")))
}

/// `GET /evaluations/{proposalId}` — the caller's evaluation, created
/// as a draft on first access
pub async fn get_or_create_evaluation(
    State(state): State<AppState>,
    Path(proposal_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<CouncilEvaluation>> {
    let actor = actor_from_headers(&headers)?;
    let id = ProposalId::new(proposal_id);

    let assignment = assignment_for(&state, &id).await?;
    if !assignment.is_evaluator(&actor.id) {
        return Err(WorkflowError::Denied(DenialReason::NotAssignedEvaluator).into());
    }

    if let Some(evaluation) = state.store.get_evaluation(&id, &actor.id).await? {
        return Ok(Json(evaluation));
    }

    let evaluation = CouncilEvaluation::draft(id, actor.id, Utc::now());
    state.store.upsert_evaluation(evaluation.clone()).await?;
    tracing::debug!(proposal = %evaluation.proposal_id, evaluator = %evaluation.evaluator_id, "draft evaluation created");
    Ok(Json(evaluation))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateEvaluationRequest {
    pub scores: BTreeMap<Criterion, u8>,
    pub comments: Option<String>,
    pub conclusion: Option<Conclusion>,
}

/// `PATCH /evaluations/{proposalId}` — merge edits into the caller's draft
pub async fn update_evaluation(
    State(state): State<AppState>,
    Path(proposal_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<UpdateEvaluationRequest>,
) -> ApiResult<Json<CouncilEvaluation>> {
    let actor = actor_from_headers(&headers)?;
    let id = ProposalId::new(proposal_id);

    let assignment = assignment_for(&state, &id).await?;
    if !assignment.is_evaluator(&actor.id) {
        return Err(WorkflowError::Denied(DenialReason::NotAssignedEvaluator).into());
    }

    let mut evaluation = state
        .store
        .get_evaluation(&id, &actor.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("evaluation not found".into()))?;

    council::apply_update(
        &mut evaluation,
        &request.scores,
        request.comments,
        request.conclusion,
        Utc::now(),
    )?;
    state.store.upsert_evaluation(evaluation.clone()).await?;
    Ok(Json(evaluation))
}

/// `POST /evaluations/{proposalId}/submit` — freeze the caller's evaluation
pub async fn submit_evaluation(
    State(state): State<AppState>,
    Path(proposal_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<CouncilEvaluation>> {
    let actor = actor_from_headers(&headers)?;
    let id = ProposalId::new(proposal_id);

    let assignment = assignment_for(&state, &id).await?;
    if !assignment.is_evaluator(&actor.id) {
        return Err(WorkflowError::Denied(DenialReason::NotAssignedEvaluator).into());
    }

    let mut evaluation = state
        .store
        .get_evaluation(&id, &actor.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("evaluation not found".into()))?;

    council::submit_evaluation(&mut evaluation, Utc::now())?;
    state.store.upsert_evaluation(evaluation.clone()).await?;

    tracing::info!(proposal = %id, evaluator = %actor.id, "evaluation submitted");
    Ok(Json(evaluation))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    pub conclusion: Conclusion,
}

/// `POST /evaluations/{proposalId}/finalize` — the secretary records
/// the council's consensus; rejected until every member has submitted
pub async fn finalize_conclusion(
    State(state): State<AppState>,
    Path(proposal_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<FinalizeRequest>,
) -> ApiResult<Json<CouncilAggregate>> {
    let actor = actor_from_headers(&headers)?;
    let id = ProposalId::new(proposal_id);

    let mut assignment = assignment_for(&state, &id).await?;
    let evaluations = state.store.evaluations_for(&id).await?;

    council::finalize(
        &mut assignment,
        &evaluations,
        &actor,
        request.conclusion,
        Utc::now(),
    )?;
    state.store.save_assignment(assignment.clone()).await?;

    tracing::info!(proposal = %id, conclusion = ?request.conclusion, "council conclusion finalized");
    Ok(Json(council::aggregate(&assignment, &evaluations)))
}

/// `GET /evaluations/{proposalId}/aggregate` — submitted counts and
/// per-criterion statistics for reviewers
pub async fn get_aggregate(
    State(state): State<AppState>,
    Path(proposal_id): Path<String>,
) -> ApiResult<Json<CouncilAggregate>> {
    let id = ProposalId::new(proposal_id);
    let assignment = assignment_for(&state, &id).await?;
    let evaluations = state.store.evaluations_for(&id).await?;
    Ok(Json(council::aggregate(&assignment, &evaluations)))
}
