//! Proposal CRUD handlers (creation and read; all lifecycle mutation
//! goes through the workflow endpoints)

use super::actor_from_headers;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use linden_store::ProposalStore;
use linden_types::{Proposal, ProposalId, Role};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProposalRequest {
    pub code: String,
    pub title: String,
}

/// `POST /proposals` — create a draft owned by the calling lecturer
pub async fn create_proposal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateProposalRequest>,
) -> ApiResult<Json<Proposal>> {
    let actor = actor_from_headers(&headers)?;
    if actor.role != Role::GiangVien {
        return Err(ApiError::BadRequest(
            "only lecturers create proposals".into(),
        ));
    }
    let faculty_id = actor
        .faculty_id
        .ok_or_else(|| ApiError::BadRequest("actor has no faculty".into()))?;

    let proposal = Proposal::new(request.code, request.title, actor.id, faculty_id);
    state.store.insert_proposal(proposal.clone()).await?;

    tracing::info!(proposal = %proposal.code, owner = %proposal.owner_id, "proposal created");
    Ok(Json(proposal))
}

/// `GET /proposals/{id}`
pub async fn get_proposal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Proposal>> {
    let id = ProposalId::new(id);
    let proposal = state
        .store
        .get_proposal(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("proposal {id}")))?;
    Ok(Json(proposal))
}
