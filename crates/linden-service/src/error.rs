//! Error types for the REST surface
//!
//! Engine errors map onto the HTTP taxonomy: structural violations
//! (wrong state, failed preconditions) are 400, authorization denials
//! are 403, idempotency-key misuse and lost concurrency races are 409,
//! everything unexpected is a generic 500. User-correctable codes
//! carry an actionable Vietnamese message; retryable codes render a
//! generic "please retry" and the client keeps its idempotency key.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use linden_store::StorageError;
use linden_types::{DenialReason, WorkflowError};
use serde::Serialize;
use thiserror::Error;

/// API-level errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Classified engine error
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// Storage error on a read-only path
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    /// Actor headers missing or unparseable
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    /// Actionable Vietnamese message for user-correctable errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Vietnamese user messages, keyed by error code.
fn user_message(code: &str) -> Option<&'static str> {
    let message = match code {
        "PROPOSAL_NOT_FOUND" => "Đề tài không tồn tại",
        "WRONG_STATE" => "Hành động không hợp lệ ở trạng thái hiện tại của đề tài",
        "WRONG_ROLE" => "Vai trò của bạn không có quyền thực hiện hành động này",
        "WRONG_FACULTY" => "Bạn không thuộc khoa quản lý đề tài này",
        "NOT_OWNER" => "Chỉ chủ nhiệm đề tài mới có quyền thực hiện hành động này",
        "NOT_ASSIGNED_EVALUATOR" => "Bạn không phải là người được phân bổ đánh giá đề tài này",
        "COUNCIL_NOT_ASSIGNED" => "Đề tài chưa được phân hội đồng",
        "EVALUATION_INCOMPLETE" => "Chưa đủ phiếu đánh giá của hội đồng",
        "CONCLUSION_PENDING" => "Hội đồng chưa chốt kết luận đánh giá",
        "CONCLUSION_NOT_PASS" => "Kết luận của hội đồng không đạt",
        "ALREADY_FINALIZED" => "Kết luận đánh giá đã được chốt",
        "EVALUATION_NOT_DRAFT" => "Chỉ có thể sửa phiếu đánh giá ở trạng thái DRAFT",
        "INCOMPLETE_FORM" => "Vui lòng điền đầy đủ thông tin, đặc biệt là kết luận đánh giá",
        "INVALID_SCORE" => "Điểm đánh giá phải từ 1 đến 5",
        "IDEMPOTENCY_CONFLICT" => "Khóa idempotency đã được dùng cho thao tác khác",
        "CONCURRENCY_CONFLICT" => "Đề tài vừa được cập nhật bởi người khác, vui lòng thử lại",
        "TRANSITION_FAILED" => "Đã xảy ra lỗi, vui lòng thử lại",
        _ => return None,
    };
    Some(message)
}

fn workflow_status(err: &WorkflowError) -> StatusCode {
    match err {
        WorkflowError::ProposalNotFound(_) => StatusCode::NOT_FOUND,
        // Acting from the wrong state is a structural violation, not a
        // permission problem
        WorkflowError::Denied(DenialReason::WrongState { .. }) => StatusCode::BAD_REQUEST,
        WorkflowError::Denied(_) => StatusCode::FORBIDDEN,
        WorkflowError::PreconditionFailed(_) => StatusCode::BAD_REQUEST,
        WorkflowError::IdempotencyConflict { .. } => StatusCode::CONFLICT,
        WorkflowError::ConcurrencyConflict => StatusCode::CONFLICT,
        WorkflowError::TransitionFailed => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Workflow(err) => (workflow_status(err), err.code()),
            ApiError::Storage(StorageError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, %code, "request failed");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            message: user_message(code).map(String::from),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use linden_types::{Precondition, ProjectState, ProposalId, Role, WorkflowAction};

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Workflow(WorkflowError::Denied(DenialReason::NotOwner))
                .into_response()
                .status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Workflow(WorkflowError::Denied(DenialReason::WrongState {
                state: ProjectState::Draft,
                action: WorkflowAction::Approve,
            }))
            .into_response()
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Workflow(WorkflowError::PreconditionFailed(
                Precondition::EvaluationIncomplete {
                    submitted: 2,
                    total: 3
                }
            ))
            .into_response()
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Workflow(WorkflowError::ConcurrencyConflict)
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Workflow(WorkflowError::ProposalNotFound(ProposalId::new("x")))
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_denial_codes_forbidden() {
        for denial in [
            DenialReason::WrongRole {
                role: Role::GiangVien,
                action: WorkflowAction::Approve,
            },
            DenialReason::WrongFaculty,
            DenialReason::NotOwner,
            DenialReason::NotAssignedEvaluator,
        ] {
            assert_eq!(
                ApiError::Workflow(WorkflowError::Denied(denial))
                    .into_response()
                    .status(),
                StatusCode::FORBIDDEN
            );
        }
    }

    #[test]
    fn test_user_messages_exist_for_actionable_codes() {
        for code in [
            "WRONG_ROLE",
            "NOT_OWNER",
            "EVALUATION_INCOMPLETE",
            "CONCURRENCY_CONFLICT",
        ] {
            assert!(user_message(code).is_some(), "{code}");
        }
        assert!(user_message("SOMETHING_ELSE").is_none());
    }
}
