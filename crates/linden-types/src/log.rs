//! Workflow audit log
//!
//! One entry per applied transition, immutable once written. The entry
//! sequence for a proposal, ordered by timestamp, replays to the
//! proposal's current state — the reconciliation job depends on this.

use crate::ids::{ProposalId, UserId};
use crate::proposal::HolderUnit;
use crate::state::{ProjectState, WorkflowAction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Standardized reason codes a reviewer selects when returning a
/// proposal to its owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnReasonCode {
    ThieuTaiLieu,
    NoiDungKhongRoRang,
    PhuongPhapKhongKhaThi,
    KinhPhiKhongHopLe,
    Khac,
}

impl ReturnReasonCode {
    /// Vietnamese label shown to the owner.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ThieuTaiLieu => "Thiếu tài liệu",
            Self::NoiDungKhongRoRang => "Nội dung không rõ ràng",
            Self::PhuongPhapKhongKhaThi => "Phương pháp không khả thi",
            Self::KinhPhiKhongHopLe => "Kinh phí không hợp lý",
            Self::Khac => "Khác",
        }
    }
}

/// Structured reason attached to RETURN / REJECT / WITHDRAW entries
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnReason {
    pub code: ReturnReasonCode,
    /// Proposal form sections the owner must revise
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<String>,
}

/// Append-only audit record for one applied transition
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowLogEntry {
    pub id: String,
    pub proposal_id: ProposalId,
    pub action: WorkflowAction,
    /// Absent on the creation entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_state: Option<ProjectState>,
    pub to_state: ProjectState,
    pub actor_id: UserId,
    pub actor_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ReturnReason>,
    pub timestamp: DateTime<Utc>,
}

impl WorkflowLogEntry {
    pub fn new(
        proposal_id: ProposalId,
        action: WorkflowAction,
        from_state: Option<ProjectState>,
        to_state: ProjectState,
        actor_id: UserId,
        actor_name: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            proposal_id,
            action,
            from_state,
            to_state,
            actor_id,
            actor_name: actor_name.into(),
            comment: None,
            reason: None,
            timestamp,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_reason(mut self, reason: ReturnReason) -> Self {
        self.reason = Some(reason);
        self
    }
}

/// Outcome of an applied (or replayed) transition — the response body
/// of the action endpoint and the payload stored in the idempotency
/// ledger.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionSummary {
    pub proposal_id: ProposalId,
    pub previous_state: ProjectState,
    pub current_state: ProjectState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder_unit: Option<HolderUnit>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_builder() {
        let entry = WorkflowLogEntry::new(
            ProposalId::new("p1"),
            WorkflowAction::Return,
            Some(ProjectState::FacultyReview),
            ProjectState::ChangesRequested,
            UserId::new("u1"),
            "Trần Thị B",
            Utc::now(),
        )
        .with_comment("Cần bổ sung tài liệu")
        .with_reason(ReturnReason {
            code: ReturnReasonCode::ThieuTaiLieu,
            sections: vec!["SEC_BUDGET".into()],
        });

        assert_eq!(entry.action, WorkflowAction::Return);
        assert_eq!(entry.reason.as_ref().unwrap().code, ReturnReasonCode::ThieuTaiLieu);
    }

    #[test]
    fn test_reason_labels() {
        assert_eq!(ReturnReasonCode::Khac.label(), "Khác");
        assert_eq!(
            serde_json::to_string(&ReturnReasonCode::ThieuTaiLieu).unwrap(),
            "\"THIEU_TAI_LIEU\""
        );
    }

    #[test]
    fn test_summary_wire_shape() {
        let summary = TransitionSummary {
            proposal_id: ProposalId::new("p1"),
            previous_state: ProjectState::FacultyReview,
            current_state: ProjectState::SchoolSelectionReview,
            holder_unit: Some(HolderUnit::ResearchOffice),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["previousState"], "FACULTY_REVIEW");
        assert_eq!(json["currentState"], "SCHOOL_SELECTION_REVIEW");
        assert_eq!(json["holderUnit"]["kind"], "RESEARCH_OFFICE");
    }
}
