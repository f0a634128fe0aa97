//! Council evaluation records
//!
//! Each assigned council member files one evaluation per proposal:
//! scores per criterion, free-text comments, and a pass/fail
//! conclusion. A submitted evaluation is immutable. The roster record
//! ([`CouncilAssignment`]) also carries the consensus once the council
//! secretary finalizes it — the consensus is an explicit decision by
//! the secretary, never auto-derived from a majority vote.

use crate::ids::{CouncilId, ProposalId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lowest valid criterion score
pub const SCORE_MIN: u8 = 1;
/// Highest valid criterion score
pub const SCORE_MAX: u8 = 5;

/// Evaluation criteria on the council score sheet
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Criterion {
    ScientificContent,
    ResearchMethod,
    Feasibility,
    Budget,
}

impl Criterion {
    pub const ALL: [Criterion; 4] = [
        Criterion::ScientificContent,
        Criterion::ResearchMethod,
        Criterion::Feasibility,
        Criterion::Budget,
    ];

    /// Vietnamese label used on the printed score sheet.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ScientificContent => "Nội dung khoa học",
            Self::ResearchMethod => "Phương pháp nghiên cứu",
            Self::Feasibility => "Tính khả thi",
            Self::Budget => "Kinh phí",
        }
    }
}

/// Pass/fail conclusion of an evaluation (or of the council consensus)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Conclusion {
    Pass,
    Fail,
}

/// Submission state of an evaluation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvaluationState {
    #[default]
    Draft,
    Submitted,
}

/// One council member's evaluation of one proposal
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouncilEvaluation {
    pub proposal_id: ProposalId,
    pub evaluator_id: UserId,
    pub scores: BTreeMap<Criterion, u8>,
    #[serde(default)]
    pub comments: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<Conclusion>,
    pub state: EvaluationState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CouncilEvaluation {
    /// Create a draft with neutral default scores, ready for editing.
    pub fn draft(proposal_id: ProposalId, evaluator_id: UserId, now: DateTime<Utc>) -> Self {
        let scores = Criterion::ALL.iter().map(|c| (*c, 3)).collect();
        Self {
            proposal_id,
            evaluator_id,
            scores,
            comments: String::new(),
            conclusion: None,
            state: EvaluationState::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.state == EvaluationState::Submitted
    }
}

/// The council roster assigned to a proposal, plus the finalized
/// consensus once the secretary records it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouncilAssignment {
    pub proposal_id: ProposalId,
    pub council_id: CouncilId,
    pub secretary_id: UserId,
    pub member_ids: Vec<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_conclusion: Option<Conclusion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized_by: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CouncilAssignment {
    pub fn new(
        proposal_id: ProposalId,
        council_id: CouncilId,
        secretary_id: UserId,
        member_ids: Vec<UserId>,
    ) -> Self {
        Self {
            proposal_id,
            council_id,
            secretary_id,
            member_ids,
            final_conclusion: None,
            finalized_by: None,
            finalized_at: None,
            created_at: Utc::now(),
        }
    }

    /// Whether `user` may file an evaluation for this proposal.
    pub fn is_evaluator(&self, user: &UserId) -> bool {
        self.member_ids.contains(user) || self.secretary_id == *user
    }

    pub fn is_finalized(&self) -> bool {
        self.final_conclusion.is_some()
    }
}
