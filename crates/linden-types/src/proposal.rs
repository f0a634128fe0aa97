//! The proposal entity
//!
//! A proposal is never physically deleted: terminal states close the
//! record. All mutation goes through the transition executor; fields
//! like `holder_unit` are derived from the state on every write, never
//! set independently.

use crate::ids::{CouncilId, FacultyId, ProposalId, UserId};
use crate::state::ProjectState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The organizational unit currently holding action on a proposal.
///
/// Derived from the proposal's state by `linden_engine::holder::holder_for`;
/// stored denormalized so queue views can filter without re-deriving.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HolderUnit {
    /// A faculty, identified by its id
    Faculty(FacultyId),
    /// The research office (PHONG_KHCN)
    ResearchOffice,
    /// An assigned review council
    Council(CouncilId),
}

impl HolderUnit {
    /// Stable code used by queue filters and notifications.
    pub fn code(&self) -> String {
        match self {
            Self::Faculty(id) => id.to_string(),
            Self::ResearchOffice => "PHONG_KHCN".to_string(),
            Self::Council(id) => id.to_string(),
        }
    }
}

impl std::fmt::Display for HolderUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A research proposal record
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: ProposalId,
    /// Human-readable code, e.g. "DT-2025-041"
    pub code: String,
    pub title: String,
    pub owner_id: UserId,
    pub faculty_id: FacultyId,
    pub state: ProjectState,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder_unit: Option<HolderUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder_user: Option<UserId>,
    /// Council assigned for outline/acceptance evaluation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub council_id: Option<CouncilId>,

    // SLA window for the current state (absent in states without an SLA)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sla_started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sla_deadline: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sla_paused_at: Option<DateTime<Utc>>,
    /// Cumulative paused duration in whole milliseconds, across all
    /// pause/resume cycles of the current SLA window
    #[serde(default)]
    pub sla_paused_ms: i64,

    // Pause bookkeeping: RESUME restores these, then clears them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_pause_state: Option<ProjectState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_pause_holder_unit: Option<HolderUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_pause_holder_user: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pause_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_resume_at: Option<DateTime<Utc>>,

    /// Optimistic-concurrency version; bumped on every applied transition
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    /// Create a new proposal in DRAFT, owned by `owner_id`.
    pub fn new(
        code: impl Into<String>,
        title: impl Into<String>,
        owner_id: UserId,
        faculty_id: FacultyId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ProposalId::generate(),
            code: code.into(),
            title: title.into(),
            owner_id,
            faculty_id,
            state: ProjectState::Draft,
            holder_unit: None,
            holder_user: None,
            council_id: None,
            sla_started_at: None,
            sla_deadline: None,
            sla_paused_at: None,
            sla_paused_ms: 0,
            pre_pause_state: None,
            pre_pause_holder_unit: None,
            pre_pause_holder_user: None,
            pause_reason: None,
            expected_resume_at: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_paused(&self) -> bool {
        self.state == ProjectState::Paused
    }
}
