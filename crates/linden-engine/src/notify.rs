//! Notification dispatch
//!
//! Delivery (email, in-app) lives out of process. The executor hands a
//! [`TransitionNotice`] to the dispatcher fire-and-forget after a
//! successful commit; a slow or failing dispatcher can never block or
//! fail a transition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use linden_types::{HolderUnit, ProjectState, ProposalId, WorkflowAction};
use parking_lot::Mutex;
use serde::Serialize;

/// What happened, for the notification pipeline
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionNotice {
    pub proposal_id: ProposalId,
    pub proposal_code: String,
    pub action: WorkflowAction,
    pub from_state: ProjectState,
    pub to_state: ProjectState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder_unit: Option<HolderUnit>,
    pub timestamp: DateTime<Utc>,
}

/// Out-of-process notification boundary
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, notice: TransitionNotice);
}

/// Discards notices (default wiring until a real dispatcher is attached)
#[derive(Clone, Copy, Debug, Default)]
pub struct NullDispatcher;

#[async_trait]
impl NotificationDispatcher for NullDispatcher {
    async fn dispatch(&self, _notice: TransitionNotice) {}
}

/// Records notices for assertions in tests
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    notices: Mutex<Vec<TransitionNotice>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<TransitionNotice> {
        self.notices.lock().clone()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn dispatch(&self, notice: TransitionNotice) {
        self.notices.lock().push(notice);
    }
}
