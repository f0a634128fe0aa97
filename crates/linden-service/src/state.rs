//! Shared application state

use linden_engine::{InMemoryMetrics, SlaClock, StateVerifier, TransitionExecutor};
use linden_store::WorkflowStore;
use std::sync::Arc;

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<TransitionExecutor>,
    pub store: Arc<dyn WorkflowStore>,
    pub verifier: Arc<StateVerifier>,
    pub sla: Arc<SlaClock>,
    pub metrics: Arc<InMemoryMetrics>,
}
