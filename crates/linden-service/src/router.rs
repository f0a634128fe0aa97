//! API router configuration

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health and metrics
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::get_metrics))
        // Proposals
        .route("/proposals", post(handlers::create_proposal))
        .route("/proposals/:id", get(handlers::get_proposal))
        // Workflow queries
        .route("/workflow/queue", get(handlers::get_queue))
        .route("/workflow/verify", post(handlers::verify_states))
        .route("/workflow/verify/repair", post(handlers::repair_states))
        .route("/workflow/:proposal_id/logs", get(handlers::get_logs))
        .route("/workflow/:proposal_id/sla", get(handlers::get_sla))
        // The action endpoint: POST /workflow/{proposalId}/{action}
        .route("/workflow/:proposal_id/:action", post(handlers::execute_action))
        // Council evaluations
        .route(
            "/evaluations/:proposal_id",
            get(handlers::get_or_create_evaluation),
        )
        .route("/evaluations/:proposal_id", patch(handlers::update_evaluation))
        .route(
            "/evaluations/:proposal_id/submit",
            post(handlers::submit_evaluation),
        )
        .route(
            "/evaluations/:proposal_id/finalize",
            post(handlers::finalize_conclusion),
        )
        .route(
            "/evaluations/:proposal_id/aggregate",
            get(handlers::get_aggregate),
        )
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
