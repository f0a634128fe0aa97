//! Linden REST service
//!
//! Thin HTTP surface over the workflow engine. Authentication is an
//! upstream concern: the gateway resolves the session and forwards the
//! actor as headers; every handler re-runs authorization through the
//! engine regardless.
//!
//! Endpoints follow the action-invocation shape
//! `POST /workflow/{proposalId}/{action}` with an `Idempotency-Key`
//! header, plus read-only queue, SLA, log and verification views.

#![deny(unsafe_code)]

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use router::create_router;
pub use state::AppState;
