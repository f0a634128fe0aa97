//! Proposal workflow engine for Linden
//!
//! The engine governs a proposal's lifecycle: role-gated state
//! transitions, an idempotent mutation protocol, SLA deadline tracking
//! that survives pauses, and council consensus preconditions.
//!
//! # Key Principle
//!
//! **All proposal mutation flows through the [`TransitionExecutor`].**
//!
//! Queue views, dashboards and the REST surface only ever read; a state
//! change is a single orchestrated protocol — authorize, check the
//! idempotency ledger, verify council preconditions, apply the edge,
//! update the SLA clock, append the audit log — committed as one unit.
//!
//! # Architecture
//!
//! The executor composes specialized components:
//!
//! - [`state_model`] — the closed transition graph with role metadata
//! - [`AuthorizationGate`] — actor/proposal/action admission decisions
//! - [`SlaClock`] — business-day deadlines with pause/resume accounting
//! - [`IdempotencyLedger`] — at-most-once execution per mutation key
//! - [`council`] — per-member evaluation aggregation and finalization
//! - [`holder`] — the single derivation of "who holds this proposal"
//! - [`StateVerifier`] — audit-log replay for drift detection/repair

#![deny(unsafe_code)]

pub mod authorization;
pub mod council;
pub mod executor;
pub mod holder;
pub mod idempotency;
pub mod metrics;
pub mod notify;
pub mod sla;
pub mod state_model;
pub mod verification;

pub use authorization::AuthorizationGate;
pub use council::{CouncilAggregate, CriterionStats};
pub use executor::{TransitionExecutor, TransitionPayload, TransitionRequest};
pub use idempotency::{BeginOutcome, IdempotencyLedger, OperationSignature};
pub use metrics::{InMemoryMetrics, MetricsSink, NoopMetrics};
pub use notify::{NotificationDispatcher, NullDispatcher, RecordingDispatcher, TransitionNotice};
pub use sla::{BusinessCalendar, SlaClock, SlaConfig, SlaStatus, SlaWindow};
pub use verification::{RepairSummary, StateMismatch, StateVerifier, VerificationReport};
