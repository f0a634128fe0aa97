//! Authorization gate
//!
//! Decides whether a specific actor may invoke a specific action on a
//! specific proposal right now. Three checks, all of which must pass:
//! the edge exists from the current state, the actor's role is in the
//! edge's permitted set *in context* (a faculty manager must belong to
//! the proposal's faculty), and owner-bound actions require the actor
//! to be the owner.
//!
//! The gate runs at execution time even when the UI already filtered
//! the action menu — visibility rules are a convenience, not a
//! security boundary.

use crate::state_model;
use linden_types::{Actor, DenialReason, Proposal, Role, WorkflowAction};

/// Stateless admission check over the transition graph
#[derive(Clone, Copy, Debug, Default)]
pub struct AuthorizationGate;

impl AuthorizationGate {
    pub fn new() -> Self {
        Self
    }

    /// Allow or deny `actor` invoking `action` on `proposal`.
    ///
    /// Deny reasons are distinguishable so callers can render precise
    /// messages; they are checked in order: state, role, faculty
    /// context, ownership.
    pub fn authorize(
        &self,
        actor: &Actor,
        proposal: &Proposal,
        action: WorkflowAction,
    ) -> Result<(), DenialReason> {
        if state_model::resolve(proposal.state, action).is_none() {
            return Err(DenialReason::WrongState {
                state: proposal.state,
                action,
            });
        }

        let permitted = state_model::permitted_roles(proposal.state, action);
        if !permitted.contains(&actor.role) {
            return Err(DenialReason::WrongRole {
                role: actor.role,
                action,
            });
        }

        // Role alone is insufficient for faculty managers: they act
        // only on proposals of their own faculty.
        if actor.role == Role::QuanLyKhoa
            && actor.faculty_id.as_ref() != Some(&proposal.faculty_id)
        {
            return Err(DenialReason::WrongFaculty);
        }

        // Lecturers act only on their own proposals, whatever the
        // action: submit, resubmit, cancel, withdraw, start, handover.
        if actor.role == Role::GiangVien && actor.id != proposal.owner_id {
            return Err(DenialReason::NotOwner);
        }

        Ok(())
    }
}
