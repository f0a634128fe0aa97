//! The transition graph
//!
//! A closed table of legal edges, each tagged with the roles permitted
//! to traverse it and whether a council consensus must exist first.
//! PAUSE and RESUME are resolved dynamically: any non-terminal,
//! non-paused state can be suspended, and RESUME returns to the state
//! recorded on the proposal at pause time — the graph cannot carry that
//! edge statically.

use linden_types::{ProjectState, Role, WorkflowAction};

use ProjectState::*;
use Role::*;
use WorkflowAction::*;

/// One legal edge in the transition graph
#[derive(Clone, Copy, Debug)]
pub struct TransitionRule {
    pub from: ProjectState,
    pub action: WorkflowAction,
    pub to: ProjectState,
    /// Roles permitted to invoke this edge
    pub roles: &'static [Role],
    /// Edge requires a finalized passing council conclusion
    pub consensus: bool,
}

const fn rule(
    from: ProjectState,
    action: WorkflowAction,
    to: ProjectState,
    roles: &'static [Role],
) -> TransitionRule {
    TransitionRule {
        from,
        action,
        to,
        roles,
        consensus: false,
    }
}

const fn consensus_rule(
    from: ProjectState,
    action: WorkflowAction,
    to: ProjectState,
    roles: &'static [Role],
) -> TransitionRule {
    TransitionRule {
        from,
        action,
        to,
        roles,
        consensus: true,
    }
}

/// Valid state transitions.
///
/// SUBMITTED is an event, not a state: DRAFT goes straight to
/// FACULTY_REVIEW and the log records `SUBMIT`.
pub const RULES: &[TransitionRule] = &[
    // Phase A: submission and reviews
    rule(Draft, Submit, FacultyReview, &[GiangVien]),
    rule(FacultyReview, Approve, SchoolSelectionReview, &[QuanLyKhoa]),
    rule(FacultyReview, Return, ChangesRequested, &[QuanLyKhoa]),
    rule(FacultyReview, Reject, Rejected, &[QuanLyKhoa, BanGiamHoc]),
    rule(SchoolSelectionReview, AssignCouncil, OutlineCouncilReview, &[PhongKhcn]),
    rule(SchoolSelectionReview, Return, ChangesRequested, &[PhongKhcn]),
    consensus_rule(OutlineCouncilReview, Approve, Approved, &[BanGiamHoc]),
    rule(OutlineCouncilReview, Return, ChangesRequested, &[ThuKyHoiDong, BanGiamHoc]),
    rule(OutlineCouncilReview, Reject, Rejected, &[BanGiamHoc]),

    // Phase B: revision loop and execution
    rule(ChangesRequested, Resubmit, FacultyReview, &[GiangVien]),
    rule(ChangesRequested, Reject, Rejected, &[QuanLyKhoa, BanGiamHoc]),
    rule(Approved, StartProject, InProgress, &[GiangVien, PhongKhcn]),

    // Phase C: acceptance and handover
    rule(InProgress, SubmitAcceptance, FacultyAcceptanceReview, &[GiangVien]),
    rule(FacultyAcceptanceReview, FacultyAccept, SchoolAcceptanceReview, &[QuanLyKhoa]),
    rule(FacultyAcceptanceReview, Return, ChangesRequested, &[QuanLyKhoa]),
    consensus_rule(SchoolAcceptanceReview, Accept, Handover, &[PhongKhcn, BanGiamHoc]),
    rule(SchoolAcceptanceReview, Return, ChangesRequested, &[PhongKhcn, BanGiamHoc]),
    rule(Handover, HandoverComplete, Completed, &[GiangVien, PhongKhcn]),

    // Exception exits
    rule(Draft, Cancel, Cancelled, &[GiangVien]),
    rule(Paused, Cancel, Cancelled, &[GiangVien]),
    rule(FacultyReview, Withdraw, Withdrawn, &[GiangVien]),
    rule(SchoolSelectionReview, Withdraw, Withdrawn, &[GiangVien]),
    rule(OutlineCouncilReview, Withdraw, Withdrawn, &[GiangVien]),
    rule(ChangesRequested, Withdraw, Withdrawn, &[GiangVien]),
];

/// Only the research office may suspend and resume proposals.
pub const PAUSE_ROLES: &[Role] = &[PhongKhcn];

/// Where a legal transition lands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// A fixed target state from the graph
    Fixed(ProjectState),
    /// RESUME: the target is the proposal's recorded pre-pause state
    PrePause,
}

/// Look up the static edge for (from, action), if one exists.
pub fn rule_for(from: ProjectState, action: WorkflowAction) -> Option<&'static TransitionRule> {
    RULES
        .iter()
        .find(|r| r.from == from && r.action == action)
}

/// Resolve the target of an action from a state. Pure: no proposal
/// data, no I/O. Returns `None` when the action is not legal here.
pub fn resolve(from: ProjectState, action: WorkflowAction) -> Option<Resolution> {
    match action {
        Pause if from.is_pausable() => Some(Resolution::Fixed(Paused)),
        Pause => None,
        Resume if from == Paused => Some(Resolution::PrePause),
        Resume => None,
        _ => rule_for(from, action).map(|r| Resolution::Fixed(r.to)),
    }
}

/// Roles permitted to invoke `action` from `from`. Empty when the
/// action is not legal from that state.
pub fn permitted_roles(from: ProjectState, action: WorkflowAction) -> &'static [Role] {
    match action {
        Pause if from.is_pausable() => PAUSE_ROLES,
        Resume if from == Paused => PAUSE_ROLES,
        Pause | Resume => &[],
        _ => rule_for(from, action).map(|r| r.roles).unwrap_or(&[]),
    }
}

/// Whether this edge is gated on a finalized council consensus.
pub fn requires_consensus(from: ProjectState, action: WorkflowAction) -> bool {
    rule_for(from, action).map(|r| r.consensus).unwrap_or(false)
}

/// Combined check: is `action` legal from `from` for `role`, and if
/// so where does it lead?
pub fn can_transition(
    from: ProjectState,
    action: WorkflowAction,
    role: Role,
) -> Option<Resolution> {
    let resolution = resolve(from, action)?;
    if permitted_roles(from, action).contains(&role) {
        Some(resolution)
    } else {
        None
    }
}

/// All actions legal from a state, regardless of role. Drives the
/// action menus in queue views; authorization still re-checks at
/// execution time.
pub fn actions_from(from: ProjectState) -> Vec<WorkflowAction> {
    let mut actions: Vec<WorkflowAction> = RULES
        .iter()
        .filter(|r| r.from == from)
        .map(|r| r.action)
        .collect();
    if from.is_pausable() {
        actions.push(Pause);
    }
    if from == Paused {
        actions.push(Resume);
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_chain() {
        let chain = [
            (Draft, Submit, FacultyReview),
            (FacultyReview, Approve, SchoolSelectionReview),
            (SchoolSelectionReview, AssignCouncil, OutlineCouncilReview),
            (OutlineCouncilReview, Approve, Approved),
            (Approved, StartProject, InProgress),
            (InProgress, SubmitAcceptance, FacultyAcceptanceReview),
            (FacultyAcceptanceReview, FacultyAccept, SchoolAcceptanceReview),
            (SchoolAcceptanceReview, Accept, Handover),
            (Handover, HandoverComplete, Completed),
        ];
        for (from, action, to) in chain {
            assert_eq!(
                resolve(from, action),
                Some(Resolution::Fixed(to)),
                "{from} --{action}--> {to}"
            );
        }
    }

    #[test]
    fn test_undefined_action_is_denied() {
        assert_eq!(resolve(Draft, Approve), None);
        assert_eq!(resolve(Completed, Submit), None);
        assert_eq!(resolve(InProgress, Accept), None);
    }

    #[test]
    fn test_terminal_states_are_closed() {
        for state in [Completed, Cancelled, Withdrawn, Rejected] {
            assert!(actions_from(state).is_empty(), "{state} must be closed");
        }
    }

    #[test]
    fn test_pause_from_any_non_terminal() {
        for state in [
            Draft,
            FacultyReview,
            SchoolSelectionReview,
            OutlineCouncilReview,
            Approved,
            InProgress,
            FacultyAcceptanceReview,
            SchoolAcceptanceReview,
            Handover,
            ChangesRequested,
        ] {
            assert_eq!(resolve(state, Pause), Some(Resolution::Fixed(Paused)));
        }
        assert_eq!(resolve(Paused, Pause), None);
        assert_eq!(resolve(Completed, Pause), None);
    }

    #[test]
    fn test_resume_is_dynamic() {
        assert_eq!(resolve(Paused, Resume), Some(Resolution::PrePause));
        assert_eq!(resolve(FacultyReview, Resume), None);
    }

    #[test]
    fn test_role_gating() {
        assert!(can_transition(FacultyReview, Approve, QuanLyKhoa).is_some());
        assert!(can_transition(FacultyReview, Approve, GiangVien).is_none());
        assert!(can_transition(Draft, Submit, GiangVien).is_some());
        assert!(can_transition(Draft, Submit, PhongKhcn).is_none());
        assert!(can_transition(InProgress, Pause, PhongKhcn).is_some());
        assert!(can_transition(InProgress, Pause, BanGiamHoc).is_none());
    }

    #[test]
    fn test_consensus_edges() {
        assert!(requires_consensus(OutlineCouncilReview, Approve));
        assert!(requires_consensus(SchoolAcceptanceReview, Accept));
        assert!(!requires_consensus(FacultyReview, Approve));
        assert!(!requires_consensus(OutlineCouncilReview, Return));
    }

    #[test]
    fn test_rules_never_leave_a_terminal_state() {
        for rule in RULES {
            assert!(!rule.from.is_terminal(), "{:?} leaves a terminal state", rule);
            assert!(!rule.roles.is_empty(), "{:?} has no permitted roles", rule);
        }
    }

    #[test]
    fn test_withdraw_only_during_review() {
        assert!(resolve(FacultyReview, Withdraw).is_some());
        assert!(resolve(ChangesRequested, Withdraw).is_some());
        assert!(resolve(InProgress, Withdraw).is_none());
        assert!(resolve(Handover, Withdraw).is_none());
    }
}
