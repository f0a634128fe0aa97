//! End-to-end lifecycle tests for the transition executor
//!
//! These drive the real component stack — in-memory store, idempotency
//! ledger, SLA clock, council aggregation — through full proposal
//! lifecycles.

use chrono::{Duration, Utc};
use linden_engine::{
    council, BusinessCalendar, IdempotencyLedger, InMemoryMetrics, RecordingDispatcher, SlaClock,
    SlaConfig, StateVerifier, TransitionExecutor, TransitionPayload, TransitionRequest,
};
use linden_store::{EvaluationStore, InMemoryStore, ProposalStore, WorkflowLogStore};
use linden_types::{
    Actor, Conclusion, CouncilEvaluation, CouncilId, Criterion, FacultyId, HolderUnit,
    ProjectState, Proposal, ProposalId, Role, UserId, WorkflowAction, WorkflowError,
};
use std::sync::Arc;
use uuid::Uuid;

struct Harness {
    store: Arc<InMemoryStore>,
    executor: TransitionExecutor,
    metrics: Arc<InMemoryMetrics>,
    dispatcher: Arc<RecordingDispatcher>,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let metrics = Arc::new(InMemoryMetrics::new());
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let executor = TransitionExecutor::new(
        store.clone(),
        Arc::new(IdempotencyLedger::new()),
        SlaClock::new(SlaConfig::default(), BusinessCalendar::new()),
        metrics.clone(),
        dispatcher.clone(),
    );
    Harness {
        store,
        executor,
        metrics,
        dispatcher,
    }
}

fn owner() -> Actor {
    Actor::new(UserId::new("owner-1"), "Nguyễn Văn A", Role::GiangVien)
        .with_faculty(FacultyId::new("faculty-1"))
}

fn faculty_manager() -> Actor {
    Actor::new(UserId::new("qlk-1"), "Trần Thị B", Role::QuanLyKhoa)
        .with_faculty(FacultyId::new("faculty-1"))
}

fn research_office() -> Actor {
    Actor::new(UserId::new("pkhcn-1"), "Phòng KHCN", Role::PhongKhcn)
}

fn board() -> Actor {
    Actor::new(UserId::new("bgh-1"), "Ban Giám hiệu", Role::BanGiamHoc)
}

fn request(
    proposal_id: &ProposalId,
    action: WorkflowAction,
    actor: Actor,
) -> TransitionRequest {
    TransitionRequest {
        proposal_id: proposal_id.clone(),
        action,
        actor,
        idempotency_key: Uuid::new_v4(),
        payload: TransitionPayload::default(),
    }
}

async fn seed_proposal(store: &InMemoryStore) -> Proposal {
    let proposal = Proposal::new(
        "DT-2025-041",
        "Nghiên cứu vật liệu composite",
        UserId::new("owner-1"),
        FacultyId::new("faculty-1"),
    );
    store.insert_proposal(proposal.clone()).await.unwrap();
    proposal
}

/// Drive a proposal from DRAFT into FACULTY_REVIEW.
async fn submit(h: &Harness, id: &ProposalId) {
    h.executor
        .execute(request(id, WorkflowAction::Submit, owner()))
        .await
        .unwrap();
}

#[tokio::test]
async fn faculty_approval_moves_to_school_selection() {
    let h = harness();
    let proposal = seed_proposal(&h.store).await;
    submit(&h, &proposal.id).await;

    let summary = h
        .executor
        .execute(request(&proposal.id, WorkflowAction::Approve, faculty_manager()))
        .await
        .unwrap();

    assert_eq!(summary.previous_state, ProjectState::FacultyReview);
    assert_eq!(summary.current_state, ProjectState::SchoolSelectionReview);
    assert_eq!(summary.holder_unit, Some(HolderUnit::ResearchOffice));

    let stored = h.store.get_proposal(&proposal.id).await.unwrap().unwrap();
    assert_eq!(stored.state, ProjectState::SchoolSelectionReview);
    assert_eq!(stored.holder_unit, Some(HolderUnit::ResearchOffice));

    let logs = h.store.logs_for(&proposal.id).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[1].action, WorkflowAction::Approve);
    assert_eq!(logs[1].from_state, Some(ProjectState::FacultyReview));
}

#[tokio::test]
async fn repeated_request_replays_stored_outcome() {
    let h = harness();
    let proposal = seed_proposal(&h.store).await;
    submit(&h, &proposal.id).await;

    let mut req = request(&proposal.id, WorkflowAction::Approve, faculty_manager());
    req.idempotency_key = Uuid::new_v4();

    let first = h.executor.execute(req.clone()).await.unwrap();
    let second = h.executor.execute(req.clone()).await.unwrap();
    let third = h.executor.execute(req).await.unwrap();

    // Identical responses, no re-execution
    assert_eq!(first.current_state, second.current_state);
    assert_eq!(first.timestamp, second.timestamp);
    assert_eq!(second.timestamp, third.timestamp);

    let logs = h.store.logs_for(&proposal.id).await.unwrap();
    assert_eq!(logs.len(), 2, "replays must not append log entries");

    let snapshot = h.metrics.snapshot();
    assert_eq!(snapshot.replayed, 2);
}

#[tokio::test]
async fn idempotency_key_reuse_for_different_operation_conflicts() {
    let h = harness();
    let proposal = seed_proposal(&h.store).await;

    let key = Uuid::new_v4();
    let mut submit_req = request(&proposal.id, WorkflowAction::Submit, owner());
    submit_req.idempotency_key = key;
    h.executor.execute(submit_req).await.unwrap();

    let mut approve_req = request(&proposal.id, WorkflowAction::Approve, faculty_manager());
    approve_req.idempotency_key = key;
    let err = h.executor.execute(approve_req).await.unwrap_err();
    assert!(matches!(err, WorkflowError::IdempotencyConflict { .. }));
}

#[tokio::test]
async fn denied_authorization_keeps_key_usable() {
    let h = harness();
    let proposal = seed_proposal(&h.store).await;

    let key = Uuid::new_v4();

    // Wrong actor first: denied, key released
    let mut bad = request(&proposal.id, WorkflowAction::Submit, faculty_manager());
    bad.idempotency_key = key;
    let err = h.executor.execute(bad).await.unwrap_err();
    assert_eq!(err.code(), "WRONG_ROLE");

    // Same key retried by the right actor succeeds
    let mut good = request(&proposal.id, WorkflowAction::Submit, owner());
    good.idempotency_key = key;
    let summary = h.executor.execute(good).await.unwrap();
    assert_eq!(summary.current_state, ProjectState::FacultyReview);
}

#[tokio::test]
async fn council_gate_blocks_until_finalized_pass() {
    let h = harness();
    let proposal = seed_proposal(&h.store).await;
    submit(&h, &proposal.id).await;
    h.executor
        .execute(request(&proposal.id, WorkflowAction::Approve, faculty_manager()))
        .await
        .unwrap();

    // Research office assigns a three-member council
    let mut assign = request(&proposal.id, WorkflowAction::AssignCouncil, research_office());
    let members = vec![UserId::new("m1"), UserId::new("m2"), UserId::new("m3")];
    assign.payload.council_id = Some(CouncilId::new("council-1"));
    assign.payload.council_secretary_id = Some(UserId::new("sec-1"));
    assign.payload.council_member_ids = members.clone();
    h.executor.execute(assign).await.unwrap();

    let assignment = h.store.get_assignment(&proposal.id).await.unwrap().unwrap();
    assert_eq!(assignment.member_ids, members);

    let stored = h.store.get_proposal(&proposal.id).await.unwrap().unwrap();
    assert_eq!(stored.state, ProjectState::OutlineCouncilReview);
    assert_eq!(
        stored.holder_unit,
        Some(HolderUnit::Council(CouncilId::new("council-1")))
    );

    // 2 of 3 evaluations submitted: approval is blocked
    for member in &members[..2] {
        let mut eval =
            CouncilEvaluation::draft(proposal.id.clone(), member.clone(), Utc::now());
        eval.conclusion = Some(Conclusion::Pass);
        council::submit_evaluation(&mut eval, Utc::now()).unwrap();
        h.store.upsert_evaluation(eval).await.unwrap();
    }

    let err = h
        .executor
        .execute(request(&proposal.id, WorkflowAction::Approve, board()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "EVALUATION_INCOMPLETE");

    // Third evaluation lands, but the secretary has not finalized
    let mut eval =
        CouncilEvaluation::draft(proposal.id.clone(), members[2].clone(), Utc::now());
    eval.scores.insert(Criterion::Budget, 4);
    eval.conclusion = Some(Conclusion::Pass);
    council::submit_evaluation(&mut eval, Utc::now()).unwrap();
    h.store.upsert_evaluation(eval).await.unwrap();

    let err = h
        .executor
        .execute(request(&proposal.id, WorkflowAction::Approve, board()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "CONCLUSION_PENDING");

    // Secretary finalizes a pass: approval goes through
    let mut assignment = h.store.get_assignment(&proposal.id).await.unwrap().unwrap();
    let evaluations = h.store.evaluations_for(&proposal.id).await.unwrap();
    let secretary = Actor::new(UserId::new("sec-1"), "Thư ký", Role::ThuKyHoiDong);
    council::finalize(&mut assignment, &evaluations, &secretary, Conclusion::Pass, Utc::now())
        .unwrap();
    h.store.save_assignment(assignment).await.unwrap();

    let summary = h
        .executor
        .execute(request(&proposal.id, WorkflowAction::Approve, board()))
        .await
        .unwrap();
    assert_eq!(summary.current_state, ProjectState::Approved);
}

#[tokio::test]
async fn replayed_council_assignment_never_rewrites_the_roster() {
    let h = harness();
    let proposal = seed_proposal(&h.store).await;
    submit(&h, &proposal.id).await;
    h.executor
        .execute(request(&proposal.id, WorkflowAction::Approve, faculty_manager()))
        .await
        .unwrap();

    let mut assign = request(&proposal.id, WorkflowAction::AssignCouncil, research_office());
    assign.payload.council_id = Some(CouncilId::new("council-1"));
    assign.payload.council_secretary_id = Some(UserId::new("sec-1"));
    assign.payload.council_member_ids = vec![UserId::new("m1")];
    h.executor.execute(assign.clone()).await.unwrap();

    // The lone member submits and the secretary finalizes
    let mut eval =
        CouncilEvaluation::draft(proposal.id.clone(), UserId::new("m1"), Utc::now());
    eval.conclusion = Some(Conclusion::Pass);
    council::submit_evaluation(&mut eval, Utc::now()).unwrap();
    h.store.upsert_evaluation(eval).await.unwrap();

    let mut assignment = h.store.get_assignment(&proposal.id).await.unwrap().unwrap();
    let evaluations = h.store.evaluations_for(&proposal.id).await.unwrap();
    let secretary = Actor::new(UserId::new("sec-1"), "Thư ký", Role::ThuKyHoiDong);
    council::finalize(&mut assignment, &evaluations, &secretary, Conclusion::Pass, Utc::now())
        .unwrap();
    h.store.save_assignment(assignment).await.unwrap();

    // A network retry replays the original assignment request: the
    // stored outcome comes back and the finalized roster is untouched
    let replay = h.executor.execute(assign).await.unwrap();
    assert_eq!(replay.current_state, ProjectState::OutlineCouncilReview);

    let assignment = h.store.get_assignment(&proposal.id).await.unwrap().unwrap();
    assert!(assignment.is_finalized());
}

#[tokio::test]
async fn pause_resume_conserves_deadline() {
    let h = harness();
    let proposal = seed_proposal(&h.store).await;
    submit(&h, &proposal.id).await;

    let reviewing = h.store.get_proposal(&proposal.id).await.unwrap().unwrap();
    let original_deadline = reviewing.sla_deadline.expect("review state carries an SLA");

    h.executor
        .execute(request(&proposal.id, WorkflowAction::Pause, research_office()))
        .await
        .unwrap();

    let paused = h.store.get_proposal(&proposal.id).await.unwrap().unwrap();
    assert_eq!(paused.state, ProjectState::Paused);
    assert_eq!(paused.pre_pause_state, Some(ProjectState::FacultyReview));
    assert_eq!(paused.holder_unit, Some(HolderUnit::ResearchOffice));
    assert!(paused.sla_paused_at.is_some());
    // The deadline itself freezes during the pause
    assert_eq!(paused.sla_deadline, Some(original_deadline));

    h.executor
        .execute(request(&proposal.id, WorkflowAction::Resume, research_office()))
        .await
        .unwrap();

    let resumed = h.store.get_proposal(&proposal.id).await.unwrap().unwrap();
    assert_eq!(resumed.state, ProjectState::FacultyReview);
    assert!(resumed.sla_paused_at.is_none());
    assert!(resumed.pre_pause_state.is_none());

    // Deadline moved out by exactly the paused duration
    let new_deadline = resumed.sla_deadline.unwrap();
    assert_eq!(
        new_deadline,
        original_deadline + Duration::milliseconds(resumed.sla_paused_ms)
    );
    assert!(resumed.sla_paused_ms >= 0);
}

#[tokio::test]
async fn pause_is_research_office_only() {
    let h = harness();
    let proposal = seed_proposal(&h.store).await;
    submit(&h, &proposal.id).await;

    let err = h
        .executor
        .execute(request(&proposal.id, WorkflowAction::Pause, owner()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "WRONG_ROLE");
}

#[tokio::test]
async fn cancel_requires_ownership() {
    let h = harness();
    let proposal = seed_proposal(&h.store).await;

    let stranger = Actor::new(UserId::new("other"), "Khác", Role::GiangVien);
    let err = h
        .executor
        .execute(request(&proposal.id, WorkflowAction::Cancel, stranger))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_OWNER");

    let summary = h
        .executor
        .execute(request(&proposal.id, WorkflowAction::Cancel, owner()))
        .await
        .unwrap();
    assert_eq!(summary.current_state, ProjectState::Cancelled);

    // Terminal: nothing more is possible
    let err = h
        .executor
        .execute(request(&proposal.id, WorkflowAction::Submit, owner()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "WRONG_STATE");
}

#[tokio::test]
async fn concurrent_approvals_apply_exactly_once() {
    let h = harness();
    let proposal = seed_proposal(&h.store).await;
    submit(&h, &proposal.id).await;

    let first = h
        .executor
        .execute(request(&proposal.id, WorkflowAction::Approve, faculty_manager()));
    let second = h
        .executor
        .execute(request(&proposal.id, WorkflowAction::Approve, faculty_manager()));

    let (a, b) = tokio::join!(first, second);
    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one approval may win: {a:?} / {b:?}");

    let stored = h.store.get_proposal(&proposal.id).await.unwrap().unwrap();
    assert_eq!(stored.state, ProjectState::SchoolSelectionReview);
    // One SUBMIT + one APPROVE, never two approvals
    assert_eq!(h.store.logs_for(&proposal.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn log_replay_matches_stored_state_after_full_lifecycle() {
    let h = harness();
    let proposal = seed_proposal(&h.store).await;
    submit(&h, &proposal.id).await;
    h.executor
        .execute(request(&proposal.id, WorkflowAction::Return, faculty_manager()))
        .await
        .unwrap();
    h.executor
        .execute(request(&proposal.id, WorkflowAction::Resubmit, owner()))
        .await
        .unwrap();
    h.executor
        .execute(request(&proposal.id, WorkflowAction::Approve, faculty_manager()))
        .await
        .unwrap();

    let verifier = StateVerifier::new(h.store.clone());
    let report = verifier.verify_all().await.unwrap();
    assert_eq!(report.total_proposals, 1);
    assert!(report.mismatches.is_empty());
}

#[tokio::test]
async fn notifications_are_dispatched_after_commit() {
    let h = harness();
    let proposal = seed_proposal(&h.store).await;
    submit(&h, &proposal.id).await;

    // Dispatch is fire-and-forget on a spawned task
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let notices = h.dispatcher.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].action, WorkflowAction::Submit);
    assert_eq!(notices[0].to_state, ProjectState::FacultyReview);
}

#[tokio::test]
async fn missing_proposal_is_classified() {
    let h = harness();
    let err = h
        .executor
        .execute(request(
            &ProposalId::new("ghost"),
            WorkflowAction::Submit,
            owner(),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "PROPOSAL_NOT_FOUND");
}
