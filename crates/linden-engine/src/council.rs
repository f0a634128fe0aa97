//! Council aggregation
//!
//! Combines per-member evaluations into the consensus the transition
//! executor consumes, plus descriptive statistics for human review.
//! The consensus is never auto-derived: the council secretary finalizes
//! it explicitly, and only once every assigned member has submitted.

use chrono::{DateTime, Utc};
use linden_types::{
    Actor, Conclusion, CouncilAssignment, CouncilEvaluation, Criterion, DenialReason,
    Precondition, Role, WorkflowError, WorkflowResult, SCORE_MAX, SCORE_MIN,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Min/max/average of one criterion across submitted evaluations
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionStats {
    pub min: u8,
    pub max: u8,
    pub avg: f64,
}

/// Aggregated view of a proposal's council evaluations
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouncilAggregate {
    pub submitted_count: usize,
    pub total_members: usize,
    pub all_submitted: bool,
    pub per_criterion: BTreeMap<Criterion, CriterionStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_conclusion: Option<Conclusion>,
}

/// Aggregate submitted evaluations against the assigned roster.
///
/// Statistics cover submitted member evaluations only; drafts are
/// invisible to reviewers until their author submits them, and the
/// secretary's own sheet never counts toward completeness.
pub fn aggregate(
    assignment: &CouncilAssignment,
    evaluations: &[CouncilEvaluation],
) -> CouncilAggregate {
    let submitted: Vec<&CouncilEvaluation> = evaluations
        .iter()
        .filter(|e| e.is_submitted() && assignment.member_ids.contains(&e.evaluator_id))
        .collect();

    let total_members = assignment.member_ids.len();
    let submitted_count = submitted.len();

    let mut per_criterion = BTreeMap::new();
    for criterion in Criterion::ALL {
        let scores: Vec<u8> = submitted
            .iter()
            .filter_map(|e| e.scores.get(&criterion).copied())
            .collect();
        if scores.is_empty() {
            continue;
        }
        let min = scores.iter().copied().min().unwrap_or(SCORE_MIN);
        let max = scores.iter().copied().max().unwrap_or(SCORE_MAX);
        let avg = scores.iter().map(|s| *s as f64).sum::<f64>() / scores.len() as f64;
        per_criterion.insert(criterion, CriterionStats { min, max, avg });
    }

    CouncilAggregate {
        submitted_count,
        total_members,
        all_submitted: submitted_count >= total_members && total_members > 0,
        per_criterion,
        final_conclusion: assignment.final_conclusion,
    }
}

/// Apply a draft edit to an evaluation: merge scores, comments and the
/// evaluator's own conclusion. Submitted evaluations are immutable.
pub fn apply_update(
    evaluation: &mut CouncilEvaluation,
    scores: &BTreeMap<Criterion, u8>,
    comments: Option<String>,
    conclusion: Option<Conclusion>,
    now: DateTime<Utc>,
) -> WorkflowResult<()> {
    if evaluation.is_submitted() {
        return Err(Precondition::EvaluationNotDraft.into());
    }
    for (criterion, score) in scores {
        if *score < SCORE_MIN || *score > SCORE_MAX {
            return Err(Precondition::ScoreOutOfRange {
                criterion: *criterion,
            }
            .into());
        }
        evaluation.scores.insert(*criterion, *score);
    }
    if let Some(comments) = comments {
        evaluation.comments = comments;
    }
    if conclusion.is_some() {
        evaluation.conclusion = conclusion;
    }
    evaluation.updated_at = now;
    Ok(())
}

/// Submit an evaluation: requires a conclusion, then freezes the record.
pub fn submit_evaluation(
    evaluation: &mut CouncilEvaluation,
    now: DateTime<Utc>,
) -> WorkflowResult<()> {
    if evaluation.is_submitted() {
        return Err(Precondition::EvaluationNotDraft.into());
    }
    if evaluation.conclusion.is_none() {
        return Err(Precondition::IncompleteForm.into());
    }
    evaluation.state = linden_types::EvaluationState::Submitted;
    evaluation.updated_at = now;
    Ok(())
}

/// Record the council's consensus.
///
/// Guarded: only the assigned secretary may finalize, every member must
/// have submitted first, and finalizing twice is rejected rather than
/// silently overwritten.
pub fn finalize(
    assignment: &mut CouncilAssignment,
    evaluations: &[CouncilEvaluation],
    actor: &Actor,
    conclusion: Conclusion,
    now: DateTime<Utc>,
) -> WorkflowResult<()> {
    if actor.role != Role::ThuKyHoiDong || actor.id != assignment.secretary_id {
        return Err(WorkflowError::Denied(DenialReason::NotAssignedEvaluator));
    }
    if assignment.is_finalized() {
        return Err(Precondition::AlreadyFinalized.into());
    }

    let aggregate = aggregate(assignment, evaluations);
    if !aggregate.all_submitted {
        return Err(Precondition::EvaluationIncomplete {
            submitted: aggregate.submitted_count,
            total: aggregate.total_members,
        }
        .into());
    }

    assignment.final_conclusion = Some(conclusion);
    assignment.finalized_by = Some(actor.id.clone());
    assignment.finalized_at = Some(now);
    Ok(())
}
