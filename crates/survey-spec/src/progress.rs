use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::answers::AnswerSet;
use crate::snapshot::SchemaSnapshot;
use crate::visibility::EvaluationPass;

/// Completion counters over the currently visible questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Progress {
    pub answered: usize,
    pub total: usize,
    /// Two-decimal percentage; 100 when nothing is visible.
    pub percent: f64,
}

pub fn progress(snapshot: &SchemaSnapshot, answers: &AnswerSet) -> Progress {
    let mut pass = EvaluationPass::new(snapshot, answers);
    let mut answered = 0;
    let mut total = 0;
    for question in snapshot.ordered_questions() {
        if !pass.is_visible(&question.id) {
            continue;
        }
        total += 1;
        if answers.is_answered(&question.id) {
            answered += 1;
        }
    }

    let percent = if total == 0 {
        100.0
    } else {
        (answered as f64 * 10_000.0 / total as f64).round() / 100.0
    };

    Progress {
        answered,
        total,
        percent,
    }
}

/// First visible question, in survey order, still lacking an answer.
pub fn next_question(snapshot: &SchemaSnapshot, answers: &AnswerSet) -> Option<String> {
    let mut pass = EvaluationPass::new(snapshot, answers);
    snapshot
        .ordered_questions()
        .into_iter()
        .find(|question| !answers.is_answered(&question.id) && pass.is_visible(&question.id))
        .map(|question| question.id.clone())
}
