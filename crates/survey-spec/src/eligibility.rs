use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value;

use crate::answers::AnswerSet;
use crate::condition::canonical;
use crate::error::SchemaError;
use crate::snapshot::{QuestionEntry, RuleEntry, SchemaSnapshot};
use crate::spec::Action;
use crate::visibility::EvaluationPass;

/// Choice values currently legal for a choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ChoiceEligibility {
    pub allowed: BTreeSet<String>,
    /// False when no choice rule matched; the declared set then stands unenforced.
    pub rule_applied: bool,
}

impl ChoiceEligibility {
    pub fn permits(&self, value: &str) -> bool {
        !self.rule_applied || self.allowed.contains(value)
    }
}

/// Folds the target question's rules, in declaration order, over its declared values.
///
/// The first satisfied `limit_choices` rule clears the set; it and every later
/// limit rule add their targets. `include_choices` adds and `exclude_choices`
/// removes. Choice ids that do not belong to the question are skipped.
pub fn resolve_choices(
    question: &QuestionEntry,
    rules: &[RuleEntry],
    answers: &AnswerSet,
) -> ChoiceEligibility {
    let mut allowed = question.declared_values();
    let mut rule_applied = false;
    let mut limited = false;

    for rule in rules {
        if !rule.action.affects_choices() || !rule.is_satisfied(answers) {
            continue;
        }
        let targets = rule
            .target_choices
            .iter()
            .filter_map(|id| question.choice_value(*id))
            .map(str::to_string);

        match rule.action {
            Action::LimitChoices => {
                if !limited {
                    allowed.clear();
                    limited = true;
                }
                allowed.extend(targets);
            }
            Action::IncludeChoices => allowed.extend(targets),
            Action::ExcludeChoices => {
                for value in targets {
                    allowed.remove(&value);
                }
            }
            _ => continue,
        }
        rule_applied = true;
    }

    ChoiceEligibility {
        allowed,
        rule_applied,
    }
}

/// Values carried by one submitted answer; checkbox lists yield one per item.
pub fn submitted_values(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().map(canonical).collect(),
        other => vec![canonical(other)],
    }
}

impl EvaluationPass<'_> {
    /// `None` for unknown questions and for questions without choices.
    pub fn allowed_values(&mut self, question_id: &str) -> Option<&ChoiceEligibility> {
        let question = self
            .snapshot
            .question(question_id)
            .filter(|question| question.kind.has_choices())?;

        if !self.eligibility.contains_key(question_id) {
            let resolved = resolve_choices(
                question,
                self.snapshot.rules_for(question_id),
                self.answers,
            );
            self.eligibility.insert(question_id.to_string(), resolved);
        }
        self.eligibility.get(question_id)
    }
}

pub fn allowed_values(
    snapshot: &SchemaSnapshot,
    answers: &AnswerSet,
    question_id: &str,
) -> Result<ChoiceEligibility, SchemaError> {
    let question = snapshot
        .question(question_id)
        .ok_or_else(|| SchemaError::QuestionNotFound(question_id.to_string()))?;
    if !question.kind.has_choices() {
        return Err(SchemaError::NotChoiceQuestion(question_id.to_string()));
    }
    Ok(resolve_choices(
        question,
        snapshot.rules_for(question_id),
        answers,
    ))
}
