use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::answers::{
    AnswerSet, FailureReason, ValidationFailure, ValidationReport, is_blank,
};
use crate::eligibility::submitted_values;
use crate::snapshot::{QuestionEntry, SchemaSnapshot};
use crate::spec::{Constraint, QuestionType};
use crate::visibility::EvaluationPass;

/// `Partial` checks what was submitted; `Complete` also demands every visible
/// required question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    #[default]
    Partial,
    Complete,
}

#[instrument(skip_all, fields(survey_id = snapshot.survey_id, answers = answers.len(), mode = ?mode))]
pub fn validate(
    snapshot: &SchemaSnapshot,
    answers: &AnswerSet,
    mode: ValidationMode,
) -> ValidationReport {
    let mut pass = EvaluationPass::new(snapshot, answers);
    let mut failures = Vec::new();

    for (question_id, value) in answers.iter() {
        let Some(question) = snapshot.question(question_id) else {
            failures.push(ValidationFailure::new(
                question_id,
                FailureReason::InvalidQuestionId,
                format!("invalid question id: {question_id}"),
            ));
            continue;
        };
        if is_blank(value) {
            continue;
        }

        if !pass.is_visible(question_id) {
            failures.push(ValidationFailure::new(
                question_id,
                FailureReason::HiddenQuestionAnswered,
                format!("question {question_id} is hidden and should not be answered"),
            ));
            continue;
        }

        if !matches_type(question.kind, value) {
            failures.push(ValidationFailure::new(
                question_id,
                FailureReason::WrongAnswerType,
                format!(
                    "answer for question {question_id} is not of type {}",
                    question.kind.as_str()
                ),
            ));
            continue;
        }

        if let Some(constraint) = &question.constraint
            && let Some(failure) = enforce_constraint(question, value, constraint)
        {
            failures.push(failure);
        }

        if let Some(eligibility) = pass.allowed_values(question_id) {
            for submitted in submitted_values(value) {
                if !eligibility.permits(&submitted) {
                    failures.push(ValidationFailure::new(
                        question_id,
                        FailureReason::DisallowedChoiceValue,
                        format!("invalid choice '{submitted}' for question {question_id}"),
                    ));
                }
            }
        }
    }

    if mode == ValidationMode::Complete {
        for question in snapshot.ordered_questions() {
            if question.required
                && !answers.is_answered(&question.id)
                && pass.is_visible(&question.id)
            {
                failures.push(ValidationFailure::new(
                    &question.id,
                    FailureReason::MissingRequiredAnswer,
                    format!("question {} is required and has not been answered", question.id),
                ));
            }
        }
    }

    tracing::debug!(failures = failures.len(), "validated answer set");
    ValidationReport::from_failures(failures)
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

pub fn matches_type(kind: QuestionType, value: &Value) -> bool {
    match kind {
        QuestionType::Text => value.is_string(),
        QuestionType::Number => as_number(value).is_some(),
        QuestionType::Dropdown | QuestionType::Radio => is_scalar(value),
        QuestionType::Checkbox => value
            .as_array()
            .is_some_and(|items| items.iter().all(is_scalar)),
        QuestionType::Date => value
            .as_str()
            .is_some_and(|text| NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()),
    }
}

fn enforce_constraint(
    question: &QuestionEntry,
    value: &Value,
    constraint: &Constraint,
) -> Option<ValidationFailure> {
    if let Some(pattern) = &constraint.pattern
        && let Some(text) = value.as_str()
        && let Ok(regex) = Regex::new(pattern)
        && !regex.is_match(text)
    {
        return Some(violation(question, "value does not match pattern"));
    }

    if let Some(min_len) = constraint.min_len
        && let Some(text) = value.as_str()
        && text.chars().count() < min_len
    {
        return Some(violation(question, "text shorter than min length"));
    }

    if let Some(max_len) = constraint.max_len
        && let Some(text) = value.as_str()
        && text.chars().count() > max_len
    {
        return Some(violation(question, "text longer than max length"));
    }

    if question.kind == QuestionType::Number {
        let number = as_number(value)?;
        if let Some(min) = constraint.min
            && number < min
        {
            return Some(violation(question, "value below minimum"));
        }
        if let Some(max) = constraint.max
            && number > max
        {
            return Some(violation(question, "value above maximum"));
        }
    }

    None
}

fn violation(question: &QuestionEntry, message: &str) -> ValidationFailure {
    ValidationFailure::new(
        &question.id,
        FailureReason::ConstraintViolated,
        format!("{message} for question {}", question.id),
    )
}
