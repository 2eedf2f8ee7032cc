use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Submitted values keyed by question identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AnswerSet(BTreeMap<String, Value>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, question_id: &str) -> Option<&Value> {
        self.0.get(question_id)
    }

    pub fn insert(&mut self, question_id: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(question_id.into(), value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the question has a value that counts as an answer.
    pub fn is_answered(&self, question_id: &str) -> bool {
        self.get(question_id).is_some_and(|value| !is_blank(value))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for AnswerSet {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        AnswerSet(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl TryFrom<Value> for AnswerSet {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value)
    }
}

/// `null`, `""` and `[]` do not count as answers.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Why an answer set was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    InvalidQuestionId,
    HiddenQuestionAnswered,
    WrongAnswerType,
    DisallowedChoiceValue,
    MissingRequiredAnswer,
    ConstraintViolated,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::InvalidQuestionId => "invalid-question-id",
            FailureReason::HiddenQuestionAnswered => "hidden-question-answered",
            FailureReason::WrongAnswerType => "wrong-answer-type",
            FailureReason::DisallowedChoiceValue => "disallowed-choice-value",
            FailureReason::MissingRequiredAnswer => "missing-required-answer",
            FailureReason::ConstraintViolated => "constraint-violated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationFailure {
    pub question_id: String,
    pub reason: FailureReason,
    pub message: String,
}

impl ValidationFailure {
    pub fn new(
        question_id: impl Into<String>,
        reason: FailureReason,
        message: impl Into<String>,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            reason,
            message: message.into(),
        }
    }
}

/// Outcome of validating one answer set against one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ValidationFailure>,
}

impl ValidationReport {
    pub fn from_failures(failures: Vec<ValidationFailure>) -> Self {
        Self {
            valid: failures.is_empty(),
            failures,
        }
    }

    pub fn reasons_for(&self, question_id: &str) -> Vec<FailureReason> {
        self.failures
            .iter()
            .filter(|failure| failure.question_id == question_id)
            .map(|failure| failure.reason)
            .collect()
    }

    pub fn has(&self, question_id: &str, reason: FailureReason) -> bool {
        self.failures
            .iter()
            .any(|failure| failure.question_id == question_id && failure.reason == reason)
    }
}
