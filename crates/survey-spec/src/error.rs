use thiserror::Error;

use crate::spec::{ChoiceId, RuleId, SectionId, SurveyId};

/// Failures raised by schema lookups and store writes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("survey {0} does not exist")]
    SurveyNotFound(SurveyId),
    #[error("section {0} does not exist")]
    SectionNotFound(SectionId),
    #[error("question '{0}' does not exist")]
    QuestionNotFound(String),
    #[error("choice {0} does not exist")]
    ChoiceNotFound(ChoiceId),
    #[error("rule {0} does not exist")]
    RuleNotFound(RuleId),
    #[error("question '{0}' does not offer choices")]
    NotChoiceQuestion(String),
    #[error("question identifier '{0}' is declared more than once")]
    DuplicateQuestionIdentifier(String),
    #[error("question '{question}' declares choice value '{value}' more than once")]
    DuplicateChoiceValue { question: String, value: String },
    #[error("rule {rule} targets choice {choice} outside its target question")]
    ForeignChoice { rule: RuleId, choice: ChoiceId },
}

/// Failures of the snapshot store backing the schema cache.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("snapshot store unavailable: {0}")]
    Unavailable(String),
}
