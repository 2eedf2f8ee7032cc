#![allow(missing_docs)]

pub mod accessor;
pub mod answers;
pub mod answers_schema;
pub mod cache;
pub mod condition;
pub mod eligibility;
pub mod error;
pub mod progress;
pub mod snapshot;
pub mod spec;
pub mod validate;
pub mod visibility;

pub use accessor::{MemorySurveyStore, SchemaAccessor, check_integrity};
pub use answers::{AnswerSet, FailureReason, ValidationFailure, ValidationReport};
pub use answers_schema::generate as answers_schema;
pub use cache::{
    CacheConfig, CacheKey, CacheStats, MemorySnapshotStore, SchemaCache, SnapshotStore,
};
pub use condition::evaluate;
pub use eligibility::{ChoiceEligibility, allowed_values, resolve_choices};
pub use error::{CacheError, SchemaError};
pub use progress::{Progress, next_question, progress};
pub use snapshot::{
    ChoiceEntry, QuestionEntry, RuleEntry, SchemaSnapshot, build as build_from_accessor,
    build_snapshot,
};
pub use spec::{
    Action, Choice, ChoiceId, Constraint, LocalizedText, LogicRule, Operator, Question,
    QuestionType, Section, Survey, SurveyId,
};
pub use validate::{ValidationMode, validate};
pub use visibility::{EvaluationPass, VisibilityMap, is_visible, resolve_visibility};
