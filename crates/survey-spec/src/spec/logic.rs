use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::spec::question::ChoiceId;

pub type RuleId = u64;

/// Comparison applied between the trigger answer and the rule literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Lt,
    Contains,
    /// Anything outside the closed set; never matches.
    #[serde(other)]
    Unknown,
}

/// What a satisfied rule does to its target question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Show,
    Hide,
    IncludeChoices,
    LimitChoices,
    ExcludeChoices,
    /// Unrecognized action; the rule is inert.
    #[serde(other)]
    Unknown,
}

impl Action {
    pub fn affects_choices(&self) -> bool {
        matches!(
            self,
            Action::IncludeChoices | Action::LimitChoices | Action::ExcludeChoices
        )
    }
}

/// Declarative branching rule: when `trigger <operator> value`, apply `action` to `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LogicRule {
    pub id: RuleId,
    pub trigger: String,
    pub operator: Operator,
    pub value: Value,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_choices: Vec<ChoiceId>,
}

impl LogicRule {
    pub fn references_question(&self, identifier: &str) -> bool {
        self.trigger == identifier || self.target.as_deref() == Some(identifier)
    }
}
