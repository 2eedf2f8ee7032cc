use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::survey::LocalizedText;

pub type ChoiceId = u64;

/// Closed set of question kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Text,
    Number,
    Dropdown,
    Radio,
    Checkbox,
    Date,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::Number => "number",
            QuestionType::Dropdown => "dropdown",
            QuestionType::Radio => "radio",
            QuestionType::Checkbox => "checkbox",
            QuestionType::Date => "date",
        }
    }

    /// Whether answers are drawn from the question's declared choices.
    pub fn has_choices(&self) -> bool {
        matches!(
            self,
            QuestionType::Dropdown | QuestionType::Radio | QuestionType::Checkbox
        )
    }
}

/// Optional bounds applied to an answer on top of its type check.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Constraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_len: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_len: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Choice {
    pub id: ChoiceId,
    pub label: LocalizedText,
    pub value: String,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Question {
    /// Stable identifier referenced by rules and answer sets.
    pub identifier: String,
    #[serde(default)]
    pub text: LocalizedText,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub order: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Constraint>,
}

fn default_required() -> bool {
    true
}

impl Question {
    pub fn choice(&self, id: ChoiceId) -> Option<&Choice> {
        self.choices.iter().find(|choice| choice.id == id)
    }
}
