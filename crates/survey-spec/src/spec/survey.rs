use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::logic::LogicRule;
use crate::spec::question::Question;

pub type SurveyId = u64;
pub type SectionId = u64;

/// Text that is either a single string or a map of locale to translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum LocalizedText {
    Plain(String),
    Translated(BTreeMap<String, String>),
}

impl Default for LocalizedText {
    fn default() -> Self {
        LocalizedText::Plain(String::new())
    }
}

impl From<&str> for LocalizedText {
    fn from(value: &str) -> Self {
        LocalizedText::Plain(value.to_string())
    }
}

impl LocalizedText {
    /// Picks the translation for `locale`, then `fallback`, then whatever exists.
    pub fn resolve(&self, locale: &str, fallback: &str) -> String {
        match self {
            LocalizedText::Plain(text) => text.clone(),
            LocalizedText::Translated(map) => map
                .get(locale)
                .or_else(|| map.get(fallback))
                .or_else(|| map.values().next())
                .cloned()
                .unwrap_or_default(),
        }
    }
}

/// An ordered group of questions inside a survey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Section {
    pub id: SectionId,
    pub title: LocalizedText,
    #[serde(default)]
    pub description: LocalizedText,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// Top-level survey document as handed over by the schema accessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Survey {
    pub id: SurveyId,
    pub title: LocalizedText,
    #[serde(default)]
    pub description: LocalizedText,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub rules: Vec<LogicRule>,
}

fn default_active() -> bool {
    true
}

impl Survey {
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.sections
            .iter()
            .flat_map(|section| section.questions.iter())
    }

    pub fn question(&self, identifier: &str) -> Option<&Question> {
        self.questions()
            .find(|question| question.identifier == identifier)
    }

    pub(crate) fn question_mut(&mut self, identifier: &str) -> Option<&mut Question> {
        self.sections
            .iter_mut()
            .flat_map(|section| section.questions.iter_mut())
            .find(|question| question.identifier == identifier)
    }
}
