use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::accessor::SchemaAccessor;
use crate::answers::AnswerSet;
use crate::condition;
use crate::error::SchemaError;
use crate::spec::{
    Action, ChoiceId, Constraint, Operator, QuestionType, RuleId, Survey, SurveyId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChoiceEntry {
    pub id: ChoiceId,
    pub label: String,
    pub value: String,
}

/// Denormalized question as seen by the evaluators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuestionEntry {
    pub id: String,
    pub section: String,
    pub section_order: u32,
    /// Position in section-then-question order across the whole survey.
    pub order: usize,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub required: bool,
    #[serde(default)]
    pub choices: Vec<ChoiceEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Constraint>,
}

impl QuestionEntry {
    pub fn choice_value(&self, id: ChoiceId) -> Option<&str> {
        self.choices
            .iter()
            .find(|choice| choice.id == id)
            .map(|choice| choice.value.as_str())
    }

    pub fn declared_values(&self) -> BTreeSet<String> {
        self.choices
            .iter()
            .map(|choice| choice.value.clone())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RuleEntry {
    pub rule_id: RuleId,
    pub trigger_question: String,
    pub operator: Operator,
    pub literal: Value,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_choices: Vec<ChoiceId>,
}

impl RuleEntry {
    /// Reads the trigger answer straight from the answer set; the trigger's own
    /// visibility plays no part.
    pub fn is_satisfied(&self, answers: &AnswerSet) -> bool {
        condition::evaluate(
            answers.get(&self.trigger_question),
            self.operator,
            &self.literal,
        )
    }
}

/// Immutable, cacheable view of one survey in one locale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SchemaSnapshot {
    pub survey_id: SurveyId,
    pub locale: String,
    pub title: String,
    pub description: String,
    pub is_active: bool,
    #[serde(rename = "questions_map")]
    pub questions: BTreeMap<String, QuestionEntry>,
    /// Rules per target question, in declaration order.
    #[serde(rename = "logic_map")]
    pub rules_by_target: BTreeMap<String, Vec<RuleEntry>>,
    /// Distinct targets each trigger question can affect.
    #[serde(rename = "trigger_map")]
    pub triggers_by_question: BTreeMap<String, Vec<String>>,
}

impl SchemaSnapshot {
    pub fn question(&self, id: &str) -> Option<&QuestionEntry> {
        self.questions.get(id)
    }

    pub fn rules_for(&self, id: &str) -> &[RuleEntry] {
        self.rules_by_target
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Questions in survey order.
    pub fn ordered_questions(&self) -> Vec<&QuestionEntry> {
        let mut questions: Vec<_> = self.questions.values().collect();
        questions.sort_by_key(|question| question.order);
        questions
    }
}

/// Loads the survey through `accessor` and flattens it.
pub fn build<A>(
    accessor: &A,
    survey_id: SurveyId,
    locale: &str,
    default_locale: &str,
) -> Result<SchemaSnapshot, SchemaError>
where
    A: SchemaAccessor + ?Sized,
{
    let survey = accessor.survey(survey_id)?;
    Ok(build_snapshot(&survey, locale, default_locale))
}

#[instrument(skip_all, fields(survey_id = survey.id, locale = %locale))]
pub fn build_snapshot(survey: &Survey, locale: &str, default_locale: &str) -> SchemaSnapshot {
    let mut sections: Vec<_> = survey.sections.iter().collect();
    sections.sort_by_key(|section| section.order);

    let mut questions = BTreeMap::new();
    let mut position = 0;
    for section in sections {
        let section_title = section.title.resolve(locale, default_locale);
        let mut ordered: Vec<_> = section.questions.iter().collect();
        ordered.sort_by_key(|question| question.order);

        for question in ordered {
            let mut choices: Vec<_> = question.choices.iter().collect();
            choices.sort_by_key(|choice| choice.order);
            let entry = QuestionEntry {
                id: question.identifier.clone(),
                section: section_title.clone(),
                section_order: section.order,
                order: position,
                text: question.text.resolve(locale, default_locale),
                kind: question.kind,
                required: question.required,
                choices: choices
                    .into_iter()
                    .map(|choice| ChoiceEntry {
                        id: choice.id,
                        label: choice.label.resolve(locale, default_locale),
                        value: choice.value.clone(),
                    })
                    .collect(),
                constraint: question.constraint.clone(),
            };
            questions.insert(entry.id.clone(), entry);
            position += 1;
        }
    }

    let mut rules_by_target: BTreeMap<String, Vec<RuleEntry>> = BTreeMap::new();
    let mut triggers_by_question: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for rule in &survey.rules {
        let Some(target) = &rule.target else {
            continue;
        };

        if let Some(question) = questions.get(target) {
            for choice in &rule.target_choices {
                if question.choice_value(*choice).is_none() {
                    tracing::warn!(
                        rule_id = rule.id,
                        choice_id = choice,
                        target_question = %target,
                        "rule references a choice outside its target question"
                    );
                }
            }
        }

        rules_by_target
            .entry(target.clone())
            .or_default()
            .push(RuleEntry {
                rule_id: rule.id,
                trigger_question: rule.trigger.clone(),
                operator: rule.operator,
                literal: rule.value.clone(),
                action: rule.action,
                target_choices: rule.target_choices.clone(),
            });

        let targets = triggers_by_question.entry(rule.trigger.clone()).or_default();
        if !targets.contains(target) {
            targets.push(target.clone());
        }
    }

    tracing::debug!(
        questions = questions.len(),
        targets = rules_by_target.len(),
        "built schema snapshot"
    );

    SchemaSnapshot {
        survey_id: survey.id,
        locale: locale.to_string(),
        title: survey.title.resolve(locale, default_locale),
        description: survey.description.resolve(locale, default_locale),
        is_active: survey.is_active,
        questions,
        rules_by_target,
        triggers_by_question,
    }
}
