use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use crate::cache::SchemaCache;
use crate::error::SchemaError;
use crate::spec::{
    Choice, ChoiceId, LogicRule, Question, RuleId, Section, SectionId, Survey, SurveyId,
};

/// Source of survey documents for snapshot construction.
pub trait SchemaAccessor {
    fn survey(&self, survey_id: SurveyId) -> Result<Survey, SchemaError>;
}

impl<T: SchemaAccessor + ?Sized> SchemaAccessor for Arc<T> {
    fn survey(&self, survey_id: SurveyId) -> Result<Survey, SchemaError> {
        (**self).survey(survey_id)
    }
}

/// In-memory survey persistence.
///
/// Every committed write calls [`SchemaCache::invalidate`] on the attached
/// cache before returning, so the next snapshot request rebuilds.
#[derive(Default)]
pub struct MemorySurveyStore {
    surveys: RwLock<HashMap<SurveyId, Survey>>,
    cache: Option<Arc<SchemaCache>>,
}

impl SchemaAccessor for MemorySurveyStore {
    fn survey(&self, survey_id: SurveyId) -> Result<Survey, SchemaError> {
        let surveys = self.surveys.read().unwrap_or_else(PoisonError::into_inner);
        surveys
            .get(&survey_id)
            .cloned()
            .ok_or(SchemaError::SurveyNotFound(survey_id))
    }
}

impl MemorySurveyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(cache: Arc<SchemaCache>) -> Self {
        Self {
            surveys: RwLock::default(),
            cache: Some(cache),
        }
    }

    pub fn upsert_survey(&self, survey: Survey) -> Result<(), SchemaError> {
        check_integrity(&survey)?;
        let survey_id = survey.id;
        {
            let mut surveys = self.surveys.write().unwrap_or_else(PoisonError::into_inner);
            surveys.insert(survey_id, survey);
        }
        self.invalidate(survey_id);
        Ok(())
    }

    pub fn remove_survey(&self, survey_id: SurveyId) -> Result<Survey, SchemaError> {
        let removed = {
            let mut surveys = self.surveys.write().unwrap_or_else(PoisonError::into_inner);
            surveys
                .remove(&survey_id)
                .ok_or(SchemaError::SurveyNotFound(survey_id))?
        };
        self.invalidate(survey_id);
        Ok(removed)
    }

    pub fn upsert_section(&self, survey_id: SurveyId, section: Section) -> Result<(), SchemaError> {
        self.mutate(survey_id, |survey| {
            match survey.sections.iter_mut().find(|s| s.id == section.id) {
                Some(existing) => *existing = section,
                None => survey.sections.push(section),
            }
            Ok(())
        })
    }

    /// Removes the section and, with its questions, every rule touching them.
    pub fn remove_section(
        &self,
        survey_id: SurveyId,
        section_id: SectionId,
    ) -> Result<(), SchemaError> {
        self.mutate(survey_id, |survey| {
            let index = survey
                .sections
                .iter()
                .position(|section| section.id == section_id)
                .ok_or(SchemaError::SectionNotFound(section_id))?;
            let section = survey.sections.remove(index);
            for question in &section.questions {
                drop_rules_for(survey, &question.identifier);
            }
            Ok(())
        })
    }

    /// Inserts or replaces (by identifier) a question inside `section_id`.
    pub fn upsert_question(
        &self,
        survey_id: SurveyId,
        section_id: SectionId,
        question: Question,
    ) -> Result<(), SchemaError> {
        self.mutate(survey_id, |survey| {
            if let Some(owner) = survey
                .sections
                .iter_mut()
                .find(|section| section.questions.iter().any(|q| q.identifier == question.identifier))
                && owner.id != section_id
            {
                owner.questions.retain(|q| q.identifier != question.identifier);
            }
            let section = survey
                .sections
                .iter_mut()
                .find(|section| section.id == section_id)
                .ok_or(SchemaError::SectionNotFound(section_id))?;
            match section
                .questions
                .iter_mut()
                .find(|q| q.identifier == question.identifier)
            {
                Some(existing) => *existing = question,
                None => section.questions.push(question),
            }
            Ok(())
        })
    }

    /// Removes the question and every rule that triggers on or targets it.
    pub fn remove_question(&self, survey_id: SurveyId, identifier: &str) -> Result<(), SchemaError> {
        self.mutate(survey_id, |survey| {
            let mut found = false;
            for section in &mut survey.sections {
                let before = section.questions.len();
                section.questions.retain(|q| q.identifier != identifier);
                found |= section.questions.len() != before;
            }
            if !found {
                return Err(SchemaError::QuestionNotFound(identifier.to_string()));
            }
            drop_rules_for(survey, identifier);
            Ok(())
        })
    }

    pub fn upsert_choice(
        &self,
        survey_id: SurveyId,
        question_id: &str,
        choice: Choice,
    ) -> Result<(), SchemaError> {
        self.mutate(survey_id, |survey| {
            let question = survey
                .question_mut(question_id)
                .ok_or_else(|| SchemaError::QuestionNotFound(question_id.to_string()))?;
            match question.choices.iter_mut().find(|c| c.id == choice.id) {
                Some(existing) => *existing = choice,
                None => question.choices.push(choice),
            }
            Ok(())
        })
    }

    /// Removes the choice and its membership in the target sets of rules
    /// aimed at the same question.
    pub fn remove_choice(
        &self,
        survey_id: SurveyId,
        question_id: &str,
        choice_id: ChoiceId,
    ) -> Result<(), SchemaError> {
        self.mutate(survey_id, |survey| {
            let question = survey
                .question_mut(question_id)
                .ok_or_else(|| SchemaError::QuestionNotFound(question_id.to_string()))?;
            let before = question.choices.len();
            question.choices.retain(|choice| choice.id != choice_id);
            if question.choices.len() == before {
                return Err(SchemaError::ChoiceNotFound(choice_id));
            }
            for rule in survey
                .rules
                .iter_mut()
                .filter(|rule| rule.target.as_deref() == Some(question_id))
            {
                rule.target_choices.retain(|id| *id != choice_id);
            }
            Ok(())
        })
    }

    pub fn upsert_rule(&self, survey_id: SurveyId, rule: LogicRule) -> Result<(), SchemaError> {
        self.mutate(survey_id, |survey| {
            if survey.question(&rule.trigger).is_none() {
                return Err(SchemaError::QuestionNotFound(rule.trigger.clone()));
            }
            if let Some(target) = &rule.target
                && survey.question(target).is_none()
            {
                return Err(SchemaError::QuestionNotFound(target.clone()));
            }
            match survey.rules.iter_mut().find(|r| r.id == rule.id) {
                Some(existing) => *existing = rule,
                None => survey.rules.push(rule),
            }
            Ok(())
        })
    }

    pub fn remove_rule(&self, survey_id: SurveyId, rule_id: RuleId) -> Result<(), SchemaError> {
        self.mutate(survey_id, |survey| {
            let before = survey.rules.len();
            survey.rules.retain(|rule| rule.id != rule_id);
            if survey.rules.len() == before {
                return Err(SchemaError::RuleNotFound(rule_id));
            }
            Ok(())
        })
    }

    /// Replaces a rule's target-choice membership.
    pub fn set_rule_choices(
        &self,
        survey_id: SurveyId,
        rule_id: RuleId,
        choices: Vec<ChoiceId>,
    ) -> Result<(), SchemaError> {
        self.mutate(survey_id, |survey| {
            let rule = survey
                .rules
                .iter_mut()
                .find(|rule| rule.id == rule_id)
                .ok_or(SchemaError::RuleNotFound(rule_id))?;
            rule.target_choices = choices;
            Ok(())
        })
    }

    /// Applies `change` to a working copy and commits it only if the result
    /// passes the integrity checks.
    fn mutate<F>(&self, survey_id: SurveyId, change: F) -> Result<(), SchemaError>
    where
        F: FnOnce(&mut Survey) -> Result<(), SchemaError>,
    {
        {
            let mut surveys = self.surveys.write().unwrap_or_else(PoisonError::into_inner);
            let current = surveys
                .get(&survey_id)
                .ok_or(SchemaError::SurveyNotFound(survey_id))?;
            let mut updated = current.clone();
            change(&mut updated)?;
            check_integrity(&updated)?;
            surveys.insert(survey_id, updated);
        }
        self.invalidate(survey_id);
        Ok(())
    }

    fn invalidate(&self, survey_id: SurveyId) {
        if let Some(cache) = &self.cache {
            cache.invalidate(survey_id);
        }
    }
}

fn drop_rules_for(survey: &mut Survey, identifier: &str) {
    let before = survey.rules.len();
    survey
        .rules
        .retain(|rule| !rule.references_question(identifier));
    let dropped = before - survey.rules.len();
    if dropped > 0 {
        tracing::debug!(
            survey_id = survey.id,
            question = identifier,
            dropped,
            "cascaded rule deletion"
        );
    }
}

/// Authoring-time checks: unique question identifiers, unique choice values
/// per question, and rule target choices drawn only from the rule's target
/// question.
pub fn check_integrity(survey: &Survey) -> Result<(), SchemaError> {
    let mut identifiers = BTreeSet::new();
    for question in survey.questions() {
        if !identifiers.insert(question.identifier.as_str()) {
            return Err(SchemaError::DuplicateQuestionIdentifier(
                question.identifier.clone(),
            ));
        }
        let mut seen = BTreeSet::new();
        for choice in &question.choices {
            if !seen.insert(choice.value.as_str()) {
                return Err(SchemaError::DuplicateChoiceValue {
                    question: question.identifier.clone(),
                    value: choice.value.clone(),
                });
            }
        }
    }

    for rule in &survey.rules {
        let target = rule.target.as_deref().and_then(|id| survey.question(id));
        for choice in &rule.target_choices {
            if !target.is_some_and(|question| question.choice(*choice).is_some()) {
                return Err(SchemaError::ForeignChoice {
                    rule: rule.id,
                    choice: *choice,
                });
            }
        }
    }

    Ok(())
}
