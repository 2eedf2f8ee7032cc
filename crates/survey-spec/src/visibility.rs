use std::collections::{BTreeMap, HashMap};

use crate::answers::AnswerSet;
use crate::eligibility::ChoiceEligibility;
use crate::snapshot::{RuleEntry, SchemaSnapshot};
use crate::spec::Action;

pub type VisibilityMap = BTreeMap<String, bool>;

/// Memo for one evaluation of one answer set against one snapshot.
///
/// Never share a pass between answer sets: every cached decision depends on
/// the answers it was computed from.
pub struct EvaluationPass<'a> {
    pub(crate) snapshot: &'a SchemaSnapshot,
    pub(crate) answers: &'a AnswerSet,
    visibility: HashMap<String, bool>,
    pub(crate) eligibility: HashMap<String, ChoiceEligibility>,
}

impl<'a> EvaluationPass<'a> {
    pub fn new(snapshot: &'a SchemaSnapshot, answers: &'a AnswerSet) -> Self {
        Self {
            snapshot,
            answers,
            visibility: HashMap::new(),
            eligibility: HashMap::new(),
        }
    }

    pub fn snapshot(&self) -> &'a SchemaSnapshot {
        self.snapshot
    }

    pub fn answers(&self) -> &'a AnswerSet {
        self.answers
    }

    pub fn is_visible(&mut self, question_id: &str) -> bool {
        if let Some(visible) = self.visibility.get(question_id) {
            return *visible;
        }
        let visible = resolve_rules(self.snapshot.rules_for(question_id), self.answers);
        self.visibility.insert(question_id.to_string(), visible);
        visible
    }

    pub fn visibility_map(&mut self) -> VisibilityMap {
        let snapshot = self.snapshot;
        snapshot
            .questions
            .keys()
            .map(|id| (id.clone(), self.is_visible(id)))
            .collect()
    }
}

/// `visible = (has show rules ? any show matched : true) && !any hide matched`
fn resolve_rules(rules: &[RuleEntry], answers: &AnswerSet) -> bool {
    let mut has_show_rules = false;
    let mut show_matched = false;
    let mut hide_matched = false;

    for rule in rules {
        match rule.action {
            Action::Show => {
                has_show_rules = true;
                if !show_matched && rule.is_satisfied(answers) {
                    show_matched = true;
                }
            }
            Action::Hide => {
                if !hide_matched && rule.is_satisfied(answers) {
                    hide_matched = true;
                }
            }
            _ => {}
        }
    }

    (show_matched || !has_show_rules) && !hide_matched
}

pub fn is_visible(snapshot: &SchemaSnapshot, answers: &AnswerSet, question_id: &str) -> bool {
    EvaluationPass::new(snapshot, answers).is_visible(question_id)
}

pub fn resolve_visibility(snapshot: &SchemaSnapshot, answers: &AnswerSet) -> VisibilityMap {
    EvaluationPass::new(snapshot, answers).visibility_map()
}
