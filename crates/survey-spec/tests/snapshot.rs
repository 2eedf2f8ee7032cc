mod common;

use serde_json::json;

use common::branching_survey;
use survey_spec::{
    Action, MemorySurveyStore, Operator, QuestionType, SchemaError, SchemaSnapshot,
    build_from_accessor, build_snapshot,
};

#[test]
fn questions_follow_section_then_question_order() {
    let snapshot = build_snapshot(&branching_survey(), "en", "en");
    let order: Vec<_> = snapshot
        .ordered_questions()
        .into_iter()
        .map(|question| question.id.as_str())
        .collect();
    assert_eq!(order, vec!["q1", "q2", "q6", "q3", "q4", "q5"]);

    let q4 = snapshot.question("q4").expect("q4");
    assert_eq!(q4.kind, QuestionType::Checkbox);
    assert_eq!(q4.section, "Preferences");
    let values: Vec<_> = q4.choices.iter().map(|choice| choice.value.as_str()).collect();
    assert_eq!(values, vec!["red", "green", "blue"]);
}

#[test]
fn rules_are_grouped_by_target_in_declaration_order() {
    let snapshot = build_snapshot(&branching_survey(), "en", "en");
    let q2_rules = snapshot.rules_for("q2");
    assert_eq!(q2_rules.len(), 1);
    assert_eq!(q2_rules[0].trigger_question, "q1");
    assert_eq!(q2_rules[0].operator, Operator::Eq);
    assert_eq!(q2_rules[0].action, Action::Show);

    assert_eq!(snapshot.rules_for("q3")[0].target_choices, vec![302]);
    // the rule without a target is inert and left out
    let total: usize = snapshot.rules_by_target.values().map(Vec::len).sum();
    assert_eq!(total, 5);
    assert!(snapshot.rules_for("q1").is_empty());
}

#[test]
fn trigger_map_lists_distinct_targets() {
    let snapshot = build_snapshot(&branching_survey(), "en", "en");
    assert_eq!(
        snapshot.triggers_by_question["q1"],
        vec!["q2".to_string(), "q3".into(), "q4".into(), "q6".into()]
    );
    assert_eq!(snapshot.triggers_by_question["q2"], vec!["q5".to_string()]);
}

#[test]
fn localized_text_resolves_with_fallback() {
    let survey = branching_survey();
    let arabic = build_snapshot(&survey, "ar", "en");
    assert_eq!(arabic.title, "تشخيص الأسرة");
    // no Arabic description, falls back to English
    assert_eq!(arabic.description, "Conditional questions about your household.");
    assert_eq!(arabic.question("q1").expect("q1").choices[0].label, "نعم");
    assert_eq!(arabic.question("q4").expect("q4").text, "Which colours do you like?");

    let french = build_snapshot(&survey, "fr", "en");
    assert_eq!(french.title, "Household diagnostic");
    assert_eq!(french.locale, "fr");
}

#[test]
fn rebuilding_unchanged_data_is_identical() {
    let survey = branching_survey();
    let first = build_snapshot(&survey, "en", "en");
    let second = build_snapshot(&survey, "en", "en");
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).expect("encode"),
        serde_json::to_string(&second).expect("encode")
    );
}

#[test]
fn snapshot_serializes_with_map_names() {
    let snapshot = build_snapshot(&branching_survey(), "en", "en");
    let value = serde_json::to_value(&snapshot).expect("encode");
    assert!(value["questions_map"]["q1"]["choices"].is_array());
    assert_eq!(value["questions_map"]["q2"]["type"], "number");
    assert_eq!(value["logic_map"]["q4"][0]["action"], "limit_choices");
    assert_eq!(value["logic_map"]["q4"][0]["target_choices"], json!([401, 402]));
    assert_eq!(value["trigger_map"]["q2"], json!(["q5"]));

    let decoded: SchemaSnapshot = serde_json::from_value(value).expect("decode");
    assert_eq!(decoded, snapshot);
}

#[test]
fn accessor_reports_missing_survey() {
    let store = MemorySurveyStore::new();
    store.upsert_survey(branching_survey()).expect("store survey");
    assert_eq!(
        build_from_accessor(&store, 404, "en", "en"),
        Err(SchemaError::SurveyNotFound(404))
    );
    let snapshot = build_from_accessor(&store, 7, "en", "en").expect("snapshot");
    assert_eq!(snapshot.survey_id, 7);
}
