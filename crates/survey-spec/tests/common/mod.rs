#![allow(dead_code)]

use serde_json::{Value, json};

use survey_spec::{AnswerSet, SchemaSnapshot, Survey, build_snapshot};

pub fn fixture(name: &str) -> &'static str {
    match name {
        "branching_survey" => include_str!("../fixtures/branching_survey.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

pub fn branching_survey() -> Survey {
    serde_json::from_str(fixture("branching_survey")).expect("deserialize survey")
}

pub fn branching_snapshot() -> SchemaSnapshot {
    build_snapshot(&branching_survey(), "en", "en")
}

pub fn answers(value: Value) -> AnswerSet {
    AnswerSet::try_from(value).expect("answer set")
}

/// One radio trigger `t`, one choice target `target` with values a..d
/// (choice ids 1..4), a free text question `free`, and the given rules.
pub fn survey_with_rules(target_type: &str, rules: Value) -> Survey {
    serde_json::from_value(json!({
        "id": 1,
        "title": "Rules",
        "sections": [{
            "id": 1,
            "title": "Only",
            "questions": [
                { "identifier": "t", "type": "text", "required": false, "order": 1 },
                { "identifier": "u", "type": "number", "required": false, "order": 2 },
                {
                    "identifier": "target",
                    "type": target_type,
                    "required": false,
                    "order": 3,
                    "choices": [
                        { "id": 1, "label": "A", "value": "a", "order": 1 },
                        { "id": 2, "label": "B", "value": "b", "order": 2 },
                        { "id": 3, "label": "C", "value": "c", "order": 3 },
                        { "id": 4, "label": "D", "value": "d", "order": 4 }
                    ]
                },
                { "identifier": "free", "type": "text", "required": false, "order": 4 }
            ]
        }],
        "rules": rules
    }))
    .expect("deserialize rule survey")
}

pub fn snapshot_with_rules(target_type: &str, rules: Value) -> SchemaSnapshot {
    build_snapshot(&survey_with_rules(target_type, rules), "en", "en")
}
