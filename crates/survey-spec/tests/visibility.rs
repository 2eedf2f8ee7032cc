mod common;

use serde_json::json;

use common::{answers, branching_snapshot, snapshot_with_rules};
use survey_spec::{EvaluationPass, is_visible, resolve_visibility};

#[test]
fn question_without_rules_is_always_visible() {
    let snapshot = snapshot_with_rules("radio", json!([]));
    for set in [json!({}), json!({ "t": "anything" }), json!({ "t": null })] {
        let set = answers(set);
        for id in ["t", "u", "target", "free", "not-a-question"] {
            assert!(is_visible(&snapshot, &set, id), "{id} should be visible");
        }
    }
}

#[test]
fn hide_takes_precedence_over_show() {
    let snapshot = snapshot_with_rules(
        "radio",
        json!([
            { "id": 1, "trigger": "t", "operator": "eq", "value": "on", "action": "show", "target": "free" },
            { "id": 2, "trigger": "u", "operator": "gt", "value": 1, "action": "hide", "target": "free" }
        ]),
    );
    assert!(is_visible(&snapshot, &answers(json!({ "t": "on" })), "free"));
    assert!(!is_visible(
        &snapshot,
        &answers(json!({ "t": "on", "u": 5 })),
        "free"
    ));
}

#[test]
fn unmatched_show_rules_hide_the_question() {
    let snapshot = snapshot_with_rules(
        "radio",
        json!([
            { "id": 1, "trigger": "t", "operator": "eq", "value": "on", "action": "show", "target": "free" },
            { "id": 2, "trigger": "u", "operator": "lt", "value": 0, "action": "show", "target": "free" }
        ]),
    );
    assert!(!is_visible(&snapshot, &answers(json!({})), "free"));
    assert!(!is_visible(&snapshot, &answers(json!({ "t": "off", "u": 3 })), "free"));
    assert!(is_visible(&snapshot, &answers(json!({ "u": -1 })), "free"));
}

#[test]
fn hide_only_rules_default_to_visible() {
    let snapshot = snapshot_with_rules(
        "radio",
        json!([
            { "id": 1, "trigger": "t", "operator": "contains", "value": "skip", "action": "hide", "target": "free" }
        ]),
    );
    assert!(is_visible(&snapshot, &answers(json!({})), "free"));
    assert!(!is_visible(&snapshot, &answers(json!({ "t": "please skip" })), "free"));
}

#[test]
fn choice_rules_and_unknown_actions_do_not_affect_visibility() {
    let snapshot = snapshot_with_rules(
        "radio",
        json!([
            { "id": 1, "trigger": "t", "operator": "eq", "value": "x", "action": "limit_choices", "target": "target", "target_choices": [1] },
            { "id": 2, "trigger": "t", "operator": "eq", "value": "x", "action": "teleport", "target": "target" }
        ]),
    );
    assert!(is_visible(&snapshot, &answers(json!({ "t": "x" })), "target"));
}

#[test]
fn trigger_visibility_is_irrelevant() {
    let snapshot = branching_snapshot();
    // q2 is hidden (q1 != yes) but its answer still fires the hide rule on q5.
    let set = answers(json!({ "q1": "no", "q2": 20 }));
    assert!(!is_visible(&snapshot, &set, "q2"));
    assert!(!is_visible(&snapshot, &set, "q5"));
}

#[test]
fn visibility_map_covers_every_question() {
    let snapshot = branching_snapshot();
    let map = resolve_visibility(&snapshot, &answers(json!({ "q1": "yes" })));
    assert_eq!(map.len(), snapshot.questions.len());
    assert_eq!(map["q2"], true);
    assert_eq!(map["q6"], true);

    let map = resolve_visibility(&snapshot, &answers(json!({ "q1": "no" })));
    assert_eq!(map["q2"], false);
    assert_eq!(map["q6"], false);
    assert_eq!(map["q1"], true);
}

#[test]
fn evaluation_pass_memoizes_within_one_answer_set() {
    let snapshot = branching_snapshot();
    let set = answers(json!({ "q1": "yes" }));
    let mut pass = EvaluationPass::new(&snapshot, &set);
    assert!(pass.is_visible("q2"));
    assert!(pass.is_visible("q2"));
    assert_eq!(pass.visibility_map()["q2"], true);
}
