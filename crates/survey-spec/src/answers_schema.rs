use std::collections::BTreeSet;

use serde_json::{Map, Value, json};

use crate::answers::AnswerSet;
use crate::condition::canonical;
use crate::snapshot::{QuestionEntry, SchemaSnapshot};
use crate::spec::QuestionType;
use crate::visibility::EvaluationPass;

/// JSON Schema accepting exactly the answers that are legal right now.
pub fn generate(snapshot: &SchemaSnapshot, answers: &AnswerSet) -> Value {
    let mut pass = EvaluationPass::new(snapshot, answers);
    let mut properties = Map::new();
    let mut required = Vec::new();

    for question in snapshot.ordered_questions() {
        if !pass.is_visible(&question.id) {
            continue;
        }
        let allowed = pass.allowed_values(&question.id).map(|eligibility| {
            if eligibility.rule_applied {
                let values = eligibility.allowed.iter().map(String::as_str);
                ChoiceValues::Restricted(values.flat_map(spellings).collect())
            } else {
                ChoiceValues::Open(question.declared_values())
            }
        });

        properties.insert(question.id.clone(), question_schema(question, allowed));
        if question.required {
            required.push(Value::String(question.id.clone()));
        }
    }

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": snapshot.title,
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

/// Choice values as the validator sees them: an enforced set while a choice
/// rule is in effect, otherwise just the declared options as hints.
enum ChoiceValues {
    Restricted(Vec<Value>),
    Open(BTreeSet<String>),
}

impl ChoiceValues {
    fn apply(self, schema: &mut Map<String, Value>) {
        match self {
            Self::Restricted(values) => {
                schema.insert("enum".into(), Value::Array(values));
            }
            Self::Open(declared) => {
                schema.insert("type".into(), json!(["string", "number", "boolean"]));
                schema.insert("examples".into(), json!(declared));
            }
        }
    }
}

/// Every scalar whose string form is `value`: the string itself, plus the
/// number or boolean it spells exactly.
fn spellings(value: &str) -> Vec<Value> {
    let mut values = vec![Value::String(value.to_string())];
    if let Ok(parsed @ (Value::Number(_) | Value::Bool(_))) = serde_json::from_str::<Value>(value)
        && canonical(&parsed) == value
    {
        values.push(parsed);
    }
    values
}

fn question_schema(question: &QuestionEntry, allowed: Option<ChoiceValues>) -> Value {
    let mut schema = Map::new();
    schema.insert("title".into(), Value::String(question.text.clone()));

    match question.kind {
        QuestionType::Text => {
            schema.insert("type".into(), json!("string"));
        }
        QuestionType::Number => {
            schema.insert("type".into(), json!("number"));
        }
        QuestionType::Date => {
            schema.insert("type".into(), json!("string"));
            schema.insert("format".into(), json!("date"));
        }
        QuestionType::Dropdown | QuestionType::Radio => {
            if let Some(allowed) = allowed {
                allowed.apply(&mut schema);
            }
        }
        QuestionType::Checkbox => {
            let mut items = Map::new();
            if let Some(allowed) = allowed {
                allowed.apply(&mut items);
            }
            schema.insert("type".into(), json!("array"));
            schema.insert("items".into(), Value::Object(items));
            schema.insert("uniqueItems".into(), Value::Bool(true));
        }
    }

    if let Some(constraint) = &question.constraint {
        if let Some(pattern) = &constraint.pattern {
            schema.insert("pattern".into(), json!(pattern));
        }
        if let Some(min_len) = constraint.min_len {
            schema.insert("minLength".into(), json!(min_len));
        }
        if let Some(max_len) = constraint.max_len {
            schema.insert("maxLength".into(), json!(max_len));
        }
        if question.kind == QuestionType::Number {
            if let Some(min) = constraint.min {
                schema.insert("minimum".into(), json!(min));
            }
            if let Some(max) = constraint.max {
                schema.insert("maximum".into(), json!(max));
            }
        }
    }

    Value::Object(schema)
}
