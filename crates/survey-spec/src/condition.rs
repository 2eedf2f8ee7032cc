use std::cmp::Ordering;

use serde_json::Value;

use crate::spec::Operator;

/// Evaluates `trigger <operator> literal`.
///
/// Both sides are compared in trimmed, lower-cased string form. `gt`/`lt`
/// compare numerically when both sides parse as numbers and lexicographically
/// otherwise. A missing or `null` trigger never matches, and neither does an
/// unknown operator.
pub fn evaluate(trigger: Option<&Value>, operator: Operator, literal: &Value) -> bool {
    let Some(trigger) = trigger.filter(|value| !value.is_null()) else {
        return false;
    };
    let left = normalize(trigger);
    let right = normalize(literal);

    match operator {
        Operator::Eq => left == right,
        Operator::Neq => left != right,
        Operator::Gt => compare(&left, &right) == Some(Ordering::Greater),
        Operator::Lt => compare(&left, &right) == Some(Ordering::Less),
        Operator::Contains => left.contains(&right),
        Operator::Unknown => false,
    }
}

/// Comparison form of a value: canonical text, trimmed and lower-cased.
pub fn normalize(value: &Value) -> String {
    canonical(value).trim().to_lowercase()
}

/// Plain string form of a value. Lists join their items with `", "`.
pub fn canonical(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(items) => items.iter().map(canonical).collect::<Vec<_>>().join(", "),
        Value::Object(_) => value.to_string(),
    }
}

fn compare(left: &str, right: &str) -> Option<Ordering> {
    match (left.parse::<f64>(), right.parse::<f64>()) {
        (Ok(left), Ok(right)) => left.partial_cmp(&right),
        _ => Some(left.cmp(right)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn numeric_comparison_beats_string_order() {
        // "10" < "9" as strings
        assert!(evaluate(Some(&json!("10")), Operator::Gt, &json!("9")));
        assert!(evaluate(Some(&json!(2.5)), Operator::Lt, &json!(3)));
    }

    #[test]
    fn lists_are_joined_before_comparison() {
        assert_eq!(canonical(&json!(["a", 1, true])), "a, 1, true");
        assert!(evaluate(
            Some(&json!(["Red", "Blue"])),
            Operator::Contains,
            &json!("blue")
        ));
    }

    #[test]
    fn nan_never_orders() {
        assert!(!evaluate(Some(&json!("nan")), Operator::Gt, &json!("1")));
        assert!(!evaluate(Some(&json!("nan")), Operator::Lt, &json!("1")));
    }
}
