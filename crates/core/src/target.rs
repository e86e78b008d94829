//! The loosely-structured input every validator and pillar inspects.
//!
//! Targets arrive as JSON objects (or plain strings for free text), so the
//! helpers here do the small amount of shape-probing the rule checks need.

use serde_json::{Map, Value};

/// What gets validated, translated or profiled.
pub type Target = Value;

/// Side-channel information passed alongside a target.
pub type Context = Map<String, Value>;

/// Walk nested object keys, returning `None` at the first missing hop.
pub fn path<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().try_fold(value, |v, k| v.get(*k))
}

/// Collect the string members of an array; anything else yields nothing.
pub fn str_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Read a number, accepting numeric strings as well.
pub fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Emptiness in the loose sense: `null`, `false`, `0`, `""`, `[]` and `{}`
/// are all falsy.
pub fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

/// Short type label used when comparing response shapes.
pub fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Render a target as text: strings verbatim, everything else as JSON.
pub fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn path_walks_nested_objects() {
        let v = json!({"a": {"b": {"c": 3}}});
        assert_eq!(path(&v, &["a", "b", "c"]), Some(&json!(3)));
        assert!(path(&v, &["a", "x", "c"]).is_none());
    }

    #[test]
    fn str_list_skips_non_strings() {
        let v = json!(["a", 1, "b", null]);
        assert_eq!(str_list(Some(&v)), vec!["a", "b"]);
        assert!(str_list(None).is_empty());
    }

    #[test]
    fn truthiness_matches_loose_semantics() {
        assert!(!truthy(Some(&json!([]))));
        assert!(!truthy(Some(&json!(0))));
        assert!(!truthy(Some(&json!(""))));
        assert!(truthy(Some(&json!({"k": 1}))));
        assert!(truthy(Some(&json!("x"))));
    }

    #[test]
    fn number_accepts_numeric_strings() {
        assert_eq!(number(Some(&json!("0.5"))), Some(0.5));
        assert_eq!(number(Some(&json!(2))), Some(2.0));
        assert_eq!(number(Some(&json!("n/a"))), None);
    }
}
