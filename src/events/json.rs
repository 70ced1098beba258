//! Typed accessor over a parsed JSON document.
//!
//! Field names from configuration may be dotted paths (`a.b.0.c`). Scalars
//! are read leniently: numbers and booleans render as strings, numeric
//! strings parse as integers.

use serde_json::Value;

/// Resolve a dotted path against `value`.
///
/// A top-level key equal to the whole path wins over the dotted walk.
pub fn get<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    if let Some(direct) = value.as_object().and_then(|map| map.get(path)) {
        return Some(direct);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// String rendering of a scalar field. Objects, arrays and null render empty.
pub fn string(value: &Value, path: &str) -> Option<String> {
    get(value, path).map(scalar_to_string)
}

/// Field value only when it is a JSON string.
pub fn strict_string(value: &Value, path: &str) -> Option<String> {
    get(value, path).and_then(Value::as_str).map(str::to_string)
}

/// Integer field, zero when missing or not numeric.
pub fn int(value: &Value, path: &str) -> i64 {
    match get(value, path) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_default(),
        Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    }
}

pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_dotted_path() {
        let doc = json!({"a": {"b": [{"c": "deep"}]}});
        assert_eq!(string(&doc, "a.b.0.c").as_deref(), Some("deep"));
        assert!(get(&doc, "a.x").is_none());
        assert!(get(&doc, "").is_none());
    }

    #[test]
    fn test_get_prefers_literal_key() {
        let doc = json!({"a.b": "literal", "a": {"b": "nested"}});
        assert_eq!(string(&doc, "a.b").as_deref(), Some("literal"));
    }

    #[test]
    fn test_null_renders_empty() {
        let doc = json!({"gone": null});
        assert!(get(&doc, "gone").is_some());
        assert_eq!(string(&doc, "gone").as_deref(), Some(""));
    }

    #[test]
    fn test_scalar_rendering() {
        let doc = json!({"n": 42, "b": true, "s": "x"});
        assert_eq!(string(&doc, "n").as_deref(), Some("42"));
        assert_eq!(string(&doc, "b").as_deref(), Some("true"));
        assert!(strict_string(&doc, "n").is_none());
        assert_eq!(strict_string(&doc, "s").as_deref(), Some("x"));
    }

    #[test]
    fn test_int_is_lenient() {
        let doc = json!({"n": 3, "s": "7", "f": 2.0, "bad": "x"});
        assert_eq!(int(&doc, "n"), 3);
        assert_eq!(int(&doc, "s"), 7);
        assert_eq!(int(&doc, "f"), 2);
        assert_eq!(int(&doc, "bad"), 0);
        assert_eq!(int(&doc, "missing"), 0);
    }
}
