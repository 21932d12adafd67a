//! Classification of semi-structured tag columns into typed attributes

use model::{AttributeValue, Attributes};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Why a tag column could not be turned into [`Attributes`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    /// The column itself is not a JSON object
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// One key holds a value outside the supported kinds
    #[error("unsupported value type {kind}")]
    UnsupportedValue { key: String, kind: &'static str },
}

impl AttributeError {
    /// Offending key, when the error concerns a single entry
    pub fn key(&self) -> Option<String> {
        match self {
            AttributeError::NotAnObject(_) => None,
            AttributeError::UnsupportedValue { key, .. } => Some(key.clone()),
        }
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Classifies one dynamic value into the closed attribute set
///
/// Integers that fit in 64 signed bits become `Int`, every other number
/// becomes `Double`. JSON has no byte-string kind, so `Bytes` is never
/// produced from a tag column. Null, arrays, and objects are rejected.
pub fn classify(value: &JsonValue) -> Option<AttributeValue> {
    match value {
        JsonValue::Bool(b) => Some(AttributeValue::Bool(*b)),
        JsonValue::String(s) => Some(AttributeValue::String(s.clone())),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Some(AttributeValue::Int(i)),
            None => n.as_f64().map(AttributeValue::Double),
        },
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

/// Decodes a tag column into attributes
///
/// A NULL column decodes to an empty map.
pub fn decode_attributes(value: &JsonValue) -> Result<Attributes, AttributeError> {
    let map = match value {
        JsonValue::Object(map) => map,
        JsonValue::Null => return Ok(Attributes::new()),
        other => return Err(AttributeError::NotAnObject(json_kind(other))),
    };

    map.iter()
        .map(|(key, v)| match classify(v) {
            Some(attr) => Ok((key.clone(), attr)),
            None => Err(AttributeError::UnsupportedValue {
                key: key.clone(),
                kind: json_kind(v),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_supported_kinds() {
        assert_eq!(classify(&json!(42)), Some(AttributeValue::Int(42)));
        assert_eq!(classify(&json!(-7)), Some(AttributeValue::Int(-7)));
        assert_eq!(classify(&json!(1.5)), Some(AttributeValue::Double(1.5)));
        assert_eq!(classify(&json!(true)), Some(AttributeValue::Bool(true)));
        assert_eq!(
            classify(&json!("GET")),
            Some(AttributeValue::String("GET".to_string()))
        );
    }

    #[test]
    fn test_classify_rejects_structured_values() {
        assert_eq!(classify(&json!(null)), None);
        assert_eq!(classify(&json!([1, 2])), None);
        assert_eq!(classify(&json!({"a": 1})), None);
    }

    #[test]
    fn test_decode_attributes() {
        let attrs = decode_attributes(&json!({
            "http.method": "GET",
            "http.status_code": 200,
            "retry": false,
            "ratio": 0.25
        }))
        .unwrap();

        assert_eq!(attrs.len(), 4);
        assert_eq!(attrs["http.status_code"], AttributeValue::Int(200));
        assert_eq!(attrs["ratio"], AttributeValue::Double(0.25));
    }

    #[test]
    fn test_decode_attributes_reports_offending_key() {
        let err = decode_attributes(&json!({"ok": 1, "nested": {"a": 1}})).unwrap_err();
        assert_eq!(
            err,
            AttributeError::UnsupportedValue {
                key: "nested".to_string(),
                kind: "object"
            }
        );
        assert_eq!(err.key().as_deref(), Some("nested"));
        assert_eq!(err.to_string(), "unsupported value type object");
    }

    #[test]
    fn test_decode_null_column_is_empty() {
        assert!(decode_attributes(&JsonValue::Null).unwrap().is_empty());
        assert_eq!(
            decode_attributes(&json!("x")),
            Err(AttributeError::NotAnObject("string"))
        );
        assert_eq!(
            AttributeError::NotAnObject("array").to_string(),
            "expected a JSON object, got array"
        );
    }
}
